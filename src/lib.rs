//! # Stagehand
//!
//! Per-node step execution runtime for a distributed workflow automation
//! engine. An upstream orchestrator calls this runtime once per workflow
//! step; the runtime builds the step's contexts, guarantees at-most-once
//! creation of any device-scoped app instance the step depends on, runs the
//! step through the owning app's implementation, records an addressable
//! result, and publishes a redacted outcome event.
//!
//! ## Modules
//!
//! - `accumulator` - Workflow-scoped result store with deterministic keys
//! - `apps` - Owner capability registry: resource factories and implementations
//! - `config` - Environment-driven runtime configuration
//! - `context` - Executable, workflow, and restricted context value objects
//! - `coordinator` - Per-request orchestration of the execution flow
//! - `dispatch` - Execution dispatch and final status resolution
//! - `error` - Top-level error taxonomy
//! - `events` - Redacted outcome events and the event sink seam
//! - `registry` - Shared instance registry with atomic acquisition
//! - `request` - Execution request payload decoding and validation
//! - `server` - Thin HTTP transport over the coordinator
//! - `store` - Shared key/set store abstraction with redis and memory backends
pub mod accumulator;
pub mod apps;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod registry;
pub mod request;
pub mod server;
pub mod store;

pub use coordinator::ExecutionCoordinator;
pub use dispatch::ExecutionResult;
pub use error::CoordinatorError;
