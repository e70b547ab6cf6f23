//! Shared key/set store abstraction.
//!
//! The store is the only cross-request shared resource in the runtime: the
//! instance registry and the result accumulator both live in it, and every
//! runtime process deployed for the same app reaches the same store. The
//! redis backend is the production configuration; the memory backend exists
//! for tests and single-node deployments.

pub mod backends;
pub mod error;
pub mod factory;
pub mod traits;

pub use backends::MemoryStore;
#[cfg(feature = "redis")]
pub use backends::RedisStore;
pub use error::{StoreError, StoreResult};
pub use factory::StoreFactory;
pub use traits::KeySetStore;
