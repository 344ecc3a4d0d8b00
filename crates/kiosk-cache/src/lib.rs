//! Kiosk Cache
//!
//! Client-side query cache and the optimistic mutation coordinator that sits
//! between callers and the remote store.
//!
//! # Architecture
//!
//! ```text
//! caller -> OptimisticMutation::run -> QueryCache (cancel, get, set) -> mutation -> QueryCache (set on failure, invalidate)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_cache::{MokaQueryCache, OptimisticMutation, QueryKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(MokaQueryCache::<Vec<Form>>::default());
//! let archive = OptimisticMutation::new(cache, QueryKey::new(["forms"]), mutation, updater);
//! archive.run(form_id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod key;

// Re-exports for convenience
pub use cache::{CacheStats, CachedValue, Fetcher, MokaQueryCache, QueryCache};
pub use coordinator::{
    FailureHook, MutationFn, OptimisticMutation, SettleHook, Updater,
};
pub use error::CacheError;
pub use key::{responses_key, QueryKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
