//! Kiosk Session
//!
//! Runs an unattended survey kiosk:
//! - Question order, shuffled per session when the survey asks for it
//! - A single owned timer covering inactivity and the thank-you display
//! - The session state machine and its event loop
//! - Response sinks that submit finished sessions without blocking
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_session::{load_active_definition, GatewaySink, KioskSession};
//!
//! # async fn example(gateway: kiosk_core::SharedGateway) -> anyhow::Result<()> {
//! let cache = kiosk_cache::MokaQueryCache::new(16);
//! let Some(survey) = load_active_definition(&cache, gateway.clone()).await? else {
//!     return Ok(());
//! };
//! let sink = std::sync::Arc::new(GatewaySink::new(gateway));
//! let (handle, task) = KioskSession::spawn(survey, &Default::default(), sink);
//! handle.activity().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod loader;
pub mod machine;
pub mod runtime;
pub mod shuffle;
pub mod sink;
pub mod timer;

pub use error::SessionError;
pub use loader::{active_definition_key, load_active_definition};
pub use machine::{Phase, SessionMachine, SessionState, SessionView};
pub use runtime::{KioskSession, SessionEvent, SessionHandle};
pub use shuffle::{question_order, session_rng, shuffled};
pub use kiosk_cache::responses_key;
pub use sink::{CoordinatedSink, GatewaySink, ResponseSink};
pub use timer::{TimerFired, TimerHandle, TimerKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
