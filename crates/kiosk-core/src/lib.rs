//! Kiosk Core
//!
//! Shared vocabulary for the survey kiosk:
//! - Survey definitions, questions, answers and response records
//! - The [`SurveyGateway`] contract to the remote store
//! - Authoring validation
//! - Configuration loaded from TOML
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_core::{MemoryGateway, SurveyGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = MemoryGateway::new();
//! match gateway.fetch_active_definition().await? {
//!     Some(survey) => println!("presenting {}", survey.title),
//!     None => println!("nothing to do"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use config::{CacheConfig, KioskConfig, SessionConfig};
pub use error::{ConfigError, DefinitionError, GatewayError};
pub use gateway::{SharedGateway, SurveyGateway};
pub use memory::MemoryGateway;
pub use types::{
    Answer, AnswerId, AnswerPair, FormId, FormStatus, NewSurvey, Question, QuestionId,
    ResponseId, ResponseRecord, ResponseStatus, StoredResponse, SurveyDefinition, SurveyPatch,
};
pub use validation::validate_questions;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
