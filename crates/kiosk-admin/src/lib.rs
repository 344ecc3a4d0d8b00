//! Kiosk Admin
//!
//! The authoring side of the survey kiosk:
//! - Listing, creating, editing, activating, archiving and deleting surveys
//! - Optimistic updates of the cached survey list through the coordinator
//! - Aggregate results over stored responses
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_admin::AdminConsole;
//!
//! # async fn example(gateway: kiosk_core::SharedGateway) -> Result<(), kiosk_admin::AdminError> {
//! let console = AdminConsole::new(gateway, &Default::default());
//! for form in console.forms().await? {
//!     println!("{} [{}]", form.title, form.status);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod console;
pub mod error;
pub mod mutations;
pub mod results;

// Re-exports for convenience
pub use console::AdminConsole;
pub use error::AdminError;
pub use kiosk_cache::responses_key;
pub use mutations::{form_key, forms_key, FormsCache};
pub use results::{AnswerTally, QuestionTally, SurveyResults};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
