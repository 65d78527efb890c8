//! errchain - cross-layer error classification for LLM provider clients
//!
//! Failures are tagged with a [`error::Category`] at the api-client boundary,
//! annotated by each outer layer and resolved into recovery guidance at the
//! outermost boundary. The `errchain` binary exercises the library from the
//! command line.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{
    debug_payload, extract_correlation_id, recovery_info, user_message, BoxError, Categorized,
    Category, ClassifiedError, LayeredError,
};
