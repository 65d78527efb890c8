//! Cross-layer error classification and recovery.
//!
//! A failure raised inside a provider call is tagged with a [`Category`] by the
//! api-client tier ([`ClassifiedError`]), optionally decorated by each outer tier
//! with a [`LayeredError`], and finally resolved at the outermost boundary into
//! a user-facing message and a structured developer payload
//! ([`recovery::ErrorReport`]).
//!
//! Every wrap keeps the previous error as its `source()`, so the root cause is
//! always reachable through [`chain::chain`].

pub mod category;
pub mod chain;
pub mod classified;
pub mod detector;
pub mod layered;
pub mod recovery;

use std::error::Error;
use std::fmt;
use uuid::Uuid;

pub use category::{Category, ParseCategoryError};
pub use chain::{
    chain, extract_correlation_id, extract_layer_context, find_in_chain, nearest_categorized,
    root_cause,
};
pub use classified::{
    append_details, from_api_failure, standard_message, standard_template, wrap,
    wrap_with_correlation, ClassifiedError,
};
pub use detector::{
    category_from_message, category_from_status, detect, CategoryDetector, Detection,
    MessagePattern,
};
pub use layered::{
    wrap_api_client, wrap_cli, wrap_model_processor, wrap_orchestrator, wrap_with_context,
    Details, Layer, LayerContext, LayeredError,
};
pub use recovery::{
    debug_payload, recovery_info, user_message, ErrorReport, RecoveryInfo, SuggestedAction,
};

/// Owned, thread-safe error used as the cause of every carrier.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Generates a fresh correlation id for a logical request.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// An error that can report why it happened.
///
/// Any error type implementing this trait qualifies as categorized; the message
/// is available through `Display`.
pub trait Categorized: Error {
    /// The failure category of this error.
    fn category(&self) -> Category;
}

/// Makes a foreign [`Categorized`] type visible to chain lookups.
///
/// Chain walks only see `dyn Error`, so a categorized type defined outside this
/// crate is wrapped once in `AnyCategorized` before it enters a chain. Display
/// and `source()` delegate to the wrapped error.
pub struct AnyCategorized(Box<dyn Categorized + Send + Sync + 'static>);

impl AnyCategorized {
    /// Wraps a categorized error.
    pub fn new<E>(err: E) -> Self
    where
        E: Categorized + Send + Sync + 'static,
    {
        Self(Box::new(err))
    }

    /// Returns the wrapped error.
    pub fn inner(&self) -> &(dyn Categorized + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for AnyCategorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for AnyCategorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for AnyCategorized {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl Categorized for AnyCategorized {
    fn category(&self) -> Category {
        self.0.category()
    }
}

/// Views an error as [`Categorized`] if its concrete type supports it.
pub fn as_categorized<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a dyn Categorized> {
    if let Some(classified) = err.downcast_ref::<ClassifiedError>() {
        return Some(classified);
    }
    if let Some(layered) = err.downcast_ref::<LayeredError>() {
        return Some(layered);
    }
    err.downcast_ref::<AnyCategorized>()
        .map(|any| any as &dyn Categorized)
}
