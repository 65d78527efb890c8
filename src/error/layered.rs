//! Layer-context wrapping.
//!
//! Each architectural tier a failure crosses may attach one [`LayeredError`]
//! recording the tier, the operation, when it happened, tier-specific details
//! and the tier's correlation id. A layered error never carries its own
//! category; it always reports the category of the nearest categorized cause.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use tracing::trace;

use super::chain::nearest_categorized;
use super::{BoxError, Categorized, Category};

/// Free-form diagnostic details attached by a layer.
pub type Details = BTreeMap<String, Value>;

/// The canonical architectural tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    /// Provider API client.
    ApiClient,
    /// Model selection and response processing.
    ModelProcessor,
    /// Workflow orchestration.
    Orchestrator,
    /// Command-line entry point.
    Cli,
}

impl Layer {
    /// All canonical layers, innermost first.
    pub const ALL: [Layer; 4] = [
        Layer::ApiClient,
        Layer::ModelProcessor,
        Layer::Orchestrator,
        Layer::Cli,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::ApiClient => "api-client",
            Layer::ModelProcessor => "model-processor",
            Layer::Orchestrator => "orchestrator",
            Layer::Cli => "cli",
        }
    }

    /// Looks up a canonical layer by its name.
    pub fn from_name(name: &str) -> Option<Layer> {
        Self::ALL.into_iter().find(|layer| layer.as_str() == name)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a layer recorded when the failure crossed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerContext {
    /// Layer name, usually one of [`Layer::as_str`].
    pub layer: String,
    /// Operation the layer was performing.
    pub operation: String,
    /// When the context was created.
    pub timestamp: DateTime<Utc>,
    /// Layer-specific details.
    pub details: Details,
    /// Correlation id assigned by this layer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// An error annotated with the context of one architectural layer.
#[derive(Debug)]
pub struct LayeredError {
    cause: BoxError,
    context: LayerContext,
}

impl LayeredError {
    /// Wraps `cause` with a new layer context stamped with the current time.
    ///
    /// An empty `correlation_id` is recorded as absent.
    pub fn new(
        cause: impl Into<BoxError>,
        layer: impl Into<String>,
        operation: impl Into<String>,
        details: Details,
        correlation_id: &str,
    ) -> Self {
        let context = LayerContext {
            layer: layer.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            details,
            correlation_id: (!correlation_id.is_empty()).then(|| correlation_id.to_string()),
        };
        trace!(
            layer = %context.layer,
            operation = %context.operation,
            "Attached layer context"
        );

        Self {
            cause: cause.into(),
            context,
        }
    }

    pub fn context(&self) -> &LayerContext {
        &self.context
    }

    /// The wrapped error.
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Consumes the wrapper, returning the wrapped error.
    pub fn into_cause(self) -> BoxError {
        self.cause
    }

    /// The category of the nearest categorized cause, or `Unknown`.
    pub fn category(&self) -> Category {
        nearest_categorized(self.cause.as_ref())
            .map(|categorized| categorized.category())
            .unwrap_or(Category::Unknown)
    }
}

impl fmt::Display for LayeredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}",
            self.context.layer, self.context.operation, self.cause
        )
    }
}

impl Error for LayeredError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref() as &(dyn Error + 'static))
    }
}

impl Categorized for LayeredError {
    fn category(&self) -> Category {
        LayeredError::category(self)
    }
}

/// Attaches a layer context to an optional error; `None` passes through as `None`.
pub fn wrap_with_context<E>(
    err: Option<E>,
    layer: &str,
    operation: &str,
    details: Details,
    correlation_id: &str,
) -> Option<LayeredError>
where
    E: Into<BoxError>,
{
    err.map(|err| LayeredError::new(err, layer, operation, details, correlation_id))
}

fn with_detail(mut details: Details, key: &str, value: Value) -> Details {
    details.insert(key.to_string(), value);
    details
}

/// Attaches an api-client context recording the provider.
pub fn wrap_api_client<E>(
    err: Option<E>,
    operation: &str,
    provider: &str,
    details: Details,
    correlation_id: &str,
) -> Option<LayeredError>
where
    E: Into<BoxError>,
{
    wrap_with_context(
        err,
        Layer::ApiClient.as_str(),
        operation,
        with_detail(details, "provider", json!(provider)),
        correlation_id,
    )
}

/// Attaches a model-processor context recording the model name.
pub fn wrap_model_processor<E>(
    err: Option<E>,
    operation: &str,
    model_name: &str,
    details: Details,
    correlation_id: &str,
) -> Option<LayeredError>
where
    E: Into<BoxError>,
{
    wrap_with_context(
        err,
        Layer::ModelProcessor.as_str(),
        operation,
        with_detail(details, "model_name", json!(model_name)),
        correlation_id,
    )
}

/// Attaches an orchestrator context recording the workflow stage.
pub fn wrap_orchestrator<E>(
    err: Option<E>,
    operation: &str,
    workflow_stage: &str,
    details: Details,
    correlation_id: &str,
) -> Option<LayeredError>
where
    E: Into<BoxError>,
{
    wrap_with_context(
        err,
        Layer::Orchestrator.as_str(),
        operation,
        with_detail(details, "workflow_stage", json!(workflow_stage)),
        correlation_id,
    )
}

/// Attaches a cli context recording the command and its arguments.
pub fn wrap_cli<E>(
    err: Option<E>,
    operation: &str,
    command: &str,
    args: &[String],
    details: Details,
    correlation_id: &str,
) -> Option<LayeredError>
where
    E: Into<BoxError>,
{
    wrap_with_context(
        err,
        Layer::Cli.as_str(),
        operation,
        with_detail(details, "command", json!({ "name": command, "args": args })),
        correlation_id,
    )
}
