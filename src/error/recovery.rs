//! Recovery guidance derived from an error chain.
//!
//! Nothing here is stored. [`recovery_info`] walks the chain once for the
//! correlation id and the nearest category, then looks the category up in a
//! fixed table. [`ErrorReport`] adds the per-layer contexts and projects the
//! result into terminal text ([`user_message`]) or a JSON record for structured
//! logging ([`debug_payload`]).

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::Write as _;
use std::time::Duration;

use super::chain::{
    extract_correlation_id, extract_layer_context, find_in_chain, nearest_categorized, root_cause,
};
use super::layered::{Layer, LayerContext};
use super::{Category, ClassifiedError};

/// A step the user or a layer of the application can take to recover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedAction {
    /// The layer expected to perform the action.
    pub layer: Layer,
    pub action: String,
}

/// Guidance for recovering from a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryInfo {
    /// Nearest category in the chain, `Unknown` when none was found.
    pub category: Category,
    pub user_message: String,
    pub developer_details: String,
    /// Most user-actionable first.
    pub suggested_actions: Vec<SuggestedAction>,
    pub retry_possible: bool,
    /// Advisory only; this crate never schedules retries.
    pub wait: Duration,
    pub correlation_id: Option<String>,
}

struct RecoveryEntry {
    user_message: &'static str,
    developer_details: &'static str,
    actions: &'static [(Layer, &'static str)],
    retry_possible: bool,
    wait_secs: u64,
}

const UNKNOWN_ENTRY: RecoveryEntry = RecoveryEntry {
    user_message: "An unexpected error occurred.",
    developer_details: "No category could be resolved from the error chain.",
    actions: &[
        (Layer::Cli, "Try the command again"),
        (Layer::Cli, "Re-run with --verbose to see diagnostic details"),
    ],
    retry_possible: true,
    wait_secs: 0,
};

fn recovery_entry(category: Category) -> RecoveryEntry {
    match category {
        Category::Auth => RecoveryEntry {
            user_message: "Authentication with the AI provider failed.",
            developer_details: "The provider rejected the API credentials (HTTP 401/403).",
            actions: &[
                (Layer::Cli, "Check that the provider's API key environment variable is set"),
                (Layer::ApiClient, "Verify the API key is valid and has not been revoked"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::InsufficientCredits => RecoveryEntry {
            user_message: "The AI provider account has insufficient credits.",
            developer_details: "The provider reported a billing or payment problem (HTTP 402).",
            actions: &[
                (Layer::Cli, "Add credits or update billing details for the provider account"),
                (Layer::ApiClient, "Confirm the API key belongs to the expected account"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::RateLimit => RecoveryEntry {
            user_message: "The AI provider is rate limiting requests.",
            developer_details: "The provider returned a rate limit or quota error (HTTP 429).",
            actions: &[
                (Layer::Cli, "Wait a minute and try again"),
                (Layer::Orchestrator, "Reduce the number of concurrent requests"),
                (Layer::ApiClient, "Back off before sending the next request"),
            ],
            retry_possible: true,
            wait_secs: 60,
        },
        Category::Network => RecoveryEntry {
            user_message: "Could not reach the AI provider.",
            developer_details: "The request failed at the transport level before a response arrived.",
            actions: &[
                (Layer::Cli, "Check your internet connection"),
                (Layer::ApiClient, "Verify the provider endpoint and proxy settings"),
            ],
            retry_possible: true,
            wait_secs: 5,
        },
        Category::Server => RecoveryEntry {
            user_message: "The AI provider had an internal error.",
            developer_details: "The provider returned a server error (HTTP 5xx).",
            actions: &[
                (Layer::Cli, "Try again in a few moments"),
                (Layer::ApiClient, "Check the provider's status page for outages"),
            ],
            retry_possible: true,
            wait_secs: 30,
        },
        Category::Cancelled => RecoveryEntry {
            user_message: "The operation was cancelled.",
            developer_details: "The request was cancelled or its deadline expired.",
            actions: &[
                (Layer::Cli, "Run the command again"),
                (Layer::Orchestrator, "Increase the timeout if a deadline interrupted the request"),
            ],
            retry_possible: true,
            wait_secs: 0,
        },
        Category::InvalidRequest => RecoveryEntry {
            user_message: "The request to the AI provider was invalid.",
            developer_details: "The provider rejected the request parameters (HTTP 400).",
            actions: &[
                (Layer::Cli, "Check the instructions and command-line parameters"),
                (Layer::ModelProcessor, "Check that the request parameters are supported by the model"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::NotFound => RecoveryEntry {
            user_message: "The requested model was not found.",
            developer_details: "The provider does not know the model or resource (HTTP 404).",
            actions: &[
                (Layer::Cli, "Check the model name for typos"),
                (Layer::ModelProcessor, "Verify the model is available for your account"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::InputLimit => RecoveryEntry {
            user_message: "The input is too large for the selected model.",
            developer_details: "The request exceeded the model's token or context limit.",
            actions: &[
                (Layer::Cli, "Reduce the number or size of the input files"),
                (Layer::ModelProcessor, "Use a model with a larger context window"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::ContentFiltered => RecoveryEntry {
            user_message: "The AI provider blocked the content.",
            developer_details: "The prompt or the response triggered provider safety filters.",
            actions: &[
                (Layer::Cli, "Review and rephrase the instructions or inputs"),
                (Layer::ModelProcessor, "Check the safety settings sent with the request"),
            ],
            retry_possible: false,
            wait_secs: 0,
        },
        Category::Unknown => UNKNOWN_ENTRY,
    }
}

/// Derives recovery guidance for an error chain.
pub fn recovery_info(err: &(dyn Error + 'static)) -> RecoveryInfo {
    let category = nearest_categorized(err)
        .map(|categorized| categorized.category())
        .unwrap_or_default();
    let entry = recovery_entry(category);

    RecoveryInfo {
        category,
        user_message: entry.user_message.to_string(),
        developer_details: entry.developer_details.to_string(),
        suggested_actions: entry
            .actions
            .iter()
            .map(|(layer, action)| SuggestedAction {
                layer: *layer,
                action: action.to_string(),
            })
            .collect(),
        retry_possible: entry.retry_possible,
        wait: Duration::from_secs(entry.wait_secs),
        correlation_id: extract_correlation_id(err).map(str::to_string),
    }
}

/// Everything known about a failure, gathered in a single pass.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub recovery: RecoveryInfo,
    /// The full rendered chain.
    pub error: String,
    pub root_cause: String,
    /// Provider of the nearest `ClassifiedError`, if any.
    pub provider: Option<String>,
    pub status_code: Option<u16>,
    /// Contexts of the canonical layers present in the chain, innermost first.
    pub contexts: Vec<(Layer, LayerContext)>,
}

impl ErrorReport {
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let classified = find_in_chain::<ClassifiedError>(err);
        let contexts = Layer::ALL
            .into_iter()
            .filter_map(|layer| {
                extract_layer_context(err, layer.as_str()).map(|context| (layer, context.clone()))
            })
            .collect();

        Self {
            recovery: recovery_info(err),
            error: err.to_string(),
            root_cause: root_cause(err).to_string(),
            provider: classified
                .map(|c| c.provider().to_string())
                .filter(|p| !p.is_empty()),
            status_code: classified.and_then(ClassifiedError::status_code),
            contexts,
        }
    }

    pub fn context(&self, layer: Layer) -> Option<&LayerContext> {
        self.contexts
            .iter()
            .find(|(l, _)| *l == layer)
            .map(|(_, context)| context)
    }

    /// The innermost layer that recorded a context.
    pub fn origin(&self) -> Option<&LayerContext> {
        self.contexts.first().map(|(_, context)| context)
    }

    /// Renders the report for a terminal.
    pub fn render(&self) -> String {
        let info = &self.recovery;
        let mut out = format!("Error: {}\n", info.user_message);

        if let Some(origin) = self.origin() {
            let _ = writeln!(out, "Failed in {} during {}", origin.layer, origin.operation);
        }

        if !info.suggested_actions.is_empty() {
            out.push_str("\nSuggested actions:\n");
            for (i, suggested) in info.suggested_actions.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, suggested.action);
            }
        }

        if info.retry_possible {
            if info.wait.is_zero() {
                out.push_str("\nThis operation can be retried.\n");
            } else {
                let _ = writeln!(
                    out,
                    "\nThis operation can be retried after {} seconds.",
                    info.wait.as_secs()
                );
            }
        }

        if let Some(correlation_id) = &info.correlation_id {
            let _ = writeln!(out, "Correlation ID: {}", correlation_id);
        }

        out
    }

    /// Projects the report into a JSON record.
    pub fn to_json(&self) -> Value {
        let info = &self.recovery;
        let layers: Map<String, Value> = self
            .contexts
            .iter()
            .map(|(layer, context)| (layer.as_str().to_string(), json!(context)))
            .collect();

        json!({
            "category": info.category.as_str(),
            "correlation_id": info.correlation_id,
            "provider": self.provider,
            "status_code": self.status_code,
            "error": self.error,
            "root_cause": self.root_cause,
            "user_message": info.user_message,
            "developer_details": info.developer_details,
            "retry_possible": info.retry_possible,
            "wait_seconds": info.wait.as_secs(),
            "suggested_actions": info.suggested_actions,
            "layers": layers,
        })
    }
}

/// Terminal text describing the failure and how to recover.
pub fn user_message(err: &(dyn Error + 'static)) -> String {
    ErrorReport::from_error(err).render()
}

/// Structured record of the failure for machine logs.
pub fn debug_payload(err: &(dyn Error + 'static)) -> Value {
    ErrorReport::from_error(err).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::layered::{Details, LayeredError};
    use crate::error::{wrap_api_client, wrap_orchestrator, BoxError};

    fn rate_limited_chain() -> LayeredError {
        let classified = ClassifiedError::new("openai", "limited", Category::RateLimit)
            .with_status_code(429)
            .with_cause("HTTP 429 Too Many Requests");
        let api = wrap_api_client(Some(classified), "generate", "openai", Details::new(), "req-9")
            .unwrap();
        wrap_orchestrator(Some(api), "run", "synthesis", Details::new(), "").unwrap()
    }

    #[test]
    fn test_recovery_table_retry_and_wait() {
        let expected = [
            (Category::Auth, false, 0),
            (Category::InsufficientCredits, false, 0),
            (Category::RateLimit, true, 60),
            (Category::Network, true, 5),
            (Category::Server, true, 30),
            (Category::Cancelled, true, 0),
            (Category::InvalidRequest, false, 0),
            (Category::NotFound, false, 0),
            (Category::InputLimit, false, 0),
            (Category::ContentFiltered, false, 0),
            (Category::Unknown, true, 0),
        ];

        for (category, retry, wait) in expected {
            let err = ClassifiedError::new("p", "m", category);
            let info = recovery_info(&err);
            assert_eq!(info.category, category);
            assert_eq!(info.retry_possible, retry, "{category}");
            assert_eq!(info.wait, Duration::from_secs(wait), "{category}");
            assert!(!info.suggested_actions.is_empty());
        }
    }

    #[test]
    fn test_uncategorized_error_gets_generic_entry() {
        let err: BoxError = "something odd".into();
        let info = recovery_info(&*err);
        assert_eq!(info.category, Category::Unknown);
        assert!(info.retry_possible);
        assert_eq!(info.user_message, "An unexpected error occurred.");
        assert!(info.correlation_id.is_none());
    }

    #[test]
    fn test_actions_start_with_the_user() {
        let info = recovery_info(&ClassifiedError::new("p", "m", Category::RateLimit));
        assert_eq!(info.suggested_actions[0].layer, Layer::Cli);
        assert_eq!(info.suggested_actions.last().unwrap().layer, Layer::ApiClient);
    }

    #[test]
    fn test_recovery_info_reads_chain() {
        let info = recovery_info(&rate_limited_chain());
        assert_eq!(info.category, Category::RateLimit);
        assert_eq!(info.correlation_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn test_report_collects_layers() {
        let err = rate_limited_chain();
        let report = ErrorReport::from_error(&err);

        assert_eq!(report.contexts.len(), 2);
        assert_eq!(report.contexts[0].0, Layer::ApiClient);
        assert_eq!(report.contexts[1].0, Layer::Orchestrator);
        assert!(report.context(Layer::Cli).is_none());
        assert_eq!(report.origin().map(|c| c.operation.as_str()), Some("generate"));
        assert_eq!(report.root_cause, "HTTP 429 Too Many Requests");
        assert_eq!(report.provider.as_deref(), Some("openai"));
        assert_eq!(report.status_code, Some(429));
    }

    #[test]
    fn test_user_message() {
        let text = user_message(&rate_limited_chain());
        assert!(text.starts_with("Error: The AI provider is rate limiting requests."));
        assert!(text.contains("Failed in api-client during generate"));
        assert!(text.contains("  1. Wait a minute and try again"));
        assert!(text.contains("  3. Back off before sending the next request"));
        assert!(text.contains("retried after 60 seconds"));
        assert!(text.contains("Correlation ID: req-9"));
    }

    #[test]
    fn test_user_message_without_retry_or_layers() {
        let text = user_message(&ClassifiedError::new("p", "m", Category::Auth));
        assert!(!text.contains("retried"));
        assert!(!text.contains("Failed in"));
        assert!(!text.contains("Correlation ID"));
    }

    #[test]
    fn test_debug_payload() {
        let payload = debug_payload(&rate_limited_chain());
        assert_eq!(payload["category"], "RateLimit");
        assert_eq!(payload["correlation_id"], "req-9");
        assert_eq!(payload["provider"], "openai");
        assert_eq!(payload["status_code"], 429);
        assert_eq!(payload["retry_possible"], true);
        assert_eq!(payload["wait_seconds"], 60);
        assert_eq!(payload["root_cause"], "HTTP 429 Too Many Requests");
        assert_eq!(payload["suggested_actions"][0]["layer"], "cli");
        assert_eq!(payload["layers"]["api-client"]["details"]["provider"], "openai");
        assert_eq!(
            payload["layers"]["orchestrator"]["details"]["workflow_stage"],
            "synthesis"
        );
        assert!(payload["layers"].get("cli").is_none());
    }

    #[test]
    fn test_debug_payload_for_plain_error() {
        let err = LayeredError::new("disk full", "cli", "write", Details::new(), "");
        let payload = debug_payload(&err);
        assert_eq!(payload["category"], "Unknown");
        assert!(payload["correlation_id"].is_null());
        assert!(payload["provider"].is_null());
        assert_eq!(payload["error"], "[cli:write] disk full");
    }
}
