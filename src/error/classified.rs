//! The standard error carrier produced at the api-client boundary.
//!
//! [`ClassifiedError`] records which provider failed, why (its [`Category`]),
//! the correlation id of the request and the original error as its cause.
//! Wrapping never mutates an existing carrier: every wrap returns a new value
//! that copies all previously populated fields forward, so a field set once is
//! only replaced when the caller supplies an explicit new value.

use std::error::Error;
use std::fmt;
use tracing::debug;

use super::chain::find_in_chain;
use super::detector::detect;
use super::{BoxError, Categorized, Category};

/// A provider failure tagged with a category.
#[derive(Debug)]
pub struct ClassifiedError {
    provider: String,
    code: Option<String>,
    status_code: Option<u16>,
    message: String,
    correlation_id: Option<String>,
    cause: Option<BoxError>,
    category: Category,
    suggestion: Option<String>,
    details: Option<String>,
}

impl ClassifiedError {
    /// Creates a carrier from explicit values.
    pub fn new(provider: impl Into<String>, message: impl Into<String>, category: Category) -> Self {
        Self {
            provider: provider.into(),
            code: None,
            status_code: None,
            message: message.into(),
            correlation_id: None,
            cause: None,
            category,
            suggestion: None,
            details: None,
        }
    }

    /// Sets the provider-specific error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the HTTP-like status code.
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Sets the correlation id. An empty id leaves the current value in place.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        if !correlation_id.is_empty() {
            self.correlation_id = Some(correlation_id);
        }
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Sets the suggestion shown to users.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Sets free-form details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// The wrapped error, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Wraps `err` with provider, message and category.
    ///
    /// If the chain of `err` already contains a `ClassifiedError`, the result
    /// copies its fields forward and only replaces provider and message when the
    /// supplied values are non-empty, and category when it is not `Unknown`.
    /// Otherwise a new carrier is created with `err` as its cause.
    pub fn wrap<E>(err: E, provider: &str, message: &str, category: Category) -> Self
    where
        E: Into<BoxError>,
    {
        Self::rewrap(err.into(), provider, message, category, "")
    }

    /// Like [`ClassifiedError::wrap`], additionally setting a non-empty correlation id.
    ///
    /// An empty `correlation_id` never clears an id that is already set.
    pub fn wrap_with_correlation<E>(
        err: E,
        provider: &str,
        message: &str,
        category: Category,
        correlation_id: &str,
    ) -> Self
    where
        E: Into<BoxError>,
    {
        Self::rewrap(err.into(), provider, message, category, correlation_id)
    }

    fn rewrap(
        err: BoxError,
        provider: &str,
        message: &str,
        category: Category,
        correlation_id: &str,
    ) -> Self {
        let carrier = match err.downcast::<ClassifiedError>() {
            // Outermost error is the carrier: take it over, keeping its cause.
            Ok(existing) => *existing,
            Err(err) => {
                let forwarded = find_in_chain::<ClassifiedError>(&*err).map(Self::copy_fields);
                match forwarded {
                    // Carrier nested under other wrappers: the whole chain becomes the cause.
                    Some(carrier) => Self {
                        cause: Some(err),
                        ..carrier
                    },
                    None => {
                        return Self::new(provider, message, category)
                            .with_cause(err)
                            .with_correlation_id(correlation_id);
                    }
                }
            }
        };

        carrier.updated(provider, message, category, correlation_id)
    }

    /// Copies every field except the cause.
    fn copy_fields(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            code: self.code.clone(),
            status_code: self.status_code,
            message: self.message.clone(),
            correlation_id: self.correlation_id.clone(),
            cause: None,
            category: self.category,
            suggestion: self.suggestion.clone(),
            details: self.details.clone(),
        }
    }

    fn updated(
        mut self,
        provider: &str,
        message: &str,
        category: Category,
        correlation_id: &str,
    ) -> Self {
        if !provider.is_empty() {
            self.provider = provider.to_string();
        }
        if !message.is_empty() {
            self.message = message.to_string();
        }
        if category != Category::Unknown {
            self.category = category;
        }
        self.with_correlation_id(correlation_id)
    }

    /// Classifies a failed provider call.
    ///
    /// An error that already is a `ClassifiedError` is returned unchanged.
    /// Otherwise the category is derived with [`detect`] and the carrier is
    /// built from the standard message table, with `response_body` as details.
    /// Pass `0` as `status_code` when no status is available.
    pub fn from_api_failure<E>(
        provider: &str,
        err: E,
        status_code: u16,
        response_body: &str,
    ) -> Self
    where
        E: Into<BoxError>,
    {
        let err: BoxError = err.into();
        let err = match err.downcast::<ClassifiedError>() {
            Ok(existing) => return *existing,
            Err(err) => err,
        };

        let category = detect(&*err, status_code);
        debug!(
            provider = %provider,
            status_code = status_code,
            category = %category,
            "Classified provider failure"
        );

        let classified = standard_message(provider, category, Some(err), response_body);
        if status_code != 0 {
            classified.with_status_code(status_code)
        } else {
            classified
        }
    }

    /// Renders the error followed by the suggestion, if any.
    pub fn user_facing(&self) -> String {
        match &self.suggestion {
            Some(suggestion) => format!("{}\n\nSuggestion: {}", self, suggestion),
            None => self.to_string(),
        }
    }

    /// Renders every populated field, one per line, in a fixed order.
    pub fn debug_info(&self) -> String {
        let mut lines = Vec::new();

        if !self.provider.is_empty() {
            lines.push(format!("Provider: {}", self.provider));
        }
        lines.push(format!("Category: {}", self.category));
        if !self.message.is_empty() {
            lines.push(format!("Message: {}", self.message));
        }
        if let Some(code) = &self.code {
            lines.push(format!("Error Code: {}", code));
        }
        if let Some(status_code) = self.status_code {
            lines.push(format!("Status Code: {}", status_code));
        }
        if let Some(correlation_id) = &self.correlation_id {
            lines.push(format!("Correlation ID: {}", correlation_id));
        }
        if let Some(cause) = &self.cause {
            lines.push(format!("Original Error: {}", cause));
        }
        if let Some(details) = &self.details {
            lines.push(format!("Details: {}", details));
        }
        if let Some(suggestion) = &self.suggestion {
            lines.push(format!("Suggestion: {}", suggestion));
        }

        lines.join("\n")
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

impl Categorized for ClassifiedError {
    fn category(&self) -> Category {
        self.category
    }
}

/// Returns the message template and suggestion for a category.
pub fn standard_template(provider: &str, category: Category) -> (String, &'static str) {
    match category {
        Category::Auth => (
            format!("Authentication failed with the {} API", provider),
            "Check that your API key is valid and has not expired. Ensure the provider's API key environment variable is set correctly.",
        ),
        Category::RateLimit => (
            format!("Request rate limit or quota exceeded on the {} API", provider),
            "Wait and try again later. Consider upgrading your API usage tier if this happens frequently.",
        ),
        Category::InvalidRequest => (
            format!("Invalid request sent to the {} API", provider),
            "Check the prompt format and parameters. Ensure they comply with the API requirements.",
        ),
        Category::NotFound => (
            format!("The requested model or resource was not found on the {} API", provider),
            "Verify that the model name is correct and that it is available for your account.",
        ),
        Category::Server => (
            format!("The {} API service encountered an internal error", provider),
            "This is usually temporary. Wait a few moments and try again.",
        ),
        Category::Network => (
            format!("Network error while connecting to the {} API", provider),
            "Check your internet connection and try again.",
        ),
        Category::Cancelled => (
            format!("The request to the {} API was cancelled", provider),
            "The operation was interrupted. Try again, with a longer timeout if needed.",
        ),
        Category::InputLimit => (
            format!("Input token limit exceeded for the {} model", provider),
            "Reduce the number or size of the input files, or use a model with a larger context window.",
        ),
        Category::ContentFiltered => (
            format!("Content was filtered by the {} API safety settings", provider),
            "Your prompt or input may have triggered safety filters. Review and modify the content.",
        ),
        Category::InsufficientCredits => (
            format!("Insufficient credits or payment required for the {} API", provider),
            "Check your account balance and billing details, and add credits if needed.",
        ),
        Category::Unknown => (
            format!("Error calling the {} API", provider),
            "Check the logs for more details or try again.",
        ),
    }
}

/// Appends `details` in parentheses unless empty or already present.
pub fn append_details(message: &str, details: &str) -> String {
    if details.is_empty() || message.contains(details) {
        message.to_string()
    } else {
        format!("{} ({})", message, details)
    }
}

/// Builds a carrier from the standard message table.
pub fn standard_message(
    provider: &str,
    category: Category,
    original: Option<BoxError>,
    details: &str,
) -> ClassifiedError {
    let (template, suggestion) = standard_template(provider, category);
    let mut classified = ClassifiedError::new(provider, append_details(&template, details), category)
        .with_suggestion(suggestion);

    if !details.is_empty() {
        classified = classified.with_details(details);
    }
    if let Some(original) = original {
        classified = classified.with_cause(original);
    }
    classified
}

/// Wraps an optional error; `None` passes through as `None`.
pub fn wrap<E>(err: Option<E>, provider: &str, message: &str, category: Category) -> Option<ClassifiedError>
where
    E: Into<BoxError>,
{
    err.map(|err| ClassifiedError::wrap(err, provider, message, category))
}

/// Wraps an optional error with a correlation id; `None` passes through as `None`.
pub fn wrap_with_correlation<E>(
    err: Option<E>,
    provider: &str,
    message: &str,
    category: Category,
    correlation_id: &str,
) -> Option<ClassifiedError>
where
    E: Into<BoxError>,
{
    err.map(|err| {
        ClassifiedError::wrap_with_correlation(err, provider, message, category, correlation_id)
    })
}

/// Classifies an optional provider failure; `None` passes through as `None`.
pub fn from_api_failure<E>(
    provider: &str,
    err: Option<E>,
    status_code: u16,
    response_body: &str,
) -> Option<ClassifiedError>
where
    E: Into<BoxError>,
{
    err.map(|err| ClassifiedError::from_api_failure(provider, err, status_code, response_body))
}
