//! Category detection from status codes and free-text error messages.
//!
//! Provider failures arrive either with an HTTP-like status code, with only a
//! message, or already classified. [`detect`] combines the three sources with a
//! fixed precedence: an existing category wins over the status code, and the
//! status code wins over message text.

use regex::Regex;
use std::error::Error;
use std::sync::OnceLock;

use super::chain::nearest_categorized;
use super::Category;

/// Maps an HTTP-like status code to a category.
///
/// Codes without a specific meaning map to [`Category::Unknown`].
pub fn category_from_status(status_code: u16) -> Category {
    match status_code {
        401 | 403 => Category::Auth,
        402 => Category::InsufficientCredits,
        429 => Category::RateLimit,
        400 => Category::InvalidRequest,
        404 => Category::NotFound,
        500..=599 => Category::Server,
        _ => Category::Unknown,
    }
}

/// Classifies free text using the built-in keyword groups.
///
/// Groups are evaluated in a fixed order and the first match wins. Cancellation
/// keywords are checked before network keywords so that a cancelled call whose
/// message mentions a timeout is not reported as a network failure.
pub fn category_from_message(text: &str) -> Category {
    CategoryDetector::builtin()
        .classify(text)
        .map(|detection| detection.category)
        .unwrap_or(Category::Unknown)
}

/// Determines the category of an error.
///
/// 1. If `err` or any error in its chain exposes a category, it is returned unchanged.
/// 2. Otherwise a status code with a specific meaning decides.
/// 3. Otherwise the error's rendered message is classified.
/// 4. Otherwise [`Category::Unknown`].
///
/// Pass `0` as `status_code` when no status is available.
pub fn detect(err: &(dyn Error + 'static), status_code: u16) -> Category {
    if let Some(categorized) = nearest_categorized(err) {
        return categorized.category();
    }

    let from_status = category_from_status(status_code);
    if from_status != Category::Unknown {
        return from_status;
    }

    category_from_message(&err.to_string())
}

/// A keyword pattern that assigns a category when it matches.
#[derive(Debug)]
pub struct MessagePattern {
    regex: Regex,
    category: Category,
    description: &'static str,
}

impl MessagePattern {
    /// Creates a new message pattern.
    ///
    /// # Panics
    /// Panics if the regex pattern is invalid.
    pub fn new(pattern: &str, category: Category, description: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
            category,
            description,
        }
    }

    /// Finds the first match in the text.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

/// The outcome of a successful message classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection<'a> {
    /// The detected category.
    pub category: Category,
    /// Description of the pattern that matched.
    pub description: &'static str,
    /// The matched fragment of the input text.
    pub matched: &'a str,
}

/// Ordered list of message patterns; the first matching pattern decides.
#[derive(Debug)]
pub struct CategoryDetector {
    patterns: Vec<MessagePattern>,
}

impl Default for CategoryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryDetector {
    /// Creates a detector with the built-in keyword groups.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(),
        }
    }

    /// Returns the process-wide detector with the built-in patterns.
    pub fn builtin() -> &'static CategoryDetector {
        static DETECTOR: OnceLock<CategoryDetector> = OnceLock::new();
        DETECTOR.get_or_init(CategoryDetector::new)
    }

    /// The built-in keyword groups, in evaluation order.
    fn default_patterns() -> Vec<MessagePattern> {
        vec![
            // Auth
            MessagePattern::new(
                r"(?i)\bauth(entication|orization)?\b",
                Category::Auth,
                "Authentication failure",
            ),
            MessagePattern::new(r"(?i)unauthori[sz]ed", Category::Auth, "Unauthorized"),
            MessagePattern::new(r"(?i)api[\s_-]?key", Category::Auth, "API key problem"),
            MessagePattern::new(r"(?i)credential", Category::Auth, "Credential problem"),
            MessagePattern::new(
                r"(?i)permission\s+denied|access\s+denied|forbidden",
                Category::Auth,
                "Permission denied",
            ),
            // InsufficientCredits
            MessagePattern::new(
                r"(?i)insufficient\s+(credits?|funds|balance)",
                Category::InsufficientCredits,
                "Insufficient credits",
            ),
            MessagePattern::new(
                r"(?i)payment\s+required",
                Category::InsufficientCredits,
                "Payment required",
            ),
            MessagePattern::new(
                r"(?i)\bbilling\b|credit\s+balance|out\s+of\s+credits",
                Category::InsufficientCredits,
                "Billing problem",
            ),
            // RateLimit
            MessagePattern::new(r"(?i)rate[\s_-]?limit", Category::RateLimit, "Rate limit"),
            MessagePattern::new(
                r"(?i)too\s+many\s+requests",
                Category::RateLimit,
                "Too many requests",
            ),
            MessagePattern::new(r"(?i)quota", Category::RateLimit, "Quota exceeded"),
            // ContentFiltered
            MessagePattern::new(
                r"(?i)content[\s_-]?filter",
                Category::ContentFiltered,
                "Content filter",
            ),
            MessagePattern::new(
                r"(?i)safety|moderation|blocked\s+(by|due\s+to)\s+(safety|policy|content)",
                Category::ContentFiltered,
                "Safety block",
            ),
            // InputLimit
            MessagePattern::new(
                r"(?i)token\s+limit|too\s+many\s+tokens",
                Category::InputLimit,
                "Token limit",
            ),
            MessagePattern::new(
                r"(?i)context\s+(length|window)|maximum\s+context",
                Category::InputLimit,
                "Context length exceeded",
            ),
            MessagePattern::new(
                r"(?i)(input|prompt)\s+(is\s+)?too\s+(long|large)",
                Category::InputLimit,
                "Input too long",
            ),
            // Cancelled
            MessagePattern::new(
                r"(?i)cancel+ed|cancellation",
                Category::Cancelled,
                "Cancelled",
            ),
            MessagePattern::new(
                r"(?i)deadline\s+(exceeded|expired)",
                Category::Cancelled,
                "Deadline exceeded",
            ),
            // Network
            MessagePattern::new(r"(?i)network", Category::Network, "Network error"),
            MessagePattern::new(r"(?i)connection", Category::Network, "Connection error"),
            MessagePattern::new(
                r"(?i)time[sd]?[\s_-]?out",
                Category::Network,
                "Timeout",
            ),
            MessagePattern::new(
                r"(?i)\bdns\b|no\s+such\s+host|unreachable",
                Category::Network,
                "Host unreachable",
            ),
            // NotFound
            MessagePattern::new(r"(?i)not\s+found", Category::NotFound, "Not found"),
            MessagePattern::new(
                r"(?i)does\s+not\s+exist|no\s+such\s+model",
                Category::NotFound,
                "Resource does not exist",
            ),
            // InvalidRequest
            MessagePattern::new(r"(?i)invalid", Category::InvalidRequest, "Invalid request"),
            MessagePattern::new(
                r"(?i)bad\s+request|malformed",
                Category::InvalidRequest,
                "Bad request",
            ),
        ]
    }

    /// Classifies text, returning the first pattern that matches.
    pub fn classify<'a>(&self, text: &'a str) -> Option<Detection<'a>> {
        self.patterns.iter().find_map(|pattern| {
            pattern.find(text).map(|matched| Detection {
                category: pattern.category,
                description: pattern.description,
                matched,
            })
        })
    }
}
