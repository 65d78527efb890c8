//! The closed taxonomy of provider failure categories.
//!
//! Every failure that crosses the api-client boundary is tagged with exactly one
//! [`Category`]. The set is closed: conversions from raw tags or text never fail
//! and fall back to [`Category::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a call to an LLM provider failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Category {
    /// The failure could not be classified.
    #[default]
    Unknown = 0,
    /// Invalid, expired or missing credentials (HTTP 401/403).
    Auth = 1,
    /// Request rate or quota exceeded (HTTP 429).
    RateLimit = 2,
    /// Malformed request or unsupported parameters (HTTP 400).
    InvalidRequest = 3,
    /// Model or resource does not exist (HTTP 404).
    NotFound = 4,
    /// Provider-side failure (HTTP 5xx).
    Server = 5,
    /// Connectivity problems between us and the provider.
    Network = 6,
    /// The operation was cancelled or its deadline expired.
    Cancelled = 7,
    /// Input exceeded the model's token or context limit.
    InputLimit = 8,
    /// Content was blocked by the provider's safety filters.
    ContentFiltered = 9,
    /// Billing problem or insufficient credits (HTTP 402).
    InsufficientCredits = 10,
}

impl Category {
    /// Every category, in tag order.
    pub const ALL: [Category; 11] = [
        Category::Unknown,
        Category::Auth,
        Category::RateLimit,
        Category::InvalidRequest,
        Category::NotFound,
        Category::Server,
        Category::Network,
        Category::Cancelled,
        Category::InputLimit,
        Category::ContentFiltered,
        Category::InsufficientCredits,
    ];

    /// Converts a raw integer tag into a category.
    ///
    /// Tags outside the defined range map to [`Category::Unknown`].
    pub fn from_tag(tag: i64) -> Self {
        usize::try_from(tag)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(Category::Unknown)
    }

    /// Returns the integer tag of this category.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the category name as a static string.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Unknown => "Unknown",
            Category::Auth => "Auth",
            Category::RateLimit => "RateLimit",
            Category::InvalidRequest => "InvalidRequest",
            Category::NotFound => "NotFound",
            Category::Server => "Server",
            Category::Network => "Network",
            Category::Cancelled => "Cancelled",
            Category::InputLimit => "InputLimit",
            Category::ContentFiltered => "ContentFiltered",
            Category::InsufficientCredits => "InsufficientCredits",
        }
    }

    /// Whether failures of this kind are typically transient.
    ///
    /// This is a classification hint only; callers own the retry decision.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Category::RateLimit
                | Category::Server
                | Category::Network
                | Category::Cancelled
                | Category::Unknown
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text does not name a category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    /// Parses a category name case-insensitively, ignoring `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
