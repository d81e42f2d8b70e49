//! Resource keys identifying the logical dataset a job computes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MetricaError;

/// Validated identifier of a logical dataset (an account or table name).
///
/// Keys are ASCII letters, digits, `_`, `-` or `.`, at most
/// [`ResourceKey::MAX_LEN`] bytes long. The aggregate key `all` is reserved
/// and cannot be fetched directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Longest accepted key, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Validate and wrap a key. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `InvalidResourceKey` describing the first violated rule.
    pub fn parse(raw: &str) -> Result<Self, MetricaError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(MetricaError::invalid_key("resource key is empty"));
        }
        if key.len() > Self::MAX_LEN {
            return Err(MetricaError::invalid_key(format!(
                "resource key exceeds {} bytes",
                Self::MAX_LEN
            )));
        }
        if let Some(c) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(MetricaError::invalid_key(format!(
                "resource key contains invalid character {c:?}"
            )));
        }
        if key.eq_ignore_ascii_case("all") {
            return Err(MetricaError::invalid_key(
                "'all' is an aggregate view, not a fetchable resource",
            ));
        }
        Ok(Self(key.to_string()))
    }

    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceKey {
    type Err = MetricaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = MetricaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(value: ResourceKey) -> Self {
        value.0
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
