//! Competitor identity

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::{Result, TimingError};

/// Name identifying a competitor on the leaderboard.
///
/// Case-sensitive and never empty. Surrounding whitespace is trimmed on
/// construction. The same name may appear on several rows; each entry is
/// ranked on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompetitorName(String);

impl CompetitorName {
    /// Validate and wrap a competitor name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TimingError::validation("competitor name must not be empty"));
        }
        if trimmed.len() == name.len() {
            Ok(Self(name))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CompetitorName {
    type Error = TimingError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CompetitorName {
    type Error = TimingError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CompetitorName> for String {
    fn from(name: CompetitorName) -> Self {
        name.0
    }
}

impl AsRef<str> for CompetitorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CompetitorName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompetitorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_names() {
        assert!(matches!(CompetitorName::new(""), Err(TimingError::Validation { .. })));
        assert!(matches!(CompetitorName::new("   \t"), Err(TimingError::Validation { .. })));
    }

    #[test]
    fn trims_but_keeps_case() {
        let name = CompetitorName::new("  Mario ").unwrap();
        assert_eq!(name.as_str(), "Mario");
        assert_ne!(name, CompetitorName::new("mario").unwrap());
    }
}
