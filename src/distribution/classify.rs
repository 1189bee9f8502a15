//! Transfer error classification.
//!
//! Maps a refusal code from the transfer endpoint to how the recipient should
//! be skipped. Codes that are in neither table are `Unknown` and are skipped
//! permanently, since blind retries count against the sender's own limits.

use std::collections::HashSet;

use serde::Serialize;

/// Built-in codes that can never succeed within a session.
pub const DEFAULT_PERMANENT_CODES: &[&str] = &["transfer_disabled", "same_account", "no_data"];

/// Built-in codes that may succeed later.
pub const DEFAULT_TEMPORARY_CODES: &[&str] = &["not_accepting", "nothing_to_receive"];

/// Classification of a refusal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    Permanent,
    Temporary,
    Unknown,
}

impl FailureClass {
    /// Whether the recipient should be retried later in the session
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Temporary)
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Permanent => write!(f, "permanent"),
            FailureClass::Temporary => write!(f, "temporary"),
            FailureClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lookup tables from refusal code to class
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    permanent: HashSet<String>,
    temporary: HashSet<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            permanent: DEFAULT_PERMANENT_CODES.iter().map(|c| c.to_string()).collect(),
            temporary: DEFAULT_TEMPORARY_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add codes to the permanent table
    pub fn with_permanent<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for code in codes {
            let code = code.into();
            self.temporary.remove(&code);
            self.permanent.insert(code);
        }
        self
    }

    /// Add codes to the temporary table
    pub fn with_temporary<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for code in codes {
            let code = code.into();
            self.permanent.remove(&code);
            self.temporary.insert(code);
        }
        self
    }

    pub fn classify(&self, code: &str) -> FailureClass {
        if self.permanent.contains(code) {
            FailureClass::Permanent
        } else if self.temporary.contains(code) {
            FailureClass::Temporary
        } else {
            FailureClass::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_permanent_codes() {
        let c = ErrorClassifier::new();
        assert_eq!(c.classify("transfer_disabled"), FailureClass::Permanent);
        assert_eq!(c.classify("same_account"), FailureClass::Permanent);
        assert_eq!(c.classify("no_data"), FailureClass::Permanent);
    }

    #[test]
    fn test_default_temporary_codes() {
        let c = ErrorClassifier::new();
        assert_eq!(c.classify("not_accepting"), FailureClass::Temporary);
        assert_eq!(c.classify("nothing_to_receive"), FailureClass::Temporary);
    }

    #[test]
    fn test_unknown_code() {
        let c = ErrorClassifier::new();
        assert_eq!(c.classify("quota_exceeded"), FailureClass::Unknown);
        assert_eq!(c.classify(""), FailureClass::Unknown);
        assert!(!FailureClass::Unknown.is_retryable());
    }

    #[test]
    fn test_extend_tables() {
        let c = ErrorClassifier::new()
            .with_permanent(["account_banned"])
            .with_temporary(vec!["maintenance".to_string()]);
        assert_eq!(c.classify("account_banned"), FailureClass::Permanent);
        assert_eq!(c.classify("maintenance"), FailureClass::Temporary);
    }

    #[test]
    fn test_extension_moves_code_between_tables() {
        let c = ErrorClassifier::new().with_temporary(["no_data"]);
        assert_eq!(c.classify("no_data"), FailureClass::Temporary);

        let c = ErrorClassifier::new().with_permanent(["not_accepting"]);
        assert_eq!(c.classify("not_accepting"), FailureClass::Permanent);
    }

    #[test]
    fn test_failure_class_display() {
        assert_eq!(FailureClass::Permanent.to_string(), "permanent");
        assert_eq!(FailureClass::Temporary.to_string(), "temporary");
        assert_eq!(FailureClass::Unknown.to_string(), "unknown");
    }
}
