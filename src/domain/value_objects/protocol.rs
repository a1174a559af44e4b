use serde::{Deserialize, Serialize};

/// Filesystem protocol of a dataset path (e.g. "file", "memory", "s3")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(String);

impl Protocol {
    pub const FILE: &'static str = "file";
    pub const MEMORY: &'static str = "memory";
    const HTTP: [&'static str; 2] = ["http", "https"];

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_ascii_lowercase())
    }

    pub fn file() -> Self {
        Self(Self::FILE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_file(&self) -> bool {
        self.0 == Self::FILE
    }

    /// HTTP(S) paths keep their scheme and cannot be versioned
    pub fn is_http(&self) -> bool {
        Self::HTTP.contains(&self.0.as_str())
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::file()
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_normalises_case() {
        assert_eq!(Protocol::new("S3").as_str(), "s3");
        assert!(Protocol::new("HTTPS").is_http());
        assert!(Protocol::default().is_file());
        assert!(!Protocol::new("memory").is_http());
    }
}
