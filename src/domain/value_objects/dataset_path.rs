use serde::Serialize;

use super::Protocol;
use crate::domain::errors::DatasetError;

const PROTOCOL_DELIMITER: &str = "://";

/// A dataset filepath split into protocol and protocol-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetPath {
    protocol: Protocol,
    path: String,
}

impl DatasetPath {
    /// Split `filepath` into protocol and path
    ///
    /// Paths without a `proto://` prefix use the `file` protocol. A single
    /// letter before `:` is a Windows drive, not a protocol.
    /// HTTP(S) paths cannot be versioned.
    pub fn parse(filepath: &str, versioned: bool) -> Result<Self, DatasetError> {
        if filepath.is_empty() {
            return Err(DatasetError::PathResolution(
                "Filepath cannot be empty".to_string(),
            ));
        }

        let (protocol, path) = match filepath.split_once(PROTOCOL_DELIMITER) {
            Some((scheme, rest)) if is_scheme(scheme) => (Protocol::new(scheme), rest.to_string()),
            _ => (Protocol::file(), filepath.to_string()),
        };

        if protocol.is_http() && versioned {
            return Err(DatasetError::PathResolution(
                "HTTP(s) DataSet doesn't support versioning.".to_string(),
            ));
        }

        if path.is_empty() {
            return Err(DatasetError::PathResolution(format!(
                "No path after protocol in '{}'",
                filepath
            )));
        }

        Ok(Self { protocol, path })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Path relative to the protocol
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment
    pub fn basename(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }

    /// Path handed to the filesystem for `path`
    ///
    /// HTTP(S) filesystems need the full URL; everything else is addressed
    /// without the protocol.
    pub fn filesystem_path(&self, path: &str) -> String {
        if self.protocol.is_http() {
            format!("{}{}{}", self.protocol, PROTOCOL_DELIMITER, path)
        } else {
            path.to_string()
        }
    }
}

impl std::fmt::Display for DatasetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

fn is_scheme(scheme: &str) -> bool {
    // Windows drive letters look like a one-letter scheme
    scheme.len() > 1
        && scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_is_local() {
        let path = DatasetPath::parse("data/01_raw/readings.h5", false).unwrap();
        assert!(path.protocol().is_file());
        assert_eq!(path.path(), "data/01_raw/readings.h5");
        assert_eq!(path.basename(), "readings.h5");
    }

    #[test]
    fn test_protocol_prefix_is_split() {
        let path = DatasetPath::parse("s3://bucket/raw/readings.h5", true).unwrap();
        assert_eq!(path.protocol().as_str(), "s3");
        assert_eq!(path.path(), "bucket/raw/readings.h5");
        assert_eq!(path.filesystem_path(path.path()), "bucket/raw/readings.h5");
    }

    #[test]
    fn test_file_protocol_prefix() {
        let path = DatasetPath::parse("file:///tmp/test.json", false).unwrap();
        assert!(path.protocol().is_file());
        assert_eq!(path.path(), "/tmp/test.json");
    }

    #[test]
    fn test_windows_drive_is_not_a_protocol() {
        let path = DatasetPath::parse("C://Users/test.json", false).unwrap();
        assert!(path.protocol().is_file());
        assert_eq!(path.path(), "C://Users/test.json");
    }

    #[test]
    fn test_http_keeps_full_url_for_filesystem() {
        let path = DatasetPath::parse("https://example.com/plot.json", false).unwrap();
        assert!(path.protocol().is_http());
        assert_eq!(
            path.filesystem_path(path.path()),
            "https://example.com/plot.json"
        );
    }

    #[test]
    fn test_http_rejects_versioning() {
        let err = DatasetPath::parse("http://example.com/plot.json", true).unwrap_err();
        assert!(err.is_path_resolution());
        assert!(err.to_string().contains("doesn't support versioning"));
    }

    #[test]
    fn test_empty_paths_rejected() {
        assert!(DatasetPath::parse("", false).is_err());
        assert!(DatasetPath::parse("s3://", false).is_err());
    }
}
