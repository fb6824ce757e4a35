use std::fmt;
use thiserror::Error;

/// The requested key cannot name a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed resource key: {reason}")]
pub struct MalformedResourceKey {
    pub reason: &'static str,
}

/// Storage path of a memo attachment, e.g. `42/1712345678_report.pdf`.
///
/// The first segment names the user who uploaded the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Validates a storage path.
    ///
    /// Requires at least two `/`-separated segments, none empty and none
    /// equal to `.` or `..`.
    pub fn parse(raw: &str) -> Result<Self, MalformedResourceKey> {
        let malformed = |reason| Err(MalformedResourceKey { reason });

        if raw.is_empty() {
            return malformed("empty key");
        }
        if !raw.contains('/') {
            return malformed("no owner segment");
        }
        for segment in raw.split('/') {
            if segment.is_empty() {
                return malformed("empty path segment");
            }
            if segment == "." || segment == ".." {
                return malformed("relative path segment");
            }
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading segment: the uploader's user id by convention.
    pub fn owner_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Trailing segment, used as the download file name.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// True if the key lives under `"{user_id}/"`.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_segment() == user_id.to_string()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
