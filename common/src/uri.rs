use crate::Error;

/// Scheme token every object URI must carry (compared case-insensitively).
pub const SCHEME: &str = "s3";

/// `s3://bucket/key...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    /// Everything after the first `/` following the bucket; may be empty.
    pub key: String,
}

impl S3Uri {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::str::FromStr for S3Uri {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| Error::InvalidUri {
            uri: uri.to_string(),
            reason,
        };
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid(format!("expected {SCHEME}://bucket/key")))?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(invalid(format!("invalid scheme {scheme:?}")));
        }
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("missing bucket name".to_string()));
        }
        crate::validate::validate_path(key, std::path::Path::new(""), false)
            .map_err(|error| invalid(format!("invalid remote path: {error}")))?;
        Ok(Self::new(bucket, key))
    }
}

impl std::fmt::Display for S3Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}://{}/{}", SCHEME, self.bucket, self.key)
    }
}
