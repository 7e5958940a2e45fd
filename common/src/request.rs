use crate::Error;
use crate::uri::S3Uri;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// One CLI-level transfer: a single file, a directory tree or a remote prefix.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub direction: Direction,
    pub local_path: std::path::PathBuf,
    pub bucket: String,
    /// Object key (download), key prefix (recursive download) or destination prefix (upload)
    pub key: String,
    pub recursive: bool,
    /// Only valid for non-recursive downloads
    pub version_id: Option<String>,
    pub skip_path_validation: bool,
}

impl TransferRequest {
    /// Upload `local_path` under the key prefix of `remote`. Directories are walked.
    pub fn upload(local_path: impl Into<std::path::PathBuf>, remote: &S3Uri) -> Self {
        Self {
            direction: Direction::Upload,
            local_path: local_path.into(),
            bucket: remote.bucket.clone(),
            key: remote.key.clone(),
            recursive: true,
            version_id: None,
            skip_path_validation: false,
        }
    }

    pub fn download(remote: &S3Uri, local_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            direction: Direction::Download,
            local_path: local_path.into(),
            bucket: remote.bucket.clone(),
            key: remote.key.clone(),
            recursive: false,
            version_id: None,
            skip_path_validation: false,
        }
    }

    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// An empty id is the same as no id.
    #[must_use]
    pub fn with_version_id(mut self, version_id: Option<String>) -> Self {
        self.version_id = version_id.filter(|id| !id.is_empty());
        self
    }

    #[must_use]
    pub fn with_skip_path_validation(mut self, skip: bool) -> Self {
        self.skip_path_validation = skip;
        self
    }

    /// Argument checks that need no I/O.
    pub fn validate(&self) -> Result<(), Error> {
        if self.version_id.is_some() {
            if self.direction == Direction::Upload {
                return Err(Error::Argument(
                    "version ID can only be specified for downloads".to_string(),
                ));
            }
            if self.recursive {
                return Err(Error::Argument(
                    "version ID cannot be specified when downloading recursively".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn expect_direction(&self, direction: Direction) -> Result<(), Error> {
        if self.direction != direction {
            return Err(Error::Argument(format!(
                "{} request submitted to the {}er",
                self.direction, direction
            )));
        }
        self.validate()
    }
}

/// A single object transfer derived from a [`TransferRequest`].
#[derive(Debug, Clone)]
pub struct ObjectTask {
    pub local_path: std::path::PathBuf,
    pub bucket: String,
    pub key: String,
}

impl ObjectTask {
    #[must_use]
    pub fn uri(&self) -> S3Uri {
        S3Uri::new(self.bucket.clone(), self.key.clone())
    }
}
