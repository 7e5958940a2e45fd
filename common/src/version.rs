// build identification printed by `s3p version`

/// Version of the running binary.
///
/// The semantic version always comes from Cargo.toml. Git information is captured by build.rs
/// and is absent when building outside of a git checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub semantic: String,
    /// `git describe` output, e.g. "v0.4.0-3-g1a2b3c4"
    pub git_describe: Option<String>,
    pub git_hash: Option<String>,
}

impl BuildInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semantic: env!("CARGO_PKG_VERSION").to_string(),
            git_describe: option_env!("S3P_GIT_DESCRIBE").map(String::from),
            git_hash: option_env!("S3P_GIT_HASH").map(String::from),
        }
    }
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3p {}", self.semantic)?;
        if let Some(ref git_describe) = self.git_describe {
            write!(f, " ({git_describe})")?;
        }
        if let Some(ref git_hash) = self.git_hash {
            write!(f, "\ncommit: {git_hash}")?;
        }
        Ok(())
    }
}
