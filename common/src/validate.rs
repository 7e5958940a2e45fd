//! Rejects relative paths that could escape a destination directory.
//!
//! Object keys are chosen by whoever wrote the bucket, so a key like `../../etc/passwd` must never
//! turn into a local write outside the directory the user asked for. Every key-derived local path
//! goes through [`validate_path`] before any filesystem call is made.

use crate::Error;

/// Check `path` for traversal, and if `base_dir` is non-empty, check that `base_dir/path` stays
/// inside `base_dir`. With `skip` set nothing is checked.
///
/// The check is lexical: symlinks under `base_dir` are not resolved.
pub fn validate_path(path: &str, base_dir: &std::path::Path, skip: bool) -> Result<(), Error> {
    if skip {
        return Ok(());
    }
    let path = to_slash(path);
    if path.contains("../") || path.contains("..\\") {
        return Err(Error::traversal(
            path,
            "contains directory traversal sequence",
        ));
    }
    if path.starts_with("..") {
        return Err(Error::traversal(path, "starts with directory traversal"));
    }
    if base_dir.as_os_str().is_empty() {
        return Ok(());
    }
    let base = std::path::absolute(base_dir).map_err(|error| {
        Error::local_io(
            format!("failed to resolve base directory {base_dir:?}"),
            error,
        )
    })?;
    let base = normalize(&base);
    if resolve_under(&base, std::path::Path::new(&path)).is_none() {
        return Err(Error::traversal(
            path,
            format!("escapes base directory {base_dir:?}"),
        ));
    }
    Ok(())
}

fn to_slash(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &std::path::Path) -> std::path::PathBuf {
    let mut normalized = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Join `relative` onto `base` the way a destination path is built: leading separators do not
/// reset to the filesystem root. Returns `None` as soon as a `..` would climb above `base`.
fn resolve_under(base: &std::path::Path, relative: &std::path::Path) -> Option<std::path::PathBuf> {
    let mut resolved = base.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            std::path::Component::Normal(name) => {
                resolved.push(name);
                depth += 1;
            }
            std::path::Component::ParentDir => {
                depth = depth.checked_sub(1)?;
                resolved.pop();
            }
            std::path::Component::CurDir
            | std::path::Component::RootDir
            | std::path::Component::Prefix(_) => {}
        }
    }
    Some(resolved)
}
