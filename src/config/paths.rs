//! Storage directory resolution.
//!
//! A storage path from the config file or `MUISTI_STORAGE_PATH` has a leading
//! `~` replaced by the home directory and must not contain `..` components.
//! Snapshot files are placed directly inside it, one per index name.

use std::path::{Component, Path, PathBuf};

use crate::errors::Error;

/// Replace a leading `~` component with the home directory.
///
/// `~user` forms and a `~` anywhere else in the path are left alone, as is
/// everything when no home directory is known.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Reject storage paths that are empty or climb out through `..`.
pub fn check_storage_path(path: &Path) -> Result<(), Error> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config("Storage path cannot be empty".to_string()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::Config(format!(
            "Invalid storage path {}: '..' components are not allowed",
            path.display()
        )));
    }
    Ok(())
}

/// Expand `~` and check the result. `..` is rejected before it can be
/// combined with the home directory.
pub fn resolve_storage_path(path: &Path) -> Result<PathBuf, Error> {
    check_storage_path(path)?;
    Ok(expand_home(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = expand_home(Path::new("~/muisti/store"));
        assert_eq!(path, home.join("muisti/store"));
        assert_eq!(expand_home(Path::new("~")), home);
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        for raw in ["/absolute/path", "relative/path", "/data/~backup", "~other/dir"] {
            assert_eq!(expand_home(Path::new(raw)), PathBuf::from(raw));
        }
    }

    #[test]
    fn test_check_storage_path() {
        assert!(check_storage_path(Path::new("/var/lib/muisti")).is_ok());
        assert!(check_storage_path(Path::new("./store")).is_ok());
        assert!(matches!(
            check_storage_path(Path::new("")),
            Err(Error::Config(_))
        ));
        for raw in ["..", "../store", "/data/../etc", "store/.."] {
            assert!(
                matches!(check_storage_path(Path::new(raw)), Err(Error::Config(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_resolve_rejects_traversal_under_home() {
        assert!(matches!(
            resolve_storage_path(Path::new("~/../shared")),
            Err(Error::Config(_))
        ));
        assert_eq!(
            resolve_storage_path(Path::new("/srv/muisti")).unwrap(),
            PathBuf::from("/srv/muisti")
        );
    }
}
