//! Locating optional model files for tests.
//!
//! Downscaled daily grids run to gigabytes per model and are never checked
//! in. Tests that want one look for it by file name and skip otherwise.

use std::path::PathBuf;

/// Environment variable naming an extra directory to search first.
pub const TEST_DATA_ENV: &str = "TEST_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let here = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    here.ancestors().nth(2).map(PathBuf::from).unwrap_or(here)
}

/// Directories searched by [`find_test_file`], in order.
pub fn test_data_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut dirs: Vec<PathBuf> = std::env::var_os(TEST_DATA_ENV).map(PathBuf::from).into_iter().collect();
    dirs.push(root.join("crates").join("netcdf-parser").join("testdata"));
    dirs.push(root.join("testdata"));
    dirs
}

/// First existing `<dir>/<name>` over [`test_data_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    test_data_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory removed when the guard is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("climate_test_")
        .tempdir()
        .expect("create scratch directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_holds_workspace_manifest() {
        let root = workspace_root();
        let manifest = std::fs::read_to_string(root.join("Cargo.toml")).unwrap();
        assert!(manifest.contains("[workspace]"), "not a workspace root: {:?}", root);
    }

    #[test]
    fn test_search_ends_at_root_testdata() {
        let dirs = test_data_dirs();
        assert_eq!(dirs.last().unwrap(), &workspace_root().join("testdata"));
    }

    #[test]
    fn test_absent_file_is_none() {
        assert!(find_test_file("pr_day_NOT-A-MODEL_historical_1850.nc").is_none());
    }

    #[test]
    fn test_scratch_dir_is_removed_on_drop() {
        let dir = temp_test_dir();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }
}
