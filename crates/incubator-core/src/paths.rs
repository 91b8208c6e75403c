use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const INCUBATOR_DIR: &str = ".incubator";
pub const CONFIG_FILE: &str = ".incubator/config.yaml";
pub const DB_FILE: &str = ".incubator/incubator.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn incubator_dir(root: &Path) -> PathBuf {
    root.join(INCUBATOR_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_incubator_dir() {
        let root = Path::new("/tmp/hatchery");
        assert_eq!(incubator_dir(root), PathBuf::from("/tmp/hatchery/.incubator"));
        assert!(config_path(root).starts_with(incubator_dir(root)));
        assert!(db_path(root).starts_with(incubator_dir(root)));
    }
}
