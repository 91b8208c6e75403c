use incubator_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the incubator root directory.
///
/// Priority:
/// 1. `--root` flag / `INCUBATOR_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.incubator/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marked_ancestor(&cwd).unwrap_or(cwd)
}

fn find_marked_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(paths::INCUBATOR_DIR).is_dir())
        .map(Path::to_path_buf)
}
