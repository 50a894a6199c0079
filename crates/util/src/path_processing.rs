use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Resolves a workflow file argument.
///
/// Paths that exist as given, absolute paths, and calls without a base
/// directory are returned unchanged; other relative paths are looked up under
/// `base_dir`.
pub fn resolve_under(path: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() && !path.exists() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_tilde(" quests/a.xml "), PathBuf::from("quests/a.xml"));
    }

    #[test]
    fn expands_home_prefix() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/taskflow"), home.join("taskflow"));
            assert_eq!(expand_tilde("~"), home);
        }
    }

    #[test]
    fn relative_missing_paths_resolve_under_base() {
        let base = tempfile::tempdir().expect("tempdir");
        let resolved = resolve_under(Path::new("quest_a.xml"), Some(base.path()));
        assert_eq!(resolved, base.path().join("quest_a.xml"));

        let absolute = base.path().join("elsewhere.xml");
        assert_eq!(resolve_under(&absolute, Some(Path::new("/unused"))), absolute);
        assert_eq!(resolve_under(Path::new("quest_a.xml"), None), PathBuf::from("quest_a.xml"));
    }
}
