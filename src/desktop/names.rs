//! Desktop label to filesystem path lookup.
//!
//! Desktop labels usually omit the extension, so every entry is registered
//! under both its file name and its stem. Keys are lowercased. When two
//! entries collide (`Report` folder and `Report.txt`), the first one
//! registered keeps the key. Entries are registered directory by directory
//! in name order, so the outcome is deterministic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Case-insensitive name -> path map.
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    entries: HashMap<String, PathBuf>,
}

impl NameIndex {
    /// Enumerate `directories` in order. A directory that cannot be read is
    /// skipped without affecting the others.
    pub fn build(directories: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for dir in directories {
            match list_entries(dir) {
                Ok(paths) => {
                    log::debug!(
                        "[INTROSPECT] {} entries in {}",
                        paths.len(),
                        dir.display()
                    );
                    for path in paths {
                        index.register(path);
                    }
                }
                Err(e) => {
                    log::debug!("[INTROSPECT] Cannot enumerate {}: {}", dir.display(), e);
                }
            }
        }
        index
    }

    /// Register `path` under its file name and stem unless already taken.
    pub fn register(&mut self, path: PathBuf) {
        let keys = [
            path.file_name().map(|n| n.to_string_lossy().to_lowercase()),
            path.file_stem().map(|s| s.to_string_lossy().to_lowercase()),
        ];
        for key in keys.into_iter().flatten() {
            if !key.is_empty() {
                self.entries.entry(key).or_insert_with(|| path.clone());
            }
        }
    }

    /// Look up a label as shown, then without its own extension.
    pub fn resolve(&self, label: &str) -> Option<&Path> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        if let Some(path) = self.entries.get(&label.to_lowercase()) {
            return Some(path);
        }

        Path::new(label)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .and_then(|stem| self.entries.get(&stem))
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn list_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// The per-user desktop followed by the shared desktop.
pub fn default_desktop_dirs() -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();
    if let Some(user) = dirs::desktop_dir() {
        dirs_out.push(user);
    }
    if let Some(public) = std::env::var_os("PUBLIC") {
        dirs_out.push(PathBuf::from(public).join("Desktop"));
    }
    dirs_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_name_and_stem_both_resolve() {
        let mut index = NameIndex::default();
        index.register(PathBuf::from("/desk/Budget.xlsx"));

        assert_eq!(index.resolve("Budget"), Some(Path::new("/desk/Budget.xlsx")));
        assert_eq!(index.resolve("budget.XLSX"), Some(Path::new("/desk/Budget.xlsx")));
    }

    #[test]
    fn test_label_with_unknown_extension_falls_back_to_stem() {
        let mut index = NameIndex::default();
        index.register(PathBuf::from("/desk/Tools"));
        assert_eq!(index.resolve("Tools.lnk"), Some(Path::new("/desk/Tools")));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut index = NameIndex::default();
        index.register(PathBuf::from("/user/Report"));
        index.register(PathBuf::from("/user/Report.txt"));

        assert_eq!(index.resolve("Report"), Some(Path::new("/user/Report")));
        assert_eq!(index.resolve("Report.txt"), Some(Path::new("/user/Report.txt")));
    }

    #[test]
    fn test_empty_label_is_a_miss() {
        let mut index = NameIndex::default();
        index.register(PathBuf::from("/desk/a"));
        assert!(index.resolve("  ").is_none());
        assert!(index.resolve("missing").is_none());
    }

    #[test]
    fn test_build_prefers_user_desktop_and_tolerates_missing_dir() {
        let user = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        fs::create_dir(user.path().join("Shared")).unwrap();
        fs::create_dir(public.path().join("Shared")).unwrap();
        fs::write(public.path().join("readme.txt"), b"hi").unwrap();

        let missing = user.path().join("does-not-exist");
        let index = NameIndex::build(&[
            missing,
            user.path().to_path_buf(),
            public.path().to_path_buf(),
        ]);

        assert_eq!(index.resolve("shared"), Some(user.path().join("Shared").as_path()));
        assert_eq!(
            index.resolve("readme"),
            Some(public.path().join("readme.txt").as_path())
        );
    }
}
