use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::common::config::Config;

/// Where the user's exclusion list lives.
///
/// Reads are synchronous and happen on every guard decision. Values are
/// normalized absolute path strings.
pub trait ExclusionStore: Send + Sync {
    fn exclusions(&self) -> BTreeSet<String>;
    fn set_excluded(&self, path: &str, excluded: bool) -> Result<()>;
}

/// Process-local exclusion set
#[derive(Debug, Default)]
pub struct MemoryExclusions {
    paths: RwLock<BTreeSet<String>>,
}

impl MemoryExclusions {
    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: RwLock::new(paths.into_iter().map(Into::into).collect()),
        }
    }
}

impl ExclusionStore for MemoryExclusions {
    fn exclusions(&self) -> BTreeSet<String> {
        self.paths
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_excluded(&self, path: &str, excluded: bool) -> Result<()> {
        let mut paths = self
            .paths
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if excluded {
            paths.insert(path.to_string());
        } else {
            paths.remove(path);
        }
        Ok(())
    }
}

/// Exclusions persisted in the `exclude_paths` list of `config.toml`.
///
/// The file is re-read on every lookup. If a later read fails, the last
/// successfully loaded set is used so a broken file never empties the list.
#[derive(Debug)]
pub struct ConfigExclusions {
    path: PathBuf,
    last_good: RwLock<BTreeSet<String>>,
}

impl ConfigExclusions {
    /// Open the store at the default config location
    pub fn open_default() -> Result<Self> {
        Self::open(Config::config_path())
    }

    /// Open the store backed by an explicit config file. Fails if the file
    /// exists but cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Config::load_from(&path)?;
        Ok(Self {
            path,
            last_good: RwLock::new(config.exclude_paths.into_iter().collect()),
        })
    }

    fn remember(&self, set: &BTreeSet<String>) {
        *self
            .last_good
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = set.clone();
    }
}

impl ExclusionStore for ConfigExclusions {
    fn exclusions(&self) -> BTreeSet<String> {
        match Config::load_from(&self.path) {
            Ok(config) => {
                let set: BTreeSet<String> = config.exclude_paths.into_iter().collect();
                self.remember(&set);
                set
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not re-read exclusions, using last known list");
                self.last_good
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clone()
            }
        }
    }

    fn set_excluded(&self, path: &str, excluded: bool) -> Result<()> {
        let mut config = Config::load_from(&self.path)?;
        let mut set: BTreeSet<String> = config.exclude_paths.drain(..).collect();
        if excluded {
            set.insert(path.to_string());
        } else {
            set.remove(path);
        }
        config.exclude_paths = set.iter().cloned().collect();
        config.save_to(&self.path)?;
        self.remember(&set);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_toggle() {
        let store = MemoryExclusions::with_paths(["/a"]);
        store.set_excluded("/b", true).unwrap();
        store.set_excluded("/a", false).unwrap();
        assert_eq!(store.exclusions(), BTreeSet::from(["/b".to_string()]));
    }

    #[test]
    fn test_config_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let store = ConfigExclusions::open(&path).unwrap();
        assert!(store.exclusions().is_empty());
        store.set_excluded("/Users/x/Library/Caches/app", true).unwrap();

        let reopened = ConfigExclusions::open(&path).unwrap();
        assert!(reopened.exclusions().contains("/Users/x/Library/Caches/app"));
        assert_eq!(
            Config::load_from(&path).unwrap().exclude_paths,
            vec!["/Users/x/Library/Caches/app".to_string()]
        );
    }

    #[test]
    fn test_config_store_keeps_last_good_on_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let store = ConfigExclusions::open(&path).unwrap();
        store.set_excluded("/tmp/keep", true).unwrap();

        std::fs::write(&path, "exclude_paths = [not toml").unwrap();
        assert!(store.exclusions().contains("/tmp/keep"));
    }
}
