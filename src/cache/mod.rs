//! Incremental build cache.
//!
//! Two JSON files in the cache directory describe the previous run: the set
//! of generated source paths and the reference map the run was built from.
//! Both must load cleanly for a warm build; a missing or damaged file means
//! the previous output cannot be trusted and the next run starts cold. The
//! cache is advisory only, deleting it costs one full regeneration and
//! nothing else.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{references::ReferenceMap, Result};

/// File holding the generated source paths of the previous run.
pub const GENERATED_SET_FILENAME: &str = "classes.json";

/// File holding the reference map of the previous run.
pub const REFERENCES_FILENAME: &str = "references.json";

/// The generated source paths of one run, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedSet {
    paths: IndexSet<String>,
}

impl GeneratedSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> GeneratedSet {
        GeneratedSet::default()
    }

    /// Build a set from generated paths.
    #[must_use]
    pub fn from_paths(paths: IndexSet<String>) -> GeneratedSet {
        GeneratedSet { paths }
    }

    /// `true` when `path` was generated.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Iterate paths in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// `true` when no paths were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths in `current` this set does not have: files a warm build must
    /// write.
    #[must_use]
    pub fn to_add<'a>(&self, current: &'a GeneratedSet) -> Vec<&'a str> {
        current
            .paths
            .iter()
            .filter(|path| !self.paths.contains(*path))
            .map(String::as_str)
            .collect()
    }

    /// Paths this set has that `current` does not: stale files a warm build
    /// must delete.
    #[must_use]
    pub fn to_remove<'a>(&'a self, current: &GeneratedSet) -> Vec<&'a str> {
        self.paths
            .iter()
            .filter(|path| !current.paths.contains(*path))
            .map(String::as_str)
            .collect()
    }
}

impl FromIterator<String> for GeneratedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> GeneratedSet {
        GeneratedSet {
            paths: iter.into_iter().collect(),
        }
    }
}

/// What the previous run left behind.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildState {
    /// No usable cache; regenerate everything into an empty output directory
    Cold,
    /// A trusted previous run to diff against
    Warm(CacheSnapshot),
}

/// The loaded cache of one previous run.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// Paths the previous run generated
    pub generated: GeneratedSet,
    /// References the previous run was built from
    pub references: ReferenceMap,
}

/// Reads and writes the cache directory.
pub struct BuildCache {
    dir: PathBuf,
}

impl BuildCache {
    /// A cache rooted at `dir`. Nothing is touched until load or persist.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> BuildCache {
        BuildCache { dir: dir.into() }
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the previous run. Any missing or unparsable file degrades to
    /// [`BuildState::Cold`]; a damaged cache is never an error.
    #[must_use]
    pub fn load(&self) -> BuildState {
        let generated = match self.read_json::<GeneratedSet>(GENERATED_SET_FILENAME) {
            Some(generated) => generated,
            None => return BuildState::Cold,
        };
        let references = match self.read_json::<ReferenceMap>(REFERENCES_FILENAME) {
            Some(references) => references,
            None => return BuildState::Cold,
        };
        debug!(generated = generated.len(), "loaded warm cache");
        BuildState::Warm(CacheSnapshot {
            generated,
            references,
        })
    }

    /// Record this run. Runs after stale outputs are deleted, so a crash
    /// between delete and persist leaves a cache that forces a cold rebuild
    /// at worst.
    ///
    /// # Errors
    /// Returns an error when the cache directory or files cannot be written.
    pub fn persist(&self, generated: &GeneratedSet, references: &ReferenceMap) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let set_text = serde_json::to_string_pretty(generated)?;
        fs::write(self.dir.join(GENERATED_SET_FILENAME), set_text)?;
        let references_text = serde_json::to_string_pretty(references)?;
        fs::write(self.dir.join(REFERENCES_FILENAME), references_text)?;
        Ok(())
    }

    /// Drop the cache so the next run starts cold.
    ///
    /// # Errors
    /// Returns an error when an existing cache file cannot be removed.
    pub fn clear(&self) -> Result<()> {
        for filename in [GENERATED_SET_FILENAME, REFERENCES_FILENAME] {
            let path = self.dir.join(filename);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, filename: &str) -> Option<T> {
        let path = self.dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) => {
                debug!(path = %path.display(), %error, "no cache file, building cold");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(path = %path.display(), %error, "damaged cache file, building cold");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::MemberRefs;
    use pretty_assertions::assert_eq;

    fn set(paths: &[&str]) -> GeneratedSet {
        paths.iter().map(|path| (*path).to_string()).collect()
    }

    #[test]
    fn test_diffing() {
        let previous = set(&["uikit/uiview.js", "uikit/uilabel.js"]);
        let current = set(&["uikit/uiview.js", "uikit/uibutton.js"]);
        assert_eq!(previous.to_add(&current), vec!["uikit/uibutton.js"]);
        assert_eq!(previous.to_remove(&current), vec!["uikit/uilabel.js"]);
    }

    #[test]
    fn test_missing_cache_is_cold() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::new(dir.path().join("cache"));
        assert_eq!(cache.load(), BuildState::Cold);
    }

    #[test]
    fn test_round_trip_is_warm() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::new(dir.path());

        let generated = set(&["uikit/uiview.js"]);
        let mut references = ReferenceMap::new();
        references
            .entry("app.js")
            .require_type("UIView")
            .reference_member("frame", MemberRefs::GETTER);
        cache.persist(&generated, &references).unwrap();

        match cache.load() {
            BuildState::Warm(snapshot) => {
                assert_eq!(snapshot.generated, generated);
                assert_eq!(snapshot.references, references);
            }
            BuildState::Cold => panic!("expected a warm cache"),
        }
    }

    #[test]
    fn test_damaged_file_is_cold() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::new(dir.path());
        cache
            .persist(&set(&["uikit/uiview.js"]), &ReferenceMap::new())
            .unwrap();
        std::fs::write(dir.path().join(GENERATED_SET_FILENAME), "{ not json").unwrap();
        assert_eq!(cache.load(), BuildState::Cold);
    }

    #[test]
    fn test_clear_forces_cold() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::new(dir.path());
        cache.persist(&GeneratedSet::new(), &ReferenceMap::new()).unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.load(), BuildState::Cold);
    }
}
