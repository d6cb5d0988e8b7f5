//! The build pipeline: references in, wrapper bundle on disk out.
//!
//! One run flattens protocol inheritance, expands the used-type seeds into
//! their dependency closure, generates the bundle, and reconciles it with the
//! output directory. With a warm cache only the difference against the
//! previous run touches disk; if the recorded references differ from the
//! current ones every source is rewritten, so an incremental run always
//! leaves the same bytes a cold run would. The bootstrap is rewritten every
//! run either way.
//!
//! Stale outputs are deleted before the new cache is persisted. A crash in
//! between leaves a cache describing files that no longer exist, which the
//! next run resolves by rebuilding those files, never by trusting them.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::{
    cache::{BuildCache, BuildState, GeneratedSet},
    codegen::{CodeGenerator, GeneratedBundle, GeneratedSource, BOOTSTRAP_FILENAME},
    metabase::Metabase,
    references::ReferenceMap,
    resolver::{protocols::flatten_protocol_inheritance, DependencyResolver},
    Result,
};

/// What one pipeline run did.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Relative paths written this run
    pub written: Vec<String>,
    /// Relative paths deleted this run
    pub removed: Vec<String>,
    /// Total sources in the generated bundle
    pub total: usize,
    /// `true` when the run could not use the cache
    pub cold: bool,
}

/// Drives a full or incremental build into an output directory.
pub struct BuildPipeline {
    metabase: Metabase,
    references: ReferenceMap,
    output_dir: PathBuf,
    cache: BuildCache,
    extra_seeds: IndexSet<String>,
    flattened: bool,
}

impl BuildPipeline {
    /// Create a pipeline writing into `output_dir`. The cache lives in a
    /// sibling directory named after the output directory with a `.cache`
    /// suffix.
    #[must_use]
    pub fn new(metabase: Metabase, references: ReferenceMap, output_dir: &Path) -> BuildPipeline {
        let mut cache_dir = output_dir.as_os_str().to_os_string();
        cache_dir.push(".cache");
        BuildPipeline {
            metabase,
            references,
            output_dir: output_dir.to_path_buf(),
            cache: BuildCache::new(PathBuf::from(cache_dir)),
            extra_seeds: IndexSet::new(),
            flattened: false,
        }
    }

    /// Put the cache somewhere other than the default sibling directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> BuildPipeline {
        self.cache = BuildCache::new(dir);
        self
    }

    /// Seed the build with a type no source file references. Its wrapper is
    /// generated and kept even when empty.
    pub fn require_type(&mut self, name: impl Into<String>) -> &mut BuildPipeline {
        self.extra_seeds.insert(name.into());
        self
    }

    /// Mark a scripting-side class so the resolver treats references to it
    /// as already satisfied.
    pub fn register_custom_class(&mut self, name: impl Into<String>) -> &mut BuildPipeline {
        self.metabase.register_custom_class(name);
        self
    }

    /// Run the build.
    ///
    /// # Errors
    /// Propagates resolution and generation errors, and I/O errors touching
    /// the output directory or the cache.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<BuildReport> {
        if !self.flattened {
            flatten_protocol_inheritance(&mut self.metabase);
            self.flattened = true;
        }

        let mut seeds = self.references.used_types();
        seeds.extend(self.extra_seeds.iter().cloned());

        let closure = DependencyResolver::new(&self.metabase).resolve(&seeds)?;
        let generator = CodeGenerator::new(&self.metabase, self.references.member_tables());
        let bundle = generator.generate(&closure, &seeds)?;
        let current = GeneratedSet::from_paths(bundle.paths());

        let mut report = BuildReport {
            total: bundle.sources.len(),
            ..BuildReport::default()
        };

        match self.cache.load() {
            BuildState::Cold => {
                report.cold = true;
                self.build_cold(&bundle, &mut report)?;
            }
            BuildState::Warm(snapshot) => {
                self.build_warm(&bundle, &current, &snapshot, &mut report)?;
            }
        }

        fs::write(self.output_dir.join(BOOTSTRAP_FILENAME), &bundle.bootstrap)?;
        self.cache.persist(&current, &self.references)?;

        info!(
            written = report.written.len(),
            removed = report.removed.len(),
            total = report.total,
            cold = report.cold,
            "build finished"
        );
        Ok(report)
    }

    fn build_cold(&self, bundle: &GeneratedBundle, report: &mut BuildReport) -> Result<()> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)?;
        self.write_sources(&bundle.sources)?;
        report.written = bundle
            .sources
            .iter()
            .map(|source| source.path.clone())
            .collect();
        Ok(())
    }

    fn build_warm(
        &self,
        bundle: &GeneratedBundle,
        current: &GeneratedSet,
        snapshot: &crate::cache::CacheSnapshot,
        report: &mut BuildReport,
    ) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;

        let stale = snapshot.generated.to_remove(current);
        stale
            .par_iter()
            .try_for_each(|path| self.remove_source(path))?;
        report.removed = stale.iter().map(|path| (*path).to_string()).collect();

        // changed references can change the body of every retained wrapper
        let references_changed = snapshot.references != self.references;
        let to_write: Vec<&GeneratedSource> = if references_changed {
            bundle.sources.iter().collect()
        } else {
            let additions: IndexSet<&str> =
                snapshot.generated.to_add(current).into_iter().collect();
            bundle
                .sources
                .iter()
                .filter(|source| additions.contains(source.path.as_str()))
                .collect()
        };

        self.write_source_refs(&to_write)?;
        report.written = to_write
            .iter()
            .map(|source| source.path.clone())
            .collect();
        Ok(())
    }

    fn write_sources(&self, sources: &[GeneratedSource]) -> Result<()> {
        sources
            .par_iter()
            .try_for_each(|source| self.write_source(source))
    }

    fn write_source_refs(&self, sources: &[&GeneratedSource]) -> Result<()> {
        sources
            .par_iter()
            .try_for_each(|source| self.write_source(source))
    }

    fn write_source(&self, source: &GeneratedSource) -> Result<()> {
        let path = self.output_dir.join(&source.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &source.contents)?;
        Ok(())
    }

    fn remove_source(&self, path: &str) -> Result<()> {
        let path = self.output_dir.join(path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // already gone is the state we wanted
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metabase() -> Metabase {
        Metabase::from_json(
            r#"{
                "classes": {
                    "UIView": { "name": "UIView", "framework": "UIKit",
                        "methods": { "addSubview": { "name": "addSubview", "selector": "addSubview:", "instance": true } } },
                    "UILabel": { "name": "UILabel", "framework": "UIKit", "superclass": "UIView" }
                }
            }"#,
        )
        .unwrap()
    }

    fn references(types: &[&str]) -> ReferenceMap {
        let mut map = ReferenceMap::new();
        let entry = map.entry("app.js");
        for name in types {
            entry.require_type(*name);
        }
        map
    }

    #[test]
    fn test_cold_build_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut pipeline = BuildPipeline::new(metabase(), references(&["UILabel"]), &out);
        let report = pipeline.run().unwrap();

        assert!(report.cold);
        assert_eq!(report.written.len(), report.total);
        assert!(out.join("uikit/uilabel.js").exists());
        assert!(out.join("uikit/uiview.js").exists());
        assert!(out.join(BOOTSTRAP_FILENAME).exists());
    }

    #[test]
    fn test_unchanged_rerun_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
            .run()
            .unwrap();

        let report = BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
            .run()
            .unwrap();
        assert!(!report.cold);
        assert!(report.written.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_removed_reference_deletes_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
            .run()
            .unwrap();

        let report = BuildPipeline::new(metabase(), references(&["UIView"]), &out)
            .run()
            .unwrap();
        assert!(report.removed.contains(&"uikit/uilabel.js".to_string()));
        assert!(!out.join("uikit/uilabel.js").exists());
        assert!(out.join("uikit/uiview.js").exists());
    }

    #[test]
    fn test_damaged_cache_falls_back_to_cold() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cache_dir = dir.path().join("cache");
        BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
            .with_cache_dir(&cache_dir)
            .run()
            .unwrap();
        std::fs::write(cache_dir.join(crate::cache::GENERATED_SET_FILENAME), "??").unwrap();

        let report = BuildPipeline::new(metabase(), references(&["UILabel"]), &out)
            .with_cache_dir(&cache_dir)
            .run()
            .unwrap();
        assert!(report.cold);
        assert_eq!(report.written.len(), report.total);
    }
}
