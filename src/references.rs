//! Reference tracking: which types and members application sources use.
//!
//! An external scanner parses the application sources and reports, per file,
//! the type names it requires and the members it touches. The generator prunes
//! everything those tables do not mention, so a wrapper only carries the
//! methods and accessors some source file can actually reach.
//!
//! Member tables are keyed by bare member name, not by owning type; the
//! scanner cannot know receiver types, so a reference to `frame` keeps the
//! `frame` accessor on every generated class.

use std::collections::HashSet;

use bitflags::bitflags;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

bitflags! {
    /// How a member was referenced.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MemberRefs: u8 {
        /// Read as a property or called with no arguments
        const GETTER = 1;
        /// Assigned as a property
        const SETTER = 1 << 1;
        /// Called as a method or free function
        const FUNCTION = 1 << 2;
    }
}

/// Everything one source file references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReferences {
    /// Type names the file requires, in first-seen order
    #[serde(default)]
    pub used_types: IndexSet<String>,
    /// Member references keyed by bare member name
    #[serde(default)]
    pub members: IndexMap<String, MemberRefs>,
}

impl SourceReferences {
    /// Record a required type.
    pub fn require_type(&mut self, name: impl Into<String>) -> &mut SourceReferences {
        self.used_types.insert(name.into());
        self
    }

    /// Record a member reference of the given kinds.
    pub fn reference_member(
        &mut self,
        name: impl Into<String>,
        kinds: MemberRefs,
    ) -> &mut SourceReferences {
        let entry = self.members.entry(name.into()).or_default();
        *entry |= kinds;
        self
    }

    /// `true` when the file references nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_types.is_empty() && self.members.is_empty()
    }
}

/// References for the whole application, keyed by source path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceMap {
    sources: IndexMap<String, SourceReferences>,
}

impl ReferenceMap {
    /// An empty reference map.
    #[must_use]
    pub fn new() -> ReferenceMap {
        ReferenceMap::default()
    }

    /// References recorded for one source path, created on first access.
    pub fn entry(&mut self, path: impl Into<String>) -> &mut SourceReferences {
        self.sources.entry(path.into()).or_default()
    }

    /// References for one source path, if any were recorded.
    #[must_use]
    pub fn source(&self, path: &str) -> Option<&SourceReferences> {
        self.sources.get(path)
    }

    /// Iterate over `(path, references)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceReferences)> {
        self.sources
            .iter()
            .map(|(path, references)| (path.as_str(), references))
    }

    /// Number of source files with recorded references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// `true` when no source file has recorded references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Every required type across all sources, deduplicated, in first-seen
    /// order. This is the seed set for dependency resolution.
    #[must_use]
    pub fn used_types(&self) -> IndexSet<String> {
        let mut used = IndexSet::new();
        for references in self.sources.values() {
            used.extend(references.used_types.iter().cloned());
        }
        used
    }

    /// Merge all per-file member tables into one queryable view.
    #[must_use]
    pub fn member_tables(&self) -> MemberTables {
        let mut tables = MemberTables {
            allow_all: self.sources.is_empty(),
            ..MemberTables::default()
        };
        for references in self.sources.values() {
            for (name, kinds) in &references.members {
                if kinds.contains(MemberRefs::GETTER) {
                    tables.getters.insert(name.clone());
                }
                if kinds.contains(MemberRefs::SETTER) {
                    tables.setters.insert(name.clone());
                }
                if kinds.contains(MemberRefs::FUNCTION) {
                    tables.functions.insert(name.clone());
                }
            }
        }
        tables
    }
}

/// Merged member-reference tables the generator prunes against.
///
/// With no recorded references at all, every query answers `true`; an empty
/// scan means "generate everything", not "generate nothing".
#[derive(Debug, Clone, Default)]
pub struct MemberTables {
    allow_all: bool,
    getters: HashSet<String>,
    setters: HashSet<String>,
    functions: HashSet<String>,
}

impl MemberTables {
    /// Tables that keep every member, for callers that skip scanning.
    #[must_use]
    pub fn allow_all() -> MemberTables {
        MemberTables {
            allow_all: true,
            ..MemberTables::default()
        }
    }

    /// `true` when a getter for `name` should be kept.
    #[must_use]
    pub fn is_getter_referenced(&self, name: &str) -> bool {
        self.allow_all || self.getters.contains(name)
    }

    /// `true` when a setter for `name` should be kept.
    #[must_use]
    pub fn is_setter_referenced(&self, name: &str) -> bool {
        self.allow_all || self.setters.contains(name)
    }

    /// `true` when a method or function wrapper for `name` should be kept. A
    /// getter reference counts; zero-argument calls and property reads are
    /// indistinguishable to the scanner.
    #[must_use]
    pub fn is_function_referenced(&self, name: &str) -> bool {
        self.allow_all || self.functions.contains(name) || self.getters.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_kinds_accumulate() {
        let mut references = SourceReferences::default();
        references.reference_member("frame", MemberRefs::GETTER);
        references.reference_member("frame", MemberRefs::SETTER);
        assert_eq!(
            references.members["frame"],
            MemberRefs::GETTER | MemberRefs::SETTER
        );
    }

    #[test]
    fn test_used_types_deduplicated_in_order() {
        let mut map = ReferenceMap::new();
        map.entry("a.js").require_type("UIView").require_type("UILabel");
        map.entry("b.js").require_type("UIView").require_type("UIButton");
        let used_types = map.used_types();
        let used: Vec<&str> = used_types.iter().map(String::as_str).collect();
        assert_eq!(used, vec!["UIView", "UILabel", "UIButton"]);
    }

    #[test]
    fn test_member_tables_merge_and_query() {
        let mut map = ReferenceMap::new();
        map.entry("a.js")
            .reference_member("frame", MemberRefs::GETTER);
        map.entry("b.js")
            .reference_member("setNeedsDisplay", MemberRefs::FUNCTION);

        let tables = map.member_tables();
        assert!(tables.is_getter_referenced("frame"));
        assert!(!tables.is_setter_referenced("frame"));
        // getter references satisfy function queries
        assert!(tables.is_function_referenced("frame"));
        assert!(tables.is_function_referenced("setNeedsDisplay"));
        assert!(!tables.is_function_referenced("removeFromSuperview"));
    }

    #[test]
    fn test_empty_map_allows_everything() {
        let tables = ReferenceMap::new().member_tables();
        assert!(tables.is_getter_referenced("anything"));
        assert!(tables.is_setter_referenced("anything"));
        assert!(tables.is_function_referenced("anything"));
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut map = ReferenceMap::new();
        map.entry("app.js")
            .require_type("UIView")
            .reference_member("frame", MemberRefs::GETTER | MemberRefs::SETTER);

        let text = serde_json::to_string(&map).unwrap();
        let restored: ReferenceMap = serde_json::from_str(&text).unwrap();
        assert_eq!(
            restored.source("app.js").unwrap().members["frame"],
            MemberRefs::GETTER | MemberRefs::SETTER
        );
    }
}
