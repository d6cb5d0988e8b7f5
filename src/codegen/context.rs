//! Shared state threaded through wrapper generation.
//!
//! Generation is explicit about its context: one [`GenerationContext`] holds
//! the metabase, the merged member-reference tables, and the registry of
//! block signatures the generated classes actually use. Class and struct
//! builders receive it by reference; nothing reaches for ambient state.

use indexmap::IndexMap;

use crate::{
    metabase::{BlockMetadata, Metabase},
    references::MemberTables,
    Result,
};

/// Context for one generation run.
pub struct GenerationContext<'a> {
    /// The metabase being generated from
    pub metabase: &'a Metabase,
    /// Merged member-reference tables used for pruning
    pub tables: MemberTables,
    /// Blocks referenced by generated members, keyed by owning module then
    /// signature. Each one gets a wrapper in its module file.
    used_blocks: IndexMap<String, IndexMap<String, BlockMetadata>>,
}

impl<'a> GenerationContext<'a> {
    /// Create a context over `metabase` pruning against `tables`.
    #[must_use]
    pub fn new(metabase: &'a Metabase, tables: MemberTables) -> GenerationContext<'a> {
        GenerationContext {
            metabase,
            tables,
            used_blocks: IndexMap::new(),
        }
    }

    /// Resolve a block signature and register it for wrapper emission,
    /// returning the wrapper symbol and the module that will carry it.
    ///
    /// # Errors
    /// Returns [`crate::Error::BlockNotFound`] when no module has a matching
    /// descriptor.
    pub fn require_block(&mut self, framework: &str, signature: &str) -> Result<BlockBinding> {
        let block = self.metabase.find_block(signature, framework)?.clone();
        let module = block
            .framework
            .clone()
            .unwrap_or_else(|| framework.to_string());
        let symbol = block_symbol(&block.signature);
        self.used_blocks
            .entry(module.clone())
            .or_default()
            .entry(block.signature.clone())
            .or_insert(block);
        Ok(BlockBinding { module, symbol })
    }

    /// Blocks registered for a module, in first-use order.
    #[must_use]
    pub fn blocks_for(&self, module: &str) -> Option<&IndexMap<String, BlockMetadata>> {
        self.used_blocks.get(module)
    }

    /// Modules that need block wrappers emitted.
    pub fn modules_with_blocks(&self) -> impl Iterator<Item = &str> {
        self.used_blocks.keys().map(String::as_str)
    }
}

/// Where a registered block wrapper lives and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBinding {
    /// Module file that carries the wrapper
    pub module: String,
    /// Exported wrapper symbol
    pub symbol: String,
}

/// Wrapper symbol for a block signature: every run maps the same signature
/// to the same symbol.
#[must_use]
pub fn block_symbol(signature: &str) -> String {
    format!("Block_{}", safe_symbol(signature))
}

/// Turn arbitrary text into a valid identifier fragment.
#[must_use]
pub fn safe_symbol(text: &str) -> String {
    text.chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect()
}

/// Relative output path for a generated type: `framework/name`, lower-cased.
#[must_use]
pub fn source_path(framework: &str, name: &str) -> String {
    format!(
        "{}/{}.js",
        framework.to_lowercase(),
        name.to_lowercase()
    )
}

/// Require path the scripting runtime resolves at startup.
#[must_use]
pub fn require_path(framework: &str, name: &str) -> String {
    format!(
        "/bridge/{}/{}",
        framework.to_lowercase(),
        name.to_lowercase()
    )
}

/// Classes a generated source mentions, for import reintegration after the
/// unused-class prune.
#[derive(Debug, Clone, Default)]
pub struct ImportSet {
    imports: IndexMap<String, String>,
}

impl ImportSet {
    /// Record that the source mentions `name` from `framework`.
    pub fn add(&mut self, name: impl Into<String>, framework: impl Into<String>) {
        self.imports.entry(name.into()).or_insert(framework.into());
    }

    /// Iterate `(name, framework)` pairs in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports
            .iter()
            .map(|(name, framework)| (name.as_str(), framework.as_str()))
    }

    /// `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}
