//! Wrapper source generation.
//!
//! Turns a resolved dependency closure into scripting-runtime source files:
//! one per class, one per struct, one module per framework carrying free
//! functions, constants, enum values and block wrappers, plus the bootstrap
//! redirect table.
//!
//! # Architecture
//!
//! Generation runs in phases over one [`GenerationContext`]:
//!
//! 1. every class in the closure is rendered ([`class`]), registering the
//!    block signatures its members need,
//! 2. empty class wrappers nothing requires are pruned ([`prune`]),
//! 3. structs are rendered ([`structs`]),
//! 4. module files are rendered ([`module`]), emitting the registered block
//!    wrappers ([`block`], [`marshal`]),
//! 5. a module named like one of its classes is appended to that class file,
//! 6. the bootstrap redirect table is rebuilt from the full set
//!    ([`bootstrap`]).
//!
//! Output is deterministic: the same metabase, references and closure produce
//! byte-identical sources in the same order.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use bridgegen::codegen::CodeGenerator;
//! use bridgegen::metabase::Metabase;
//! use bridgegen::references::ReferenceMap;
//! use bridgegen::resolver::DependencyResolver;
//!
//! # fn main() -> bridgegen::Result<()> {
//! let metabase = Metabase::from_file(Path::new("metabase.json"))?;
//! let references = ReferenceMap::new();
//! let seeds = references.used_types();
//! let closure = DependencyResolver::new(&metabase).resolve(&seeds)?;
//!
//! let generator = CodeGenerator::new(&metabase, references.member_tables());
//! let bundle = generator.generate(&closure, &seeds)?;
//! for source in &bundle.sources {
//!     println!("{} -> {}", source.name, source.path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod bootstrap;
pub mod class;
pub mod context;
pub mod marshal;
pub mod module;
pub mod prune;
pub mod structs;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument};

pub use bootstrap::{Bootstrap, BOOTSTRAP_FILENAME};
pub use class::ClassUnit;
pub use context::{require_path, source_path, GenerationContext, ImportSet};
pub use module::ModuleUnit;
pub use structs::StructUnit;

use crate::{
    codegen::class::is_block_slot,
    metabase::{EnumMetadata, FunctionMetadata, Metabase, VarMetadata},
    references::MemberTables,
    resolver::ResolvedClosure,
    Result,
};

/// What kind of wrapper a generated source carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A class wrapper, possibly with a merged module fragment
    Class,
    /// A struct wrapper
    Struct,
    /// A standalone module wrapper
    Module,
}

/// One generated source file.
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    /// Type or module name
    pub name: String,
    /// Owning framework
    pub framework: String,
    /// Output path relative to the bundle root
    pub path: String,
    /// File contents
    pub contents: String,
    /// Wrapper kind
    pub kind: SourceKind,
}

/// Everything one generation run produces.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBundle {
    /// Generated sources in emission order
    pub sources: Vec<GeneratedSource>,
    /// Rendered bootstrap script
    pub bootstrap: String,
}

impl GeneratedBundle {
    /// Relative paths of every generated source, in emission order. The
    /// build cache diffs these across runs.
    #[must_use]
    pub fn paths(&self) -> IndexSet<String> {
        self.sources
            .iter()
            .map(|source| source.path.clone())
            .collect()
    }

    /// The generated source at `path`, if the bundle has one.
    #[must_use]
    pub fn source(&self, path: &str) -> Option<&GeneratedSource> {
        self.sources.iter().find(|source| source.path == path)
    }
}

/// Generates wrapper sources from a metabase and a resolved closure.
pub struct CodeGenerator<'a> {
    metabase: &'a Metabase,
    tables: MemberTables,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator pruning against `tables`.
    #[must_use]
    pub fn new(metabase: &'a Metabase, tables: MemberTables) -> CodeGenerator<'a> {
        CodeGenerator { metabase, tables }
    }

    /// Generate the full bundle for `closure`. `seeds` are the explicitly
    /// required type names; their classes survive pruning even when empty.
    ///
    /// # Errors
    /// Propagates decoder errors and unresolved block signatures.
    #[instrument(skip_all, fields(types = closure.types.len()))]
    pub fn generate(
        &self,
        closure: &ResolvedClosure,
        seeds: &IndexSet<String>,
    ) -> Result<GeneratedBundle> {
        let mut context = GenerationContext::new(self.metabase, self.tables.clone());

        let mut class_units: IndexMap<String, ClassUnit> = IndexMap::new();
        let mut struct_names: Vec<&str> = Vec::new();
        let mut module_functions: IndexMap<String, Vec<&FunctionMetadata>> = IndexMap::new();
        let mut module_vars: IndexMap<String, Vec<&VarMetadata>> = IndexMap::new();
        let mut module_enums: IndexMap<String, Vec<&EnumMetadata>> = IndexMap::new();

        for name in &closure.types {
            if let Some(class) = self.metabase.class(name) {
                let unit = class::generate_class(&mut context, class)
                    .map_err(|error| error.in_type(&class.name, &class.filename))?;
                class_units.insert(unit.name.clone(), unit);
            } else if self.metabase.strukt(name).is_some() {
                struct_names.push(name);
            } else if let Some(function) = self.metabase.function(name) {
                module_functions
                    .entry(function.framework.clone())
                    .or_default()
                    .push(function);
            } else if let Some(var) = self.metabase.var(name) {
                module_vars
                    .entry(var.framework.clone())
                    .or_default()
                    .push(var);
            } else if let Some(enumeration) = self.metabase.enumeration(name) {
                module_enums
                    .entry(enumeration.framework.clone())
                    .or_default()
                    .push(enumeration);
            }
            // protocols and typedefs contribute members and spellings but no
            // files of their own
        }

        let mut keep: IndexSet<String> = seeds.clone();
        keep.extend(closure.seeded.iter().cloned());
        let class_units = prune::prune_classes(class_units, &keep);

        // register function block arguments up front so a wrapper owned by
        // another module exists before that module renders
        for (framework, functions) in &module_functions {
            for function in functions {
                if function.name.starts_with("__")
                    || !context.tables.is_function_referenced(&function.name)
                {
                    continue;
                }
                for argument in &function.arguments {
                    if is_block_slot(argument) {
                        context.require_block(framework, &argument.value)?;
                    }
                }
            }
        }

        let mut struct_units: Vec<StructUnit> = Vec::with_capacity(struct_names.len());
        for name in struct_names {
            if let Some(strukt) = self.metabase.strukt(name) {
                struct_units.push(
                    structs::generate_struct(&context, strukt)
                        .map_err(|error| error.in_type(&strukt.name, &strukt.filename))?,
                );
            }
        }

        let mut module_frameworks: IndexSet<String> = IndexSet::new();
        module_frameworks.extend(module_functions.keys().cloned());
        module_frameworks.extend(module_vars.keys().cloned());
        module_frameworks.extend(module_enums.keys().cloned());
        module_frameworks.extend(context.modules_with_blocks().map(str::to_string));

        let mut module_units: Vec<ModuleUnit> = Vec::with_capacity(module_frameworks.len());
        for framework in &module_frameworks {
            let functions = module_functions.get(framework).cloned().unwrap_or_default();
            let vars = module_vars.get(framework).cloned().unwrap_or_default();
            let enums = module_enums.get(framework).cloned().unwrap_or_default();
            let unit =
                module::generate_module(&mut context, framework, &functions, &vars, &enums)?;
            if !unit.is_empty() {
                module_units.push(unit);
            }
        }

        let mut bundle = GeneratedBundle::default();
        let mut bootstrap = Bootstrap::new();

        // modules merge into a same-named class file instead of standing alone
        let mut merged: IndexMap<&str, &ModuleUnit> = IndexMap::new();
        for unit in &module_units {
            if class_units.contains_key(&unit.name) {
                merged.insert(unit.name.as_str(), unit);
            }
        }

        for (name, unit) in &class_units {
            let mut contents = unit.contents.clone();
            if let Some(module_unit) = merged.get(name.as_str()) {
                contents.push_str(&module_unit.merged_contents());
            }
            bootstrap.add_type(&unit.framework, name);
            bundle.sources.push(GeneratedSource {
                name: name.clone(),
                framework: unit.framework.clone(),
                path: source_path(&unit.framework, name),
                contents,
                kind: SourceKind::Class,
            });
        }

        for unit in &struct_units {
            bootstrap.add_type(&unit.framework, &unit.name);
            bundle.sources.push(GeneratedSource {
                name: unit.name.clone(),
                framework: unit.framework.clone(),
                path: source_path(&unit.framework, &unit.name),
                contents: unit.contents.clone(),
                kind: SourceKind::Struct,
            });
        }

        for unit in &module_units {
            bootstrap.add_module(&unit.framework);
            if merged.contains_key(unit.name.as_str()) {
                continue;
            }
            bundle.sources.push(GeneratedSource {
                name: unit.name.clone(),
                framework: unit.framework.clone(),
                path: source_path(&unit.framework, &unit.name),
                contents: unit.standalone_contents(),
                kind: SourceKind::Module,
            });
        }

        for wildcard in &closure.wildcards {
            bootstrap.add_wildcard(wildcard);
        }

        bundle.bootstrap = bootstrap.render();
        debug!(
            sources = bundle.sources.len(),
            redirects = bootstrap.len(),
            "generated bundle"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceMap;
    use crate::resolver::DependencyResolver;

    fn metabase() -> Metabase {
        Metabase::from_json(
            r#"{
                "classes": {
                    "UIResponder": { "name": "UIResponder", "framework": "UIKit" },
                    "UIView": { "name": "UIView", "framework": "UIKit", "superclass": "UIResponder",
                        "methods": { "addSubview": { "name": "addSubview", "selector": "addSubview:", "instance": true } } }
                },
                "structs": {
                    "CGPoint": { "name": "CGPoint", "framework": "CoreGraphics",
                        "fields": [ { "name": "x", "encoding": "d" }, { "name": "y", "encoding": "d" } ] }
                },
                "functions": {
                    "CGPointMake": { "name": "CGPointMake", "framework": "CoreGraphics",
                        "arguments": [ { "name": "x" }, { "name": "y" } ],
                        "returns": { "type": "struct", "value": "CGPoint", "encoding": "{CGPoint=dd}" } }
                }
            }"#,
        )
        .unwrap()
    }

    fn generate(seeds: &[&str]) -> GeneratedBundle {
        let metabase = metabase();
        let seeds: IndexSet<String> = seeds.iter().map(|seed| (*seed).to_string()).collect();
        let closure = DependencyResolver::new(&metabase).resolve(&seeds).unwrap();
        CodeGenerator::new(&metabase, ReferenceMap::new().member_tables())
            .generate(&closure, &seeds)
            .unwrap()
    }

    #[test]
    fn test_bundle_covers_the_closure() {
        let bundle = generate(&["UIView", "CGPointMake"]);
        let paths = bundle.paths();
        assert!(paths.contains("uikit/uiview.js"));
        assert!(paths.contains("uikit/uiresponder.js"));
        assert!(paths.contains("coregraphics/cgpoint.js"));
        assert!(paths.contains("coregraphics/coregraphics.js"));
    }

    #[test]
    fn test_bootstrap_lists_everything() {
        let bundle = generate(&["UIView", "CGPointMake"]);
        assert!(bundle
            .bootstrap
            .contains("binding.redirect('UIKit/UIView', '/bridge/uikit/uiview');"));
        assert!(bundle.bootstrap.contains(
            "binding.redirect('CoreGraphics', '/bridge/coregraphics/coregraphics');"
        ));
        assert!(bundle
            .bootstrap
            .contains("binding.redirect('CoreGraphics/CGPoint', '/bridge/coregraphics/cgpoint');"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let first = generate(&["UIView", "CGPointMake"]);
        let second = generate(&["UIView", "CGPointMake"]);
        assert_eq!(first.paths(), second.paths());
        assert_eq!(first.bootstrap, second.bootstrap);
        for (a, b) in first.sources.iter().zip(second.sources.iter()) {
            assert_eq!(a.contents, b.contents);
        }
    }

    #[test]
    fn test_module_kind_and_lookup() {
        let bundle = generate(&["CGPointMake"]);
        let module = bundle.source("coregraphics/coregraphics.js").unwrap();
        assert_eq!(module.kind, SourceKind::Module);
        assert!(module.contents.contains("exports.CGPointMake"));
    }
}
