//! Dependency-closure resolution.
//!
//! The application scanner reports which type names the sources use; the
//! generator must also emit everything those types drag in. This module
//! expands a seed set into its full transitive closure: superclass chains,
//! declared protocols, every class, struct and protocol referenced from
//! method and property types, block signatures (transitively through block
//! arguments), and typedef chains.
//!
//! # Architecture
//!
//! Expansion is a breadth-first fixpoint over a work queue with a visited
//! set. Output order is insertion order, so two runs over the same metabase
//! produce byte-identical generated sets.
//!
//! Seeds get two conveniences full names do not:
//!
//! - `pkg.*` wildcards expand to every class directly under the package
//!   ([`wildcard`]),
//! - an unknown dotted name retries once with the last `.` replaced by `$`,
//!   the spelling nested classes use in the metabase.
//!
//! A seed that still fails to resolve produces phonetic "did you mean"
//! suggestions ([`suggest`]); with suggestions it is logged and skipped,
//! without them the run fails.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bridgegen::{metabase::Metabase, resolver::DependencyResolver};
//! use indexmap::IndexSet;
//!
//! let metabase = Metabase::from_json("{}")?;
//! let mut seeds = IndexSet::new();
//! seeds.insert("UIView".to_string());
//!
//! let closure = DependencyResolver::new(&metabase).resolve(&seeds)?;
//! assert!(closure.types.contains("UIView"));
//! # Ok::<(), bridgegen::Error>(())
//! ```

pub mod protocols;
pub mod suggest;
pub mod wildcard;

use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;
use tracing::{trace, warn};

use crate::{
    encoding::{TypeDescriptor, TypeKind},
    metabase::{BlockMetadata, EncodedValue, Metabase},
    Result,
};

/// The result of closure expansion.
#[derive(Debug, Clone, Default)]
pub struct ResolvedClosure {
    /// Every type to generate, in deterministic insertion order
    pub types: IndexSet<String>,
    /// Wildcard seeds that matched at least one class; the bootstrap emits a
    /// package stub for each
    pub wildcards: Vec<String>,
    /// Seed names after wildcard expansion and nested-class fallback. These
    /// were asked for by name and survive the unused-class prune even when
    /// their wrappers are empty.
    pub seeded: IndexSet<String>,
}

/// Expands used-type seeds into their transitive dependency closure.
pub struct DependencyResolver<'a> {
    metabase: &'a Metabase,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over `metabase`.
    #[must_use]
    pub fn new(metabase: &'a Metabase) -> DependencyResolver<'a> {
        DependencyResolver { metabase }
    }

    /// Expand `seeds` to the full closure.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] for a seed that resolves
    /// to nothing and has no phonetically close known name. Decoder errors
    /// for damaged encodings reached during expansion are wrapped with the
    /// owning type name and header ([`crate::Error::TypeDecode`]).
    pub fn resolve(&self, seeds: &IndexSet<String>) -> Result<ResolvedClosure> {
        let mut closure = ResolvedClosure::default();
        let mut queue: VecDeque<String> = VecDeque::new();

        for seed in seeds {
            if wildcard::is_wildcard(seed) {
                let matches = wildcard::expand(self.metabase, seed)?;
                if matches.is_empty() {
                    warn!(pattern = %seed, "wildcard requirement matched no classes");
                } else {
                    closure.wildcards.push(seed.clone());
                    closure.seeded.extend(matches.iter().cloned());
                    queue.extend(matches);
                }
                continue;
            }
            if self.is_known(seed) {
                closure.seeded.insert(seed.clone());
                queue.push_back(seed.clone());
                continue;
            }
            // nested classes are stored with `$`; retry the dotted spelling once
            if let Some(nested) = nested_spelling(seed) {
                if self.is_known(&nested) {
                    trace!(seed = %seed, nested = %nested, "resolved via nested-class spelling");
                    closure.seeded.insert(nested.clone());
                    queue.push_back(nested);
                    continue;
                }
            }
            let suggestions = suggest::suggestions(seed, self.metabase.known_type_names());
            if suggestions.is_empty() {
                return Err(crate::Error::UnresolvedReference {
                    name: seed.clone(),
                    suggestions,
                });
            }
            warn!(
                name = %seed,
                suggestions = %suggestions.join(", "),
                "could not resolve used type, skipping"
            );
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut visited_blocks: HashSet<String> = HashSet::new();
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            self.visit(&name, &mut closure.types, &mut queue, &mut visited_blocks)?;
        }
        Ok(closure)
    }

    fn is_known(&self, name: &str) -> bool {
        self.metabase.is_custom_class(name)
            || self.metabase.class(name).is_some()
            || self.metabase.protocol(name).is_some()
            || self.metabase.strukt(name).is_some()
            || self.metabase.enumeration(name).is_some()
            || self.metabase.function(name).is_some()
            || self.metabase.var(name).is_some()
            || self.metabase.type_alias(name).is_some()
    }

    fn visit(
        &self,
        name: &str,
        types: &mut IndexSet<String>,
        queue: &mut VecDeque<String>,
        visited_blocks: &mut HashSet<String>,
    ) -> Result<()> {
        // script-defined classes satisfy references but generate nothing
        if self.metabase.is_custom_class(name) {
            types.insert(name.to_string());
            return Ok(());
        }

        if let Some(class) = self.metabase.class(name) {
            types.insert(name.to_string());
            if let Some(superclass) = &class.superclass {
                queue.push_back(superclass.clone());
            }
            for protocol in &class.protocols {
                queue.push_back(protocol.clone());
            }
            for method in class.methods.values() {
                self.member_refs(
                    &method.arguments,
                    method.returns.as_ref(),
                    method.framework.as_deref().unwrap_or(&class.framework),
                    queue,
                    visited_blocks,
                )
                .map_err(|error| error.in_type(&class.name, &class.filename))?;
            }
            for property in class.properties.values() {
                self.slot_refs(
                    &EncodedValue {
                        name: property.name.clone(),
                        type_hint: property.type_hint.clone(),
                        value: property.value.clone(),
                        encoding: property.encoding.clone(),
                    },
                    &class.framework,
                    queue,
                    visited_blocks,
                )
                .map_err(|error| error.in_type(&class.name, &class.filename))?;
            }
            return Ok(());
        }

        if let Some(protocol) = self.metabase.protocol(name) {
            types.insert(name.to_string());
            for parent in &protocol.protocols {
                queue.push_back(parent.clone());
            }
            for method in protocol.methods.values() {
                self.member_refs(
                    &method.arguments,
                    method.returns.as_ref(),
                    &protocol.framework,
                    queue,
                    visited_blocks,
                )
                .map_err(|error| error.in_type(&protocol.name, &protocol.filename))?;
            }
            for property in protocol.properties.values() {
                self.slot_refs(
                    &EncodedValue {
                        name: property.name.clone(),
                        type_hint: property.type_hint.clone(),
                        value: property.value.clone(),
                        encoding: property.encoding.clone(),
                    },
                    &protocol.framework,
                    queue,
                    visited_blocks,
                )
                .map_err(|error| error.in_type(&protocol.name, &protocol.filename))?;
            }
            return Ok(());
        }

        if let Some(strukt) = self.metabase.strukt(name) {
            types.insert(strukt.name.clone());
            for field in &strukt.fields {
                if field.encoding.is_empty() {
                    continue;
                }
                let descriptor = self
                    .metabase
                    .type_descriptor(&field.encoding)
                    .map_err(|error| error.in_type(&strukt.name, &strukt.filename))?;
                self.descriptor_refs(&descriptor, queue);
            }
            return Ok(());
        }

        if self.metabase.enumeration(name).is_some() || self.metabase.var(name).is_some() {
            types.insert(name.to_string());
            return Ok(());
        }

        if let Some(function) = self.metabase.function(name) {
            types.insert(name.to_string());
            let framework = function.framework.clone();
            self.member_refs(
                &function.arguments,
                function.returns.as_ref(),
                &framework,
                queue,
                visited_blocks,
            )
            .map_err(|error| error.in_type(&function.name, &function.filename))?;
            return Ok(());
        }

        if let Some(alias) = self.metabase.type_alias(name) {
            types.insert(name.to_string());
            if let Some(encoding) = alias.encoding.clone() {
                let descriptor = self
                    .metabase
                    .type_descriptor(&encoding)
                    .map_err(|error| error.in_type(name, &alias.filename))?;
                self.descriptor_refs(&descriptor, queue);
            }
            return Ok(());
        }

        trace!(name, "transitive reference not in metabase, skipping");
        Ok(())
    }

    fn member_refs(
        &self,
        arguments: &[EncodedValue],
        returns: Option<&EncodedValue>,
        framework: &str,
        queue: &mut VecDeque<String>,
        visited_blocks: &mut HashSet<String>,
    ) -> Result<()> {
        for argument in arguments {
            self.slot_refs(argument, framework, queue, visited_blocks)?;
        }
        if let Some(slot) = returns {
            self.slot_refs(slot, framework, queue, visited_blocks)?;
        }
        Ok(())
    }

    /// Collect the type names one value slot references: its decoded
    /// encoding, the class name hinted by its native spelling, and the block
    /// descriptor behind a block signature.
    fn slot_refs(
        &self,
        slot: &EncodedValue,
        framework: &str,
        queue: &mut VecDeque<String>,
        visited_blocks: &mut HashSet<String>,
    ) -> Result<()> {
        if let Some(encoding) = &slot.encoding {
            if !encoding.is_empty() {
                let descriptor = self.metabase.type_descriptor(encoding)?;
                self.descriptor_refs(&descriptor, queue);
            }
        }

        // A bare `@` hides the class; the scanner records the spelling next
        // to it ("UIView *").
        if matches!(
            slot.type_hint.as_str(),
            "objc_interface" | "obj_interface" | "objc_pointer" | "id"
        ) {
            let spelled = slot.value.replace('*', "");
            let spelled = spelled.trim();
            if self.metabase.class(spelled).is_some()
                || self.metabase.protocol(spelled).is_some()
            {
                queue.push_back(spelled.to_string());
            }
        }

        if slot.type_hint == "block" && !slot.value.is_empty() {
            match self.metabase.find_block(&slot.value, framework) {
                Ok(block) => self.block_refs(block, framework, queue, visited_blocks)?,
                Err(error) => {
                    trace!(signature = %slot.value, %error, "block signature not found during expansion");
                }
            }
        }
        Ok(())
    }

    fn block_refs(
        &self,
        block: &BlockMetadata,
        framework: &str,
        queue: &mut VecDeque<String>,
        visited_blocks: &mut HashSet<String>,
    ) -> Result<()> {
        if !visited_blocks.insert(block.signature.clone()) {
            return Ok(());
        }
        let framework = block.framework.as_deref().unwrap_or(framework).to_string();
        for argument in block.arguments.clone() {
            self.slot_refs(&argument, &framework, queue, visited_blocks)?;
        }
        if let Some(slot) = block.returns.clone() {
            self.slot_refs(&slot, &framework, queue, visited_blocks)?;
        }
        Ok(())
    }

    fn descriptor_refs(&self, descriptor: &TypeDescriptor, queue: &mut VecDeque<String>) {
        match &descriptor.kind {
            TypeKind::Object {
                class_name,
                protocols,
            } => {
                if let Some(class_name) = class_name {
                    queue.push_back(class_name.clone());
                }
                for protocol in protocols {
                    queue.push_back(protocol.clone());
                }
            }
            TypeKind::Struct { name, fields } => {
                if let Some(name) = name {
                    queue.push_back(name.clone());
                }
                for field in fields {
                    self.descriptor_refs(&field.descriptor, queue);
                }
            }
            TypeKind::Pointer(inner) => self.descriptor_refs(inner, queue),
            TypeKind::Array { element, .. } => self.descriptor_refs(element, queue),
            _ => {}
        }
    }
}

/// The dotted spelling of a nested class retried with `$`, when the name has
/// a dot to replace.
fn nested_spelling(name: &str) -> Option<String> {
    let index = name.rfind('.')?;
    let mut nested = String::with_capacity(name.len());
    nested.push_str(&name[..index]);
    nested.push('$');
    nested.push_str(&name[index + 1..]);
    Some(nested)
}
