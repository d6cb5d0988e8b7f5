//! The [`Metabase`] itself: document access plus lazy decoded-type caches.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    encoding::{EncodingParser, MethodSignature, TypeDescriptor, TypeLookup, TypedefTarget},
    metabase::{
        BlockMetadata, ClassMetadata, EnumMetadata, FunctionMetadata, ProtocolMetadata,
        StructMetadata, TypedefMetadata, VarMetadata,
    },
    Result,
};

/// A loaded metabase document.
///
/// Maps preserve document order. Decoding an encoding string is deferred until
/// something asks for it and then memoized, since a typical build only touches
/// the dependency closure of the types the application actually uses.
#[derive(Debug, Default, Deserialize)]
pub struct Metabase {
    /// Classes keyed by name
    #[serde(default)]
    pub classes: IndexMap<String, ClassMetadata>,
    /// Protocols keyed by name
    #[serde(default)]
    pub protocols: IndexMap<String, ProtocolMetadata>,
    /// Structs keyed by name
    #[serde(default)]
    pub structs: IndexMap<String, StructMetadata>,
    /// Enums keyed by name
    #[serde(default)]
    pub enums: IndexMap<String, EnumMetadata>,
    /// Block descriptors keyed by module
    #[serde(default)]
    pub blocks: IndexMap<String, Vec<BlockMetadata>>,
    /// Free functions keyed by name
    #[serde(default)]
    pub functions: IndexMap<String, FunctionMetadata>,
    /// Constant variables keyed by name
    #[serde(default)]
    pub vars: IndexMap<String, VarMetadata>,
    /// Typedefs keyed by name
    #[serde(default)]
    pub typedefs: IndexMap<String, TypedefMetadata>,

    /// Application-registered classes, resolvable like metabase classes
    #[serde(skip)]
    custom_classes: HashSet<String>,
    /// Memoized single-type decodes, keyed by encoding string
    #[serde(skip)]
    descriptor_cache: DashMap<String, Arc<TypeDescriptor>>,
    /// Memoized method-signature decodes, keyed by encoding string
    #[serde(skip)]
    signature_cache: DashMap<String, Arc<MethodSignature>>,
}

impl Metabase {
    /// Look up a class by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes.get(name)
    }

    /// Look up a protocol by name.
    #[must_use]
    pub fn protocol(&self, name: &str) -> Option<&ProtocolMetadata> {
        self.protocols.get(name)
    }

    /// Look up a struct by name, tolerating un-trimmed leading underscores.
    #[must_use]
    pub fn strukt(&self, name: &str) -> Option<&StructMetadata> {
        self.structs
            .get(name)
            .or_else(|| self.structs.get(name.trim_start_matches('_')))
    }

    /// Look up an enum by name.
    #[must_use]
    pub fn enumeration(&self, name: &str) -> Option<&EnumMetadata> {
        self.enums.get(name)
    }

    /// Look up a free function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionMetadata> {
        self.functions.get(name)
    }

    /// Look up a constant variable by name.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&VarMetadata> {
        self.vars.get(name)
    }

    /// Look up a typedef by name.
    #[must_use]
    pub fn type_alias(&self, name: &str) -> Option<&TypedefMetadata> {
        self.typedefs.get(name)
    }

    /// Register a class defined by the consuming application rather than the
    /// metabase. Named references resolve against these after every metabase
    /// category has been tried.
    pub fn register_custom_class(&mut self, name: impl Into<String>) {
        self.custom_classes.insert(name.into());
    }

    /// `true` if `name` was registered via [`Metabase::register_custom_class`].
    #[must_use]
    pub fn is_custom_class(&self, name: &str) -> bool {
        self.custom_classes.contains(name)
    }

    /// Decode a single type encoding, memoized.
    ///
    /// # Errors
    /// Propagates decoder errors; failed decodes are not cached.
    pub fn type_descriptor(&self, encoding: &str) -> Result<Arc<TypeDescriptor>> {
        if let Some(cached) = self.descriptor_cache.get(encoding) {
            return Ok(Arc::clone(&cached));
        }
        let decoded = Arc::new(EncodingParser::new(self).parse_type(encoding)?);
        self.descriptor_cache
            .insert(encoding.to_string(), Arc::clone(&decoded));
        Ok(decoded)
    }

    /// Decode a method-signature encoding, memoized.
    ///
    /// # Errors
    /// Propagates decoder errors; failed decodes are not cached.
    pub fn method_signature(&self, encoding: &str) -> Result<Arc<MethodSignature>> {
        if let Some(cached) = self.signature_cache.get(encoding) {
            return Ok(Arc::clone(&cached));
        }
        let decoded = Arc::new(EncodingParser::new(self).parse_method(encoding)?);
        self.signature_cache
            .insert(encoding.to_string(), Arc::clone(&decoded));
        Ok(decoded)
    }

    /// Find the block descriptor matching `signature`, preferring the blocks
    /// of `framework`.
    ///
    /// The scanner sometimes spells the same block two ways (`_Bool` vs
    /// `BOOL`), so signatures are normalized before comparison. A signature
    /// that is actually a typedef name is chased through the typedef table.
    ///
    /// # Errors
    /// Returns [`crate::Error::BlockNotFound`] when no module has a match.
    pub fn find_block(&self, signature: &str, framework: &str) -> Result<&BlockMetadata> {
        let mut current = signature.to_string();
        let mut chased: Vec<String> = Vec::new();
        loop {
            if let Some(found) = self.shallow_find_block(&current, framework) {
                return Ok(found);
            }
            match self.typedefs.get(&current) {
                Some(alias) if !chased.contains(&current) => {
                    chased.push(std::mem::replace(&mut current, alias.value.clone()));
                }
                _ => break,
            }
        }
        for module in self.blocks.keys() {
            if let Some(found) = self.shallow_find_block(signature, module) {
                return Ok(found);
            }
        }
        Err(crate::Error::BlockNotFound(signature.to_string()))
    }

    fn shallow_find_block(&self, signature: &str, framework: &str) -> Option<&BlockMetadata> {
        let wanted = normalize_block_signature(signature);
        self.blocks.get(framework).and_then(|blocks| {
            blocks
                .iter()
                .find(|block| normalize_block_signature(&block.signature) == wanted)
        })
    }

    /// Every name the metabase can resolve, for "did you mean" suggestions.
    pub fn known_type_names(&self) -> impl Iterator<Item = &str> {
        self.classes
            .keys()
            .chain(self.protocols.keys())
            .chain(self.structs.keys())
            .chain(self.enums.keys())
            .chain(self.functions.keys())
            .chain(self.typedefs.keys())
            .map(String::as_str)
    }
}

/// `_Bool` and `bool` are interchangeable with `BOOL` in block signatures.
/// Normalization applies to the whole signature.
#[must_use]
pub(crate) fn normalize_block_signature(signature: &str) -> String {
    signature.replace("_Bool", "BOOL").replace("bool", "BOOL")
}

impl TypeLookup for Metabase {
    fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    fn struct_encoding(&self, name: &str) -> Option<String> {
        self.strukt(name).map(|strukt| {
            let mut encoding = format!("{{{}=", strukt.name);
            for field in &strukt.fields {
                encoding.push_str(&field.encoding);
            }
            encoding.push('}');
            encoding
        })
    }

    fn has_protocol(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    fn typedef(&self, name: &str) -> Option<TypedefTarget> {
        self.typedefs.get(name).and_then(|alias| {
            alias.encoding.as_ref().map(|encoding| TypedefTarget {
                value: alias.value.clone(),
                encoding: encoding.clone(),
            })
        })
    }

    fn has_custom_class(&self, name: &str) -> bool {
        self.custom_classes.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metabase {
        Metabase::from_json(
            r#"{
                "classes": {
                    "UIView": { "name": "UIView", "framework": "UIKit", "superclass": "UIResponder" }
                },
                "structs": {
                    "CGSize": { "name": "CGSize", "framework": "CoreGraphics",
                                "fields": [ { "name": "width", "encoding": "d" },
                                            { "name": "height", "encoding": "d" } ] }
                },
                "typedefs": {
                    "UIViewAnimations": { "value": "void (^)(void)", "type": "block", "encoding": "@?", "framework": "UIKit" }
                },
                "blocks": {
                    "UIKit": [ { "signature": "void (^)(_Bool)", "arguments": [ { "type": "bool", "value": "BOOL", "encoding": "B" } ] },
                               { "signature": "void (^)(void)", "arguments": [] } ]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_struct_encoding_reconstruction() {
        let metabase = sample();
        assert_eq!(
            metabase.struct_encoding("CGSize").as_deref(),
            Some("{CGSize=dd}")
        );
        assert_eq!(
            metabase.struct_encoding("__CGSize").as_deref(),
            Some("{CGSize=dd}")
        );
        assert_eq!(metabase.struct_encoding("CGRect"), None);
    }

    #[test]
    fn test_descriptor_cache_returns_same_arc() {
        let metabase = sample();
        let first = metabase.type_descriptor("{CGSize=dd}").unwrap();
        let second = metabase.type_descriptor("{CGSize=dd}").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_signature_cache() {
        let metabase = sample();
        let first = metabase.method_signature("v24@0:8@?16").unwrap();
        let second = metabase.method_signature("v24@0:8@?16").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.arguments.len(), 1);
    }

    #[test]
    fn test_find_block_normalizes_bool_spelling() {
        let metabase = sample();
        let block = metabase.find_block("void (^)(BOOL)", "UIKit").unwrap();
        assert_eq!(block.signature, "void (^)(_Bool)");
    }

    #[test]
    fn test_find_block_chases_typedefs() {
        let metabase = sample();
        let block = metabase.find_block("UIViewAnimations", "UIKit").unwrap();
        assert_eq!(block.signature, "void (^)(void)");
    }

    #[test]
    fn test_find_block_searches_other_modules() {
        let metabase = sample();
        let block = metabase.find_block("void (^)(void)", "Foundation").unwrap();
        assert_eq!(block.signature, "void (^)(void)");
        assert!(matches!(
            metabase.find_block("void (^)(int)", "UIKit"),
            Err(crate::Error::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_custom_class_resolution() {
        let mut metabase = sample();
        assert!(!metabase.has_custom_class("MyView"));
        metabase.register_custom_class("MyView");
        assert!(metabase.has_custom_class("MyView"));

        let descriptor = metabase.type_descriptor("[MyView]").unwrap();
        assert_eq!(descriptor.referenced_class(), Some("MyView"));
    }
}
