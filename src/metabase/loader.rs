//! Document loading and normalization.
//!
//! Normalization runs once, right after deserialization, and produces the
//! shape every other component assumes:
//!
//! - struct names lose their leading underscores (`__CGRect` and `CGRect`
//!   describe the same struct; scanners emit both spellings),
//! - a root class is synthesized when the document lacks one, and the
//!   value-accessor builtins are attached to it with hand-written bodies,
//! - free functions that cannot be bridged (variadic logging, the app entry
//!   point) are dropped.

use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    metabase::{ClassMetadata, EncodedValue, Metabase, MethodMetadata, ROOT_CLASS},
    Result,
};

/// Instance methods every wrapped object carries, backed by the runtime
/// rather than a native selector.
const ROOT_VALUE_ACCESSORS: &[&str] = &[
    "stringValue",
    "boolValue",
    "intValue",
    "charValue",
    "floatValue",
    "shortValue",
    "longValue",
    "longLongValue",
    "unsignedIntValue",
    "unsignedCharValue",
    "unsignedShortValue",
    "unsignedLongLongValue",
    "unsignedLongValue",
    "isNull",
    "protect",
    "unprotect",
];

/// Functions the bridge cannot express and silently drops.
const UNBRIDGEABLE_FUNCTIONS: &[&str] = &["NSLogv", "NSLog", "UIApplicationMain"];

impl Metabase {
    /// Load and normalize a metabase document from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::JsonError`] if it is not a valid document.
    pub fn from_file(path: &Path) -> Result<Metabase> {
        let text = std::fs::read_to_string(path)?;
        Metabase::from_json(&text)
    }

    /// Load and normalize a metabase document from a JSON string.
    ///
    /// # Errors
    /// Returns [`crate::Error::JsonError`] if the text is not a valid
    /// document.
    pub fn from_json(text: &str) -> Result<Metabase> {
        let mut metabase: Metabase = serde_json::from_str(text)?;
        metabase.normalize();
        Ok(metabase)
    }

    fn normalize(&mut self) {
        self.trim_struct_names();
        self.ensure_root_class();
        self.drop_unbridgeable_functions();
    }

    /// Re-key structs with leading underscores trimmed; the first spelling of
    /// a name wins.
    fn trim_struct_names(&mut self) {
        let trimmed_any = self
            .structs
            .keys()
            .any(|name| name.starts_with('_'));
        if !trimmed_any {
            return;
        }
        let mut structs = IndexMap::with_capacity(self.structs.len());
        for (name, mut strukt) in self.structs.drain(..) {
            let trimmed = name.trim_start_matches('_').to_string();
            strukt.name = strukt.name.trim_start_matches('_').to_string();
            if strukt.name.is_empty() {
                strukt.name = trimmed.clone();
            }
            structs.entry(trimmed).or_insert(strukt);
        }
        self.structs = structs;
    }

    /// Every object graph needs a root; synthesize one when the scanner did
    /// not emit it, and attach the runtime-backed builtins either way.
    fn ensure_root_class(&mut self) {
        if !self.classes.contains_key(ROOT_CLASS) {
            debug!(class = ROOT_CLASS, "synthesizing root class");
        }
        let root = self
            .classes
            .entry(ROOT_CLASS.to_string())
            .or_insert_with(|| ClassMetadata {
                name: ROOT_CLASS.to_string(),
                ..ClassMetadata::default()
            });
        root.framework = "Foundation".to_string();

        for accessor in ROOT_VALUE_ACCESSORS {
            root.methods.insert(
                (*accessor).to_string(),
                MethodMetadata {
                    name: (*accessor).to_string(),
                    selector: (*accessor).to_string(),
                    instance: true,
                    returns: Some(EncodedValue {
                        type_hint: "id".to_string(),
                        value: "id".to_string(),
                        encoding: Some("@".to_string()),
                        ..EncodedValue::default()
                    }),
                    override_impl: Some(format!("return Bridge.{accessor}(this.$native);")),
                    ..MethodMetadata::default()
                },
            );
        }

        root.methods.insert(
            "extend".to_string(),
            MethodMetadata {
                name: "extend".to_string(),
                selector: "extend".to_string(),
                instance: false,
                override_impl: Some(
                    "return Bridge.extend(this.$class, arguments[0], arguments[1]);".to_string(),
                ),
                ..MethodMetadata::default()
            },
        );
    }

    fn drop_unbridgeable_functions(&mut self) {
        for name in UNBRIDGEABLE_FUNCTIONS {
            if self.functions.shift_remove(*name).is_some() {
                debug!(function = name, "dropping unbridgeable function");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_class_synthesized_with_builtins() {
        let metabase = Metabase::from_json("{}").unwrap();
        let root = metabase.class(ROOT_CLASS).unwrap();
        assert_eq!(root.framework, "Foundation");
        assert!(root.methods.contains_key("stringValue"));
        assert!(root.methods["stringValue"].instance);
        assert!(root.methods["stringValue"].override_impl.is_some());
        assert!(!root.methods["extend"].instance);
    }

    #[test]
    fn test_existing_root_class_keeps_methods_and_gains_builtins() {
        let metabase = Metabase::from_json(
            r#"{"classes":{"NSObject":{"name":"NSObject","framework":"ObjectiveC",
                "methods":{"description":{"name":"description","selector":"description","instance":true}}}}}"#,
        )
        .unwrap();
        let root = metabase.class(ROOT_CLASS).unwrap();
        assert_eq!(root.framework, "Foundation");
        assert!(root.methods.contains_key("description"));
        assert!(root.methods.contains_key("boolValue"));
    }

    #[test]
    fn test_struct_underscores_trimmed() {
        let metabase = Metabase::from_json(
            r#"{"structs":{"__CFRange":{"name":"__CFRange","fields":[{"name":"location","encoding":"q"}]}}}"#,
        )
        .unwrap();
        assert!(metabase.strukt("CFRange").is_some());
        assert_eq!(metabase.strukt("CFRange").unwrap().name, "CFRange");
        // un-trimmed spelling still resolves
        assert!(metabase.strukt("__CFRange").is_some());
    }

    #[test]
    fn test_unbridgeable_functions_dropped() {
        let metabase = Metabase::from_json(
            r#"{"functions":{"NSLog":{"name":"NSLog","variadic":true},
                            "CGRectMake":{"name":"CGRectMake"}}}"#,
        )
        .unwrap();
        assert!(metabase.function("NSLog").is_none());
        assert!(metabase.function("CGRectMake").is_some());
    }
}
