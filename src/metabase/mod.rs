//! The metabase: a loaded, normalized description of the native API surface.
//!
//! The metabase document is a large JSON file produced by an external scanner.
//! It describes classes, protocols, structs, enums, blocks, free functions,
//! constants and typedefs, with all cross-references expressed as plain name
//! strings and all types as encoding strings.
//!
//! # Architecture
//!
//! - [`types`] holds the serde data model. Maps are [`indexmap::IndexMap`] so
//!   declaration order survives loading; wildcard expansion and generated
//!   output depend on that order being stable.
//! - [`Metabase`] wraps the document with lazy, memoized decoding: method
//!   signatures and type descriptors are decoded on first use and cached in a
//!   [`dashmap::DashMap`], since a build touches only the closure it needs.
//! - Loading normalizes the document the way consumers expect it: leading
//!   underscores are trimmed from struct names, a root class is synthesized
//!   when the document lacks one, and a few unbridgeable free functions are
//!   dropped.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bridgegen::metabase::Metabase;
//! use std::path::Path;
//!
//! let metabase = Metabase::from_file(Path::new("metabase.json"))?;
//! let view = metabase.class("UIView").expect("UIKit metabase");
//! assert_eq!(view.superclass.as_deref(), Some("UIResponder"));
//! # Ok::<(), bridgegen::Error>(())
//! ```

mod loader;
mod model;
mod types;

pub use model::Metabase;
pub use types::{
    BlockMetadata, ClassMetadata, EncodedValue, EnumMetadata, FunctionMetadata, MethodMetadata,
    PropertyMetadata, ProtocolMetadata, StructField, StructMetadata, TypedefMetadata, VarMetadata,
};

/// Name of the synthesized root class when the document lacks one.
pub const ROOT_CLASS: &str = "NSObject";
