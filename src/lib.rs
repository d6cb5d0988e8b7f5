#![warn(missing_docs)]
#![deny(unsafe_code)]

//! # bridgegen
//!
//! `bridgegen` turns a machine-generated description of a native API surface
//! (the *metabase*) into scripting-language wrapper sources, regenerating only
//! what changed between builds.
//!
//! ## Architecture
//!
//! The crate is a pipeline of four components. Each one is usable on its own,
//! and [`pipeline::BuildPipeline`] wires them together:
//!
//! - [`encoding`] - decodes native type-encoding strings (`"v24@0:8@?16"`)
//!   into structured [`encoding::TypeDescriptor`] trees.
//! - [`metabase`] - the loaded metabase document plus lazy, memoized access to
//!   decoded method and property signatures.
//! - [`resolver`] - expands a set of used type names into its full transitive
//!   dependency closure (superclasses, protocols, referenced structs, blocks
//!   and typedefs).
//! - [`codegen`] - renders one wrapper source per class, struct or module in
//!   the closure, prunes members nothing references, and emits the bootstrap
//!   manifest that maps type names to generated files.
//! - [`cache`] - reconciles the output directory across builds so unchanged
//!   types are not regenerated and removed types are deleted.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use bridgegen::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> bridgegen::Result<()> {
//!     let metabase = Metabase::from_file(Path::new("metabase.json"))?;
//!     let mut references = ReferenceMap::new();
//!     references.entry("app.js").require_type("UIView");
//!
//!     let mut pipeline = BuildPipeline::new(metabase, references, Path::new("out"));
//!     let report = pipeline.run()?;
//!     println!("generated {} sources", report.written.len());
//!     Ok(())
//! }
//! ```

use std::result;

#[macro_use]
mod error;
pub use error::Error;

/// Standardized result type used throughout the crate
pub type Result<T> = result::Result<T, Error>;

pub mod cache;
pub mod codegen;
pub mod encoding;
pub mod metabase;
pub mod pipeline;
pub mod references;
pub mod resolver;

/// Common imports for working with the `bridgegen` library.
///
/// This module provides a convenient way to import the most commonly used
/// types and traits in one go.
///
/// # Usage
///
/// ```rust,ignore
/// use bridgegen::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{BuildState, GeneratedSet};
    pub use crate::codegen::{CodeGenerator, GeneratedSource, GenerationContext};
    pub use crate::encoding::{
        EncodingParser, FieldDescriptor, MethodSignature, Primitive, TypeDescriptor, TypeKind,
    };
    pub use crate::metabase::{
        BlockMetadata, ClassMetadata, EnumMetadata, FunctionMetadata, Metabase, MethodMetadata,
        PropertyMetadata, StructMetadata,
    };
    pub use crate::pipeline::{BuildPipeline, BuildReport};
    pub use crate::references::{MemberRefs, ReferenceMap, SourceReferences};
    pub use crate::resolver::DependencyResolver;
    pub use crate::{Error, Result};
}
