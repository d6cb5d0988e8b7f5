//! Native type-encoding decoder.
//!
//! This module turns the compact type-encoding strings carried by the metabase
//! (`"v24@0:8@?16"`, `"{CGRect={CGPoint=dd}{CGSize=dd}}"`) into structured
//! [`TypeDescriptor`] trees that the resolver and code generator can reason
//! about without re-scanning text.
//!
//! # Architecture
//!
//! Decoding is a recursive-descent parse over a bounds-checked [`Cursor`]:
//!
//! - **Single-character dispatch** - every token starts with one character
//!   that selects the production (primitive, struct, pointer, object, array
//!   or named reference).
//! - **Consumed-length accounting** - each [`TypeDescriptor`] records in
//!   `skip` exactly how many characters it consumed. Method-signature
//!   splitting advances by `skip`, so a wrong count misaligns every argument
//!   that follows.
//! - **Lookup seam** - named references like `[UIView]` need the metabase to
//!   decide whether a name is a class, struct, protocol or typedef. The
//!   parser only sees the [`TypeLookup`] trait, which keeps this module free
//!   of any dependency on the metabase representation.
//!
//! # Key Components
//!
//! - [`EncodingParser`] - the decoder itself
//! - [`TypeDescriptor`] / [`TypeKind`] - decoded type trees
//! - [`MethodSignature`] - return + argument descriptors for a method
//! - [`Cursor`] - bounds-checked character cursor
//!
//! # Usage Examples
//!
//! ```rust
//! use bridgegen::encoding::{EncodingParser, NoLookup, TypeKind, Primitive};
//!
//! let sig = EncodingParser::new(&NoLookup).parse_method("v24@0:8@?16")?;
//! assert_eq!(sig.returns.kind, TypeKind::Primitive(Primitive::Void));
//! assert_eq!(sig.arguments.len(), 1);
//! assert_eq!(sig.arguments[0].kind, TypeKind::Block);
//! # Ok::<(), bridgegen::Error>(())
//! ```

mod cursor;
mod parser;
mod types;

pub use cursor::Cursor;
pub use parser::{EncodingParser, NoLookup, TypeLookup, TypedefTarget, MAX_RECURSION_DEPTH};
pub use types::{FieldDescriptor, MethodSignature, Primitive, TypeDescriptor, TypeKind};
