//! Serde data model for the metabase document.
//!
//! Field names follow the document. Almost everything is optional in practice
//! because the scanner omits keys it has nothing to say about, so most fields
//! carry `#[serde(default)]`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A typed value slot: a method argument, return value, function argument,
/// variable or block argument.
///
/// `value` is the native spelling (`"UIView *"`), `type_hint` the scanner's
/// coarse classification (`"objc_interface"`, `"struct"`, `"block"`), and
/// `encoding` the precise type encoding when the scanner had one. The
/// resolver uses all three; generated wrappers rely on `encoding` first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedValue {
    /// Slot name, when the document names it (argument names)
    #[serde(default)]
    pub name: String,
    /// Coarse type classification from the scanner
    #[serde(rename = "type", default)]
    pub type_hint: String,
    /// Native spelling of the type
    #[serde(default)]
    pub value: String,
    /// Precise type encoding, when present
    #[serde(default)]
    pub encoding: Option<String>,
}

/// One method of a class or protocol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Bridged method name
    #[serde(default)]
    pub name: String,
    /// Native selector
    #[serde(default)]
    pub selector: String,
    /// Full method type encoding, when the scanner captured one
    #[serde(default)]
    pub encoding: Option<String>,
    /// `true` for instance methods, `false` for class methods
    #[serde(default)]
    pub instance: bool,
    /// Argument slots in selector order
    #[serde(default)]
    pub arguments: Vec<EncodedValue>,
    /// Return slot
    #[serde(default)]
    pub returns: Option<EncodedValue>,
    /// Owning framework, filled in from the class when absent
    #[serde(default)]
    pub framework: Option<String>,
    /// Marks initializer-family methods
    #[serde(default)]
    pub constructor: bool,
    /// Hand-written wrapper body for synthesized methods. Never read from the
    /// document; only root-class builtins set it.
    #[serde(skip)]
    pub override_impl: Option<String>,
}

/// One property of a class or protocol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyMetadata {
    /// Property name
    #[serde(default)]
    pub name: String,
    /// Coarse type classification
    #[serde(rename = "type", default)]
    pub type_hint: String,
    /// Native spelling of the property type
    #[serde(default)]
    pub value: String,
    /// Property type encoding
    #[serde(default)]
    pub encoding: Option<String>,
    /// Declared attributes (`readonly`, `class`, `copy`, ...)
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl PropertyMetadata {
    /// `true` for class-level (static) properties.
    #[must_use]
    pub fn is_class_property(&self) -> bool {
        self.attributes.iter().any(|attribute| attribute == "class")
    }

    /// `true` when the property has no setter.
    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.attributes
            .iter()
            .any(|attribute| attribute == "readonly")
    }
}

/// One class in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Class name
    #[serde(default)]
    pub name: String,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the class was scanned from
    #[serde(default)]
    pub filename: String,
    /// Superclass name, absent for root classes
    #[serde(default)]
    pub superclass: Option<String>,
    /// Protocols the class declares
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Methods keyed by bridged name
    #[serde(default)]
    pub methods: IndexMap<String, MethodMetadata>,
    /// Properties keyed by name
    #[serde(default)]
    pub properties: IndexMap<String, PropertyMetadata>,
}

/// One protocol in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    /// Protocol name
    #[serde(default)]
    pub name: String,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the protocol was scanned from
    #[serde(default)]
    pub filename: String,
    /// Parent protocols
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Methods keyed by bridged name
    #[serde(default)]
    pub methods: IndexMap<String, MethodMetadata>,
    /// Properties keyed by name
    #[serde(default)]
    pub properties: IndexMap<String, PropertyMetadata>,
}

/// One field of a struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructField {
    /// Field name
    #[serde(default)]
    pub name: String,
    /// Field type encoding
    #[serde(default)]
    pub encoding: String,
    /// Coarse type classification
    #[serde(rename = "type", default)]
    pub type_hint: String,
}

/// One struct in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructMetadata {
    /// Struct name, leading underscores already trimmed
    #[serde(default)]
    pub name: String,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the struct was scanned from
    #[serde(default)]
    pub filename: String,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<StructField>,
}

/// One enum in the metabase. Only the constant values are bridged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumMetadata {
    /// Enum name
    #[serde(default)]
    pub name: String,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the enum was scanned from
    #[serde(default)]
    pub filename: String,
    /// Constants and their values
    #[serde(default)]
    pub values: IndexMap<String, i64>,
}

/// One free function in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Function name
    #[serde(default)]
    pub name: String,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the function was scanned from
    #[serde(default)]
    pub filename: String,
    /// Argument slots in order
    #[serde(default)]
    pub arguments: Vec<EncodedValue>,
    /// Return slot
    #[serde(default)]
    pub returns: Option<EncodedValue>,
    /// `true` for variadic functions
    #[serde(default)]
    pub variadic: bool,
}

/// One constant variable in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarMetadata {
    /// Variable name
    #[serde(default)]
    pub name: String,
    /// Coarse type classification
    #[serde(rename = "type", default)]
    pub type_hint: String,
    /// Variable type encoding
    #[serde(default)]
    pub encoding: Option<String>,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
}

/// One typedef in the metabase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypedefMetadata {
    /// Native spelling of the aliased type
    #[serde(default)]
    pub value: String,
    /// Coarse type classification
    #[serde(rename = "type", default)]
    pub type_hint: String,
    /// Encoding of the aliased type
    #[serde(default)]
    pub encoding: Option<String>,
    /// Owning framework
    #[serde(default)]
    pub framework: String,
    /// Header the typedef was scanned from
    #[serde(default)]
    pub filename: String,
}

/// One block descriptor. Blocks are keyed per module and matched by
/// signature, not by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Block signature, e.g. `"void (^)(BOOL, NSError *)"`
    #[serde(default)]
    pub signature: String,
    /// Argument slots in order
    #[serde(default)]
    pub arguments: Vec<EncodedValue>,
    /// Return slot
    #[serde(default)]
    pub returns: Option<EncodedValue>,
    /// Owning framework
    #[serde(default)]
    pub framework: Option<String>,
}
