//! Decoded type representations.
//!
//! A [`TypeDescriptor`] is the structured result of decoding one token of an
//! encoding string. The `skip` field is the number of characters the token
//! consumed; argument splitting in method signatures depends on it being
//! exact.

use strum::{Display, EnumIter};

/// Fixed-width primitive types the encoding alphabet can express.
///
/// The `Display` form is the native spelling used in generated wrapper
/// comments and in block-signature normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Primitive {
    /// `v`
    #[strum(serialize = "void")]
    Void,
    /// `B`
    #[strum(serialize = "bool")]
    Bool,
    /// `c`
    #[strum(serialize = "char")]
    Char,
    /// `C`
    #[strum(serialize = "unsigned char")]
    UChar,
    /// `s`
    #[strum(serialize = "short")]
    Short,
    /// `S`
    #[strum(serialize = "unsigned short")]
    UShort,
    /// `i`
    #[strum(serialize = "int")]
    Int,
    /// `I`
    #[strum(serialize = "unsigned int")]
    UInt,
    /// `l`
    #[strum(serialize = "long")]
    Long,
    /// `L`
    #[strum(serialize = "unsigned long")]
    ULong,
    /// `q`
    #[strum(serialize = "long long")]
    LongLong,
    /// `Q`
    #[strum(serialize = "unsigned long long")]
    ULongLong,
    /// `f`
    #[strum(serialize = "float")]
    Float,
    /// `d`
    #[strum(serialize = "double")]
    Double,
}

impl Primitive {
    /// Map a dispatch character to its primitive, if it is one.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Primitive> {
        Some(match code {
            b'v' => Primitive::Void,
            b'B' => Primitive::Bool,
            b'c' => Primitive::Char,
            b'C' => Primitive::UChar,
            b's' => Primitive::Short,
            b'S' => Primitive::UShort,
            b'i' => Primitive::Int,
            b'I' => Primitive::UInt,
            b'l' => Primitive::Long,
            b'L' => Primitive::ULong,
            b'q' => Primitive::LongLong,
            b'Q' => Primitive::ULongLong,
            b'f' => Primitive::Float,
            b'd' => Primitive::Double,
            _ => return None,
        })
    }

    /// The single-character encoding for this primitive.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Primitive::Void => 'v',
            Primitive::Bool => 'B',
            Primitive::Char => 'c',
            Primitive::UChar => 'C',
            Primitive::Short => 's',
            Primitive::UShort => 'S',
            Primitive::Int => 'i',
            Primitive::UInt => 'I',
            Primitive::Long => 'l',
            Primitive::ULong => 'L',
            Primitive::LongLong => 'q',
            Primitive::ULongLong => 'Q',
            Primitive::Float => 'f',
            Primitive::Double => 'd',
        }
    }
}

/// The shape of a decoded type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A fixed-width primitive
    Primitive(Primitive),
    /// A pointer to another decoded type (`^d`, `^{CGRect=...}`)
    Pointer(Box<TypeDescriptor>),
    /// An object reference. `class_name` is present when the encoding named a
    /// concrete class (`[UIView]`); a bare `@` leaves it unset.
    Object {
        /// Concrete class, when the encoding named one
        class_name: Option<String>,
        /// Protocols the object is known to conform to
        protocols: Vec<String>,
    },
    /// A block reference (`@?`)
    Block,
    /// A selector (`:`)
    Selector,
    /// A class object (`#`)
    Class,
    /// A C string (`*`)
    CharPointer,
    /// A structure with recursively decoded fields
    Struct {
        /// Struct tag, unless anonymous (`{?=...}`)
        name: Option<String>,
        /// Fields in declaration order
        fields: Vec<FieldDescriptor>,
    },
    /// A fixed-size array (`[16i]`)
    Array {
        /// Element type
        element: Box<TypeDescriptor>,
        /// Element count
        count: usize,
    },
    /// A method qualifier (`r`, `n`, `o`, ...); decodes to nothing
    Ignored,
    /// `?` - an unknown type, treated as `void *`
    Unknown,
}

/// One decoded token of an encoding string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Structured shape of the type
    pub kind: TypeKind,
    /// Native spelling (`"unsigned long long"`, `"UIView *"`, `"CGRect"`)
    pub value: String,
    /// Normalized encoding for this type (`"@"`, `"{CGRect=dd}"`)
    pub encoding: String,
    /// Exact number of characters this token consumed from the input
    pub skip: usize,
}

impl TypeDescriptor {
    /// `true` for a `void` return.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Primitive(Primitive::Void)
    }

    /// `true` for a block reference.
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.kind == TypeKind::Block
    }

    /// `true` for any object reference.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object { .. })
    }

    /// `true` for a struct, directly or behind a pointer.
    #[must_use]
    pub fn is_struct(&self) -> bool {
        match &self.kind {
            TypeKind::Struct { .. } => true,
            TypeKind::Pointer(inner) => inner.is_struct(),
            _ => false,
        }
    }

    /// The struct tag, if this is a named struct (pointers included).
    #[must_use]
    pub fn struct_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Struct { name, .. } => name.as_deref(),
            TypeKind::Pointer(inner) => inner.struct_name(),
            _ => None,
        }
    }

    /// The concrete class this type refers to, if any (pointers included).
    #[must_use]
    pub fn referenced_class(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Object { class_name, .. } => class_name.as_deref(),
            TypeKind::Pointer(inner) => inner.referenced_class(),
            _ => None,
        }
    }
}

/// One field of a decoded struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name from the encoding (`"x"d`), or a positional `fN` fallback
    pub name: String,
    /// Encoding of just this field
    pub encoding: String,
    /// Decoded field type
    pub descriptor: TypeDescriptor,
}

/// Decoded method signature: return type plus argument types, with the
/// implicit receiver and selector slots already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Decoded return type
    pub returns: TypeDescriptor,
    /// Decoded explicit arguments, in order
    pub arguments: Vec<TypeDescriptor>,
}
