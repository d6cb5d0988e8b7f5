//! Recursive-descent decoder for type-encoding strings.
//!
//! Every token begins with a single dispatch character. The decoder consumes
//! exactly the characters belonging to the token and records that count in
//! [`TypeDescriptor::skip`]; method-argument splitting advances by `skip`, so
//! the count is load-bearing, not informational.
//!
//! Named references (`[UIView]`) are resolved through the [`TypeLookup`] seam
//! in a fixed order: classes, structs, the literal `id`, protocols, typedefs,
//! then caller-registered custom classes. Typedefs resolve recursively to a
//! fixed point with cycle detection.

use crate::{
    encoding::{Cursor, FieldDescriptor, MethodSignature, Primitive, TypeDescriptor, TypeKind},
    Result,
};

/// Maximum recursion depth when decoding nested encodings.
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Resolved target of a typedef.
#[derive(Debug, Clone)]
pub struct TypedefTarget {
    /// Native spelling of the aliased type
    pub value: String,
    /// Encoding of the aliased type
    pub encoding: String,
}

/// Name-resolution seam between the decoder and the metabase.
///
/// The decoder only needs existence checks and two small payloads; keeping the
/// seam this narrow lets the decoder be tested without a metabase document.
pub trait TypeLookup {
    /// `true` if `name` is a known class.
    fn has_class(&self, name: &str) -> bool;

    /// The reconstructed `{Name=fields}` encoding of a known struct.
    fn struct_encoding(&self, name: &str) -> Option<String>;

    /// `true` if `name` is a known protocol.
    fn has_protocol(&self, name: &str) -> bool;

    /// The target of a known typedef.
    fn typedef(&self, name: &str) -> Option<TypedefTarget>;

    /// `true` if `name` is a class registered by the consuming application
    /// rather than the metabase.
    fn has_custom_class(&self, _name: &str) -> bool {
        false
    }
}

/// A [`TypeLookup`] that knows no names. Named references fail to resolve;
/// everything else decodes normally.
pub struct NoLookup;

impl TypeLookup for NoLookup {
    fn has_class(&self, _name: &str) -> bool {
        false
    }
    fn struct_encoding(&self, _name: &str) -> Option<String> {
        None
    }
    fn has_protocol(&self, _name: &str) -> bool {
        false
    }
    fn typedef(&self, _name: &str) -> Option<TypedefTarget> {
        None
    }
}

/// Decoder for type-encoding strings and method signatures.
pub struct EncodingParser<'a> {
    lookup: &'a dyn TypeLookup,
}

impl<'a> EncodingParser<'a> {
    /// Create a parser resolving named references through `lookup`.
    #[must_use]
    pub fn new(lookup: &'a dyn TypeLookup) -> EncodingParser<'a> {
        EncodingParser { lookup }
    }

    /// Decode a single type from the start of `encoding`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownEncoding`] for an unrecognized dispatch
    /// character, [`crate::Error::UnresolvedReference`] for a named reference
    /// the lookup cannot place, and [`crate::Error::OutOfBounds`] for
    /// truncated input.
    pub fn parse_type(&self, encoding: &str) -> Result<TypeDescriptor> {
        let mut cursor = Cursor::new(encoding);
        self.parse_at(&mut cursor, 0, &mut Vec::new())
    }

    /// Decode a full method signature.
    ///
    /// The signature is split at the receiver/selector marker (`@:`, with any
    /// runtime offset digits between the two). Offset digits between argument
    /// tokens are skipped, and qualifier tokens decode to nothing.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] when the marker is missing and the
    /// same errors as [`EncodingParser::parse_type`] for bad tokens.
    pub fn parse_method(&self, encoding: &str) -> Result<MethodSignature> {
        let Some((marker_start, marker_end)) = find_receiver_marker(encoding) else {
            return Err(malformed_error!(
                "method encoding {:?} has no receiver/selector marker",
                encoding
            ));
        };

        let returns = self.parse_return(&encoding[..marker_start])?;

        let mut arguments = Vec::new();
        let mut cursor = Cursor::new(&encoding[marker_end..]);
        while cursor.has_more() {
            cursor.skip_digits();
            if !cursor.has_more() {
                break;
            }
            let descriptor = self.parse_at(&mut cursor, 0, &mut Vec::new())?;
            if descriptor.kind != TypeKind::Ignored {
                arguments.push(descriptor);
            }
        }

        Ok(MethodSignature { returns, arguments })
    }

    fn parse_return(&self, encoding: &str) -> Result<TypeDescriptor> {
        let mut cursor = Cursor::new(encoding);
        loop {
            cursor.skip_digits();
            if !cursor.has_more() {
                return Err(malformed_error!(
                    "method encoding {:?} has no return type",
                    encoding
                ));
            }
            let descriptor = self.parse_at(&mut cursor, 0, &mut Vec::new())?;
            if descriptor.kind != TypeKind::Ignored {
                return Ok(descriptor);
            }
        }
    }

    fn parse_at(
        &self,
        cursor: &mut Cursor<'_>,
        depth: usize,
        typedefs: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        if depth >= MAX_RECURSION_DEPTH {
            return Err(crate::Error::RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let start = cursor.pos();
        let dispatch = cursor.read()?;

        if let Some(primitive) = Primitive::from_code(dispatch) {
            return Ok(TypeDescriptor {
                kind: TypeKind::Primitive(primitive),
                value: primitive.to_string(),
                encoding: (dispatch as char).to_string(),
                skip: 1,
            });
        }

        match dispatch {
            b'r' | b'n' | b'N' | b'o' | b'O' | b'R' | b'V' => Ok(TypeDescriptor {
                kind: TypeKind::Ignored,
                value: String::new(),
                encoding: (dispatch as char).to_string(),
                skip: 1,
            }),
            b'#' => Ok(simple(TypeKind::Class, "Class", "#")),
            b':' => Ok(simple(TypeKind::Selector, "SEL", ":")),
            b'*' => Ok(simple(TypeKind::CharPointer, "char *", "*")),
            b'?' => Ok(simple(TypeKind::Unknown, "void *", "?")),
            b'@' => {
                // Mandatory lookahead; `@?` is a block, not an object
                if cursor.peek().is_ok_and(|next| next == b'?') {
                    cursor.advance()?;
                    Ok(TypeDescriptor {
                        kind: TypeKind::Block,
                        value: "id".into(),
                        encoding: "@?".into(),
                        skip: 2,
                    })
                } else {
                    Ok(TypeDescriptor {
                        kind: TypeKind::Object {
                            class_name: None,
                            protocols: Vec::new(),
                        },
                        value: "id".into(),
                        encoding: "@".into(),
                        skip: 1,
                    })
                }
            }
            b'^' => {
                let inner = self.parse_at(cursor, depth + 1, typedefs)?;
                Ok(TypeDescriptor {
                    value: format!("{} *", inner.value),
                    encoding: format!("^{}", inner.encoding),
                    skip: 1 + inner.skip,
                    kind: TypeKind::Pointer(Box::new(inner)),
                })
            }
            b'{' => self.parse_struct(cursor, start, depth, typedefs),
            b'[' => {
                if cursor.peek().is_ok_and(|next| next.is_ascii_digit()) {
                    self.parse_array(cursor, start, depth, typedefs)
                } else {
                    self.parse_named_reference(cursor, start, depth, typedefs)
                }
            }
            _ => Err(crate::Error::UnknownEncoding {
                encoding: cursor.slice(0, cursor.len())?.to_string(),
                index: start,
            }),
        }
    }

    /// Struct encoding: `{Name=fields}` with nested braces balanced. Field
    /// names may be quoted (`{CGPoint="x"d"y"d}`); unnamed fields get a
    /// positional `fN` name.
    fn parse_struct(
        &self,
        cursor: &mut Cursor<'_>,
        start: usize,
        depth: usize,
        typedefs: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        let close = find_balanced_close(cursor, start)?;
        let span = cursor.slice(start, close + 1)?.to_string();

        let equals = find_top_level_equals(&span).map(|offset| start + offset);
        let name = {
            let name_end = equals.unwrap_or(close);
            let raw = cursor.slice(start + 1, name_end)?;
            struct_tag(raw)
        };

        let mut fields = Vec::new();
        if let Some(equals) = equals {
            cursor.seek(equals + 1)?;
            let mut index = 0;
            while cursor.pos() < close {
                let field_name = if cursor.peek()? == b'"' {
                    cursor.advance()?;
                    let name_start = cursor.pos();
                    let name_end = cursor.find(b'"').ok_or_else(|| {
                        malformed_error!("unterminated field name in struct encoding {:?}", span)
                    })?;
                    let text = cursor.slice(name_start, name_end)?.to_string();
                    cursor.seek(name_end + 1)?;
                    text
                } else {
                    format!("f{index}")
                };

                let field_start = cursor.pos();
                let descriptor = self.parse_at(cursor, depth + 1, typedefs)?;
                let field_encoding = cursor.slice(field_start, cursor.pos())?.to_string();
                if descriptor.kind != TypeKind::Ignored {
                    fields.push(FieldDescriptor {
                        name: field_name,
                        encoding: field_encoding,
                        descriptor,
                    });
                    index += 1;
                }
            }
        }
        cursor.seek(close + 1)?;

        // Known structs render by name, anything else by its full encoding
        let value = match &name {
            Some(tag) if self.lookup.struct_encoding(tag).is_some() => tag.clone(),
            _ => span.clone(),
        };

        Ok(TypeDescriptor {
            kind: TypeKind::Struct { name, fields },
            value,
            encoding: span,
            skip: close + 1 - start,
        })
    }

    /// Fixed-size array: `[16i]`.
    fn parse_array(
        &self,
        cursor: &mut Cursor<'_>,
        start: usize,
        depth: usize,
        typedefs: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        let count = cursor.read_number()?;
        let element = self.parse_at(cursor, depth + 1, typedefs)?;
        if cursor.read()? != b']' {
            return Err(malformed_error!(
                "array encoding not terminated at index {}",
                cursor.pos() - 1
            ));
        }
        Ok(TypeDescriptor {
            value: format!("{}[{}]", element.value, count),
            encoding: cursor.slice(start, cursor.pos())?.to_string(),
            skip: cursor.pos() - start,
            kind: TypeKind::Array {
                element: Box::new(element),
                count,
            },
        })
    }

    /// Named reference: `[UIView]`. Resolution order is classes, structs, the
    /// literal `id`, protocols, typedefs, then custom classes; first match
    /// wins. Whatever the name resolves to, the token consumed exactly
    /// `[name]` from the input.
    fn parse_named_reference(
        &self,
        cursor: &mut Cursor<'_>,
        start: usize,
        depth: usize,
        typedefs: &mut Vec<String>,
    ) -> Result<TypeDescriptor> {
        let close = cursor.find(b']').ok_or_else(|| {
            malformed_error!("named reference not terminated at index {}", start)
        })?;
        let name = cursor.slice(start + 1, close)?.to_string();
        cursor.seek(close + 1)?;
        let skip = close + 1 - start;

        if self.lookup.has_class(&name) {
            return Ok(TypeDescriptor {
                kind: TypeKind::Object {
                    class_name: Some(name.clone()),
                    protocols: Vec::new(),
                },
                value: format!("{name} *"),
                encoding: "@".into(),
                skip,
            });
        }

        if let Some(encoding) = self.lookup.struct_encoding(&name) {
            let mut inner = Cursor::new(&encoding);
            let resolved = self.parse_at(&mut inner, depth + 1, typedefs)?;
            return Ok(TypeDescriptor {
                kind: resolved.kind,
                value: name,
                encoding,
                skip,
            });
        }

        if name == "id" {
            return Ok(TypeDescriptor {
                kind: TypeKind::Object {
                    class_name: None,
                    protocols: Vec::new(),
                },
                value: "id".into(),
                encoding: "@".into(),
                skip,
            });
        }

        if self.lookup.has_protocol(&name) {
            return Ok(TypeDescriptor {
                kind: TypeKind::Object {
                    class_name: None,
                    protocols: vec![name.clone()],
                },
                value: format!("NSObject <{name}> *"),
                encoding: "@".into(),
                skip,
            });
        }

        if let Some(target) = self.lookup.typedef(&name) {
            if typedefs.iter().any(|seen| *seen == name) {
                return Err(crate::Error::TypedefCycle(name));
            }
            typedefs.push(name.clone());
            let mut inner = Cursor::new(&target.encoding);
            let resolved = self.parse_at(&mut inner, depth + 1, typedefs)?;
            typedefs.pop();
            let value = if target.value.is_empty() {
                resolved.value
            } else {
                target.value
            };
            return Ok(TypeDescriptor {
                kind: resolved.kind,
                value,
                encoding: target.encoding,
                skip,
            });
        }

        if self.lookup.has_custom_class(&name) {
            return Ok(TypeDescriptor {
                kind: TypeKind::Object {
                    class_name: Some(name.clone()),
                    protocols: Vec::new(),
                },
                value: format!("{name} *"),
                encoding: "@".into(),
                skip,
            });
        }

        Err(crate::Error::UnresolvedReference {
            name,
            suggestions: Vec::new(),
        })
    }
}

fn simple(kind: TypeKind, value: &str, encoding: &str) -> TypeDescriptor {
    TypeDescriptor {
        kind,
        value: value.into(),
        encoding: encoding.into(),
        skip: 1,
    }
}

/// Struct tags are matched against the metabase with leading underscores
/// trimmed; `?` marks an anonymous struct.
fn struct_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start_matches('_');
    if trimmed.is_empty() || trimmed == "?" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Locate the matching close brace for the open brace at `start`.
fn find_balanced_close(cursor: &Cursor<'_>, start: usize) -> Result<usize> {
    let mut level = 1usize;
    let mut position = start + 1;
    let text = cursor.slice(0, cursor.len())?;
    for byte in text.as_bytes()[position..].iter() {
        match byte {
            b'{' => level += 1,
            b'}' => {
                level -= 1;
                if level == 0 {
                    return Ok(position);
                }
            }
            _ => {}
        }
        position += 1;
    }
    Err(malformed_error!(
        "unbalanced struct encoding starting at index {}",
        start
    ))
}

/// The `=` separating a struct tag from its fields, ignoring nested structs.
fn find_top_level_equals(span: &str) -> Option<usize> {
    let mut level = 0usize;
    for (index, byte) in span.bytes().enumerate() {
        match byte {
            b'{' => level += 1,
            b'}' => level = level.saturating_sub(1),
            b'=' if level == 1 => return Some(index),
            _ => {}
        }
    }
    None
}

/// Locate the receiver/selector marker: a top-level `@`, optional runtime
/// offset digits, then `:`. Returns the marker's start and the index just
/// past the `:`.
fn find_receiver_marker(encoding: &str) -> Option<(usize, usize)> {
    let bytes = encoding.as_bytes();
    let mut level = 0usize;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'{' | b'[' => level += 1,
            b'}' | b']' => level = level.saturating_sub(1),
            b'@' if level == 0 => {
                let mut probe = index + 1;
                while probe < bytes.len() && bytes[probe].is_ascii_digit() {
                    probe += 1;
                }
                if probe < bytes.len() && bytes[probe] == b':' {
                    return Some((index, probe + 1));
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}
