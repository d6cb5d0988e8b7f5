//! Struct wrapper generation.
//!
//! Struct instances live behind an opaque native pointer; field access goes
//! through indexed dispatch (`valueAtIndex:` / `setValue:atIndex:`). Top-level
//! fields address their declaration index. Fields that are themselves structs
//! get a nested accessor object whose subfields address a flat index counter
//! shared by every nested field of the wrapper, matching how the runtime lays
//! the flattened values out.

use std::fmt::Write;

use crate::{
    codegen::context::GenerationContext,
    metabase::{StructField, StructMetadata},
    Result,
};

/// A generated struct wrapper.
#[derive(Debug, Clone)]
pub struct StructUnit {
    /// Struct name
    pub name: String,
    /// Owning framework
    pub framework: String,
    /// Rendered source text
    pub contents: String,
}

/// Generate the wrapper for one struct. Structs are never pruned by
/// reference tables; a struct mentioned anywhere gets its full field set.
///
/// # Errors
/// Propagates decoder errors for malformed field encodings.
pub fn generate_struct(
    context: &GenerationContext<'_>,
    strukt: &StructMetadata,
) -> Result<StructUnit> {
    let mut constructor = String::new();
    let mut accessors = String::new();
    let mut encoding = format!("{{{}=", strukt.name);

    // flat slot counter shared across all nested-struct subfields
    let mut flat_index = 0usize;
    for (index, field) in strukt.fields.iter().enumerate() {
        encoding.push_str(&field.encoding);
        if is_struct_field(field) {
            let subfields = subfield_names(context, field)?;
            render_nested_field(field, &subfields, &mut flat_index, &mut constructor);
            render_nested_accessor(&strukt.name, field, &subfields, &mut accessors);
        } else {
            render_plain_accessor(&strukt.name, field, index, &mut accessors);
        }
    }
    encoding.push('}');

    let mut contents = String::new();
    let _ = writeln!(contents, "/**");
    let _ = writeln!(contents, " * {}/{}", strukt.framework, strukt.name);
    let _ = writeln!(contents, " * Generated wrapper. Do not edit.");
    let _ = writeln!(contents, " */");
    let _ = writeln!(contents, "'use strict';");
    let _ = writeln!(contents);
    let _ = writeln!(contents, "var Bridge = require('/bridge/runtime');");
    let _ = writeln!(contents);
    let _ = writeln!(contents, "function {}(pointer) {{", strukt.name);
    let _ = writeln!(contents, "\tthis.$native = pointer;");
    contents.push_str(&constructor);
    let _ = writeln!(contents, "}}");
    let _ = writeln!(contents, "{}.className = '{}';", strukt.name, strukt.name);
    let _ = writeln!(contents, "{}.$encoding = '{}';", strukt.name, encoding);
    let _ = writeln!(contents);
    contents.push_str(&accessors);
    let _ = writeln!(contents, "module.exports = {};", strukt.name);

    Ok(StructUnit {
        name: strukt.name.clone(),
        framework: strukt.framework.clone(),
        contents,
    })
}

/// Subfield names for a nested struct field: the named struct's own fields
/// when the metabase knows it, otherwise one synthetic `fN` per flattened
/// encoding character.
fn subfield_names(context: &GenerationContext<'_>, field: &StructField) -> Result<Vec<String>> {
    let descriptor = context.metabase.type_descriptor(&field.encoding)?;
    if let Some(name) = descriptor.struct_name() {
        if let Some(other) = context.metabase.strukt(name) {
            return Ok(other
                .fields
                .iter()
                .map(|subfield| subfield.name.clone())
                .collect());
        }
    }
    let flattened = flatten_struct(&field.encoding);
    Ok((0..flattened.len()).map(|c| format!("f{c}")).collect())
}

fn render_nested_field(
    field: &StructField,
    subfields: &[String],
    flat_index: &mut usize,
    constructor: &mut String,
) {
    let _ = writeln!(constructor, "\tthis.${} = {{}};", field.name);
    for subfield in subfields {
        let index = *flat_index;
        let _ = writeln!(
            constructor,
            "\tObject.defineProperty(this.${}, '{}', {{",
            field.name, subfield
        );
        let _ = writeln!(constructor, "\t\tget: function () {{");
        let _ = writeln!(
            constructor,
            "\t\t\treturn Bridge.dispatch(pointer, 'valueAtIndex:', [{index}]);"
        );
        let _ = writeln!(constructor, "\t\t}},");
        let _ = writeln!(constructor, "\t\tset: function (_value) {{");
        let _ = writeln!(
            constructor,
            "\t\t\tBridge.dispatch(pointer, 'setValue:atIndex:', [_value, {index}]);"
        );
        let _ = writeln!(constructor, "\t\t}}");
        let _ = writeln!(constructor, "\t}});");
        *flat_index += 1;
    }
}

fn render_nested_accessor(
    struct_name: &str,
    field: &StructField,
    subfields: &[String],
    accessors: &mut String,
) {
    let _ = writeln!(
        accessors,
        "Object.defineProperty({}.prototype, '{}', {{",
        struct_name, field.name
    );
    let _ = writeln!(accessors, "\tget: function () {{");
    let _ = writeln!(accessors, "\t\treturn this.${};", field.name);
    let _ = writeln!(accessors, "\t}},");
    let _ = writeln!(accessors, "\tset: function (_{}) {{", field.name);
    for subfield in subfields {
        let _ = writeln!(
            accessors,
            "\t\tthis.${}.{} = _{}.{};",
            field.name, subfield, field.name, subfield
        );
    }
    let _ = writeln!(accessors, "\t}},");
    let _ = writeln!(accessors, "\tenumerable: true");
    let _ = writeln!(accessors, "}});");
    let _ = writeln!(accessors);
}

fn render_plain_accessor(
    struct_name: &str,
    field: &StructField,
    index: usize,
    accessors: &mut String,
) {
    let _ = writeln!(
        accessors,
        "Object.defineProperty({}.prototype, '{}', {{",
        struct_name, field.name
    );
    let _ = writeln!(accessors, "\tget: function () {{");
    let _ = writeln!(
        accessors,
        "\t\treturn Bridge.dispatch(this.$native, 'valueAtIndex:', [{index}]);"
    );
    let _ = writeln!(accessors, "\t}},");
    let _ = writeln!(accessors, "\tset: function (_{}) {{", field.name);
    let _ = writeln!(
        accessors,
        "\t\tBridge.dispatch(this.$native, 'setValue:atIndex:', [_{}, {index}]);",
        field.name
    );
    let _ = writeln!(accessors, "\t}},");
    let _ = writeln!(accessors, "\tenumerable: true");
    let _ = writeln!(accessors, "}});");
    let _ = writeln!(accessors);
}

fn is_struct_field(field: &StructField) -> bool {
    field.encoding.starts_with('{') || field.type_hint == "struct"
}

/// Reduce a struct encoding to the bare encoding characters of its leaf
/// fields. `{CGRect={CGPoint=dd}{CGSize=dd}}` flattens to `dddd`.
fn flatten_struct(encoding: &str) -> String {
    let bytes = encoding.as_bytes();
    let mut flattened = String::new();
    let mut position = 0;
    while position < bytes.len() {
        match bytes[position] {
            b'{' => {
                // a named span carries `tag=` right after the brace; an
                // anonymous one goes straight to its fields
                let mut cursor = position + 1;
                while cursor < bytes.len() && !matches!(bytes[cursor], b'=' | b'{' | b'}') {
                    cursor += 1;
                }
                position = if cursor < bytes.len() && bytes[cursor] == b'=' {
                    cursor + 1
                } else {
                    position + 1
                };
            }
            b'}' => position += 1,
            b'"' => {
                // quoted field name
                position += 1;
                while position < bytes.len() && bytes[position] != b'"' {
                    position += 1;
                }
                position += 1;
            }
            code => {
                flattened.push(char::from(code));
                position += 1;
            }
        }
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabase::Metabase;
    use crate::references::ReferenceMap;

    fn graphics() -> Metabase {
        Metabase::from_json(
            r#"{
                "structs": {
                    "CGPoint": { "name": "CGPoint", "framework": "CoreGraphics",
                        "fields": [ { "name": "x", "encoding": "d" }, { "name": "y", "encoding": "d" } ] },
                    "CGRect": { "name": "CGRect", "framework": "CoreGraphics",
                        "fields": [ { "name": "origin", "encoding": "{CGPoint=dd}" },
                                    { "name": "size", "encoding": "{CGSize=dd}" } ] }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_struct() {
        assert_eq!(flatten_struct("{CGPoint=dd}"), "dd");
        assert_eq!(flatten_struct("{CGRect={CGPoint=dd}{CGSize=dd}}"), "dddd");
        assert_eq!(flatten_struct("{dd}"), "dd");
        assert_eq!(flatten_struct("{?=iq}"), "iq");
        // sibling nested spans must both contribute their leaves
        assert_eq!(
            flatten_struct("{CGRect={CGPoint=\"x\"d\"y\"d}{CGSize=dd}}"),
            "dddd"
        );
        assert_eq!(flatten_struct("{Outer={Inner=ii}d}"), "iid");
    }

    #[test]
    fn test_plain_fields_use_declaration_index() {
        let metabase = graphics();
        let context = GenerationContext::new(&metabase, ReferenceMap::new().member_tables());
        let unit = generate_struct(&context, metabase.strukt("CGPoint").unwrap()).unwrap();

        assert!(unit
            .contents
            .contains("return Bridge.dispatch(this.$native, 'valueAtIndex:', [0]);"));
        assert!(unit
            .contents
            .contains("Bridge.dispatch(this.$native, 'setValue:atIndex:', [_y, 1]);"));
        assert!(unit
            .contents
            .contains("CGPoint.$encoding = '{CGPoint=dd}';"));
    }

    #[test]
    fn test_nested_fields_share_flat_counter() {
        let metabase = graphics();
        let context = GenerationContext::new(&metabase, ReferenceMap::new().member_tables());
        let unit = generate_struct(&context, metabase.strukt("CGRect").unwrap()).unwrap();

        // origin.x/.y take slots 0 and 1, size's synthetic fields continue at 2
        assert!(unit
            .contents
            .contains("Bridge.dispatch(pointer, 'valueAtIndex:', [1]);"));
        assert!(unit
            .contents
            .contains("Bridge.dispatch(pointer, 'valueAtIndex:', [2]);"));
        // CGSize is not in the metabase, so its subfields are synthesized
        assert!(unit.contents.contains("this.$size.f0 = _size.f0;"));
        assert!(unit.contents.contains("this.$origin.y = _origin.y;"));
        assert!(unit.contents.contains(
            "CGRect.$encoding = '{CGRect={CGPoint=dd}{CGSize=dd}}';"
        ));
    }

    #[test]
    fn test_unknown_nested_struct_with_sibling_spans_keeps_every_leaf() {
        // CGRect is absent from this metabase, so its four leaves must all be
        // synthesized or the shared counter drifts for every later field
        let metabase = Metabase::from_json(
            r#"{
                "structs": {
                    "CAShadow": { "name": "CAShadow", "framework": "QuartzCore",
                        "fields": [ { "name": "bounds", "encoding": "{CGRect={CGPoint=dd}{CGSize=dd}}" },
                                    { "name": "offset", "encoding": "{CGPoint=dd}" } ] }
                }
            }"#,
        )
        .unwrap();
        let context = GenerationContext::new(&metabase, ReferenceMap::new().member_tables());
        let unit = generate_struct(&context, metabase.strukt("CAShadow").unwrap()).unwrap();

        assert!(unit.contents.contains("this.$bounds.f3 = _bounds.f3;"));
        assert!(!unit.contents.contains("this.$bounds.f4"));
        // offset's subfields continue at slot 4
        assert!(unit
            .contents
            .contains("Bridge.dispatch(pointer, 'valueAtIndex:', [4]);"));
    }
}
