//! Class wrapper generation.
//!
//! One generated source per class: a constructor chaining to the superclass
//! wrapper, property accessors, and method wrappers, all pruned to the
//! members the reference tables mention. A property shadows a method of the
//! same name. Members are emitted in sorted order so regeneration is
//! byte-stable regardless of metabase map order.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
    codegen::context::{require_path, GenerationContext, ImportSet},
    metabase::{ClassMetadata, EncodedValue, MethodMetadata, PropertyMetadata},
    resolver::protocols::merge_protocol_members,
    Result,
};

/// A generated class wrapper, before the unused-class prune.
#[derive(Debug, Clone)]
pub struct ClassUnit {
    /// Class name
    pub name: String,
    /// Owning framework
    pub framework: String,
    /// Superclass name, when the class has one
    pub superclass: Option<String>,
    /// Classes this wrapper mentions, for import reintegration
    pub imports: ImportSet,
    /// Rendered source text
    pub contents: String,
    /// Members that survived reference pruning
    pub member_count: usize,
}

/// Generate the wrapper for one class.
///
/// # Errors
/// Propagates decoder errors for member encodings and
/// [`crate::Error::BlockNotFound`] for a block argument whose signature no
/// module declares.
pub fn generate_class(
    context: &mut GenerationContext<'_>,
    class: &ClassMetadata,
) -> Result<ClassUnit> {
    let (methods, properties) = merge_protocol_members(context.metabase, class);
    let mut imports = ImportSet::default();
    let mut member_count = 0usize;

    if let Some(superclass) = &class.superclass {
        if let Some(meta) = context.metabase.class(superclass) {
            imports.add(superclass.clone(), meta.framework.clone());
        }
    }

    // Body first; block requires surface while rendering members.
    let mut body = String::new();
    let mut block_modules: IndexMap<String, String> = IndexMap::new();

    let mut property_names: Vec<&String> = properties.keys().collect();
    property_names.sort();
    for name in property_names {
        let property = &properties[name];
        if render_property(context, class, property, &mut body, &mut imports)? {
            member_count += 1;
        }
    }

    let mut method_names: Vec<&String> = methods.keys().collect();
    method_names.sort();
    for name in method_names {
        if properties.contains_key(name) {
            // property accessors shadow the getter-shaped method
            continue;
        }
        let method = &methods[name];
        if !context.tables.is_function_referenced(&method.name) {
            continue;
        }
        render_method(
            context,
            class,
            method,
            &mut body,
            &mut imports,
            &mut block_modules,
        )?;
        member_count += 1;
    }

    let mut contents = String::new();
    let _ = writeln!(contents, "/**");
    let _ = writeln!(contents, " * {}/{}", class.framework, class.name);
    let _ = writeln!(contents, " * Generated wrapper. Do not edit.");
    let _ = writeln!(contents, " */");
    let _ = writeln!(contents, "'use strict';");
    let _ = writeln!(contents);
    let _ = writeln!(contents, "var Bridge = require('/bridge/runtime');");
    if let Some(superclass) = &class.superclass {
        if let Some(meta) = context.metabase.class(superclass) {
            let _ = writeln!(
                contents,
                "var {} = require('{}');",
                superclass,
                require_path(&meta.framework, superclass)
            );
        }
    }
    for (module, variable) in &block_modules {
        let _ = writeln!(
            contents,
            "var {} = require('{}');",
            variable,
            require_path(module, module)
        );
    }
    let _ = writeln!(contents);

    let _ = writeln!(contents, "function {}(pointer) {{", class.name);
    match class
        .superclass
        .as_ref()
        .filter(|superclass| context.metabase.class(superclass).is_some())
    {
        Some(superclass) => {
            let _ = writeln!(contents, "\t{superclass}.call(this, pointer);");
        }
        None => {
            let _ = writeln!(contents, "\tthis.$native = pointer;");
        }
    }
    let _ = writeln!(contents, "}}");
    if let Some(superclass) = class
        .superclass
        .as_ref()
        .filter(|superclass| context.metabase.class(superclass).is_some())
    {
        let _ = writeln!(
            contents,
            "{}.prototype = Object.create({}.prototype);",
            class.name, superclass
        );
        let _ = writeln!(
            contents,
            "{}.prototype.constructor = {};",
            class.name, class.name
        );
    }
    let _ = writeln!(contents, "{}.className = '{}';", class.name, class.name);
    let _ = writeln!(contents);
    contents.push_str(&body);
    let _ = writeln!(contents, "module.exports = {};", class.name);

    Ok(ClassUnit {
        name: class.name.clone(),
        framework: class.framework.clone(),
        superclass: class.superclass.clone(),
        imports,
        contents,
        member_count,
    })
}

fn render_property(
    context: &GenerationContext<'_>,
    class: &ClassMetadata,
    property: &PropertyMetadata,
    body: &mut String,
    imports: &mut ImportSet,
) -> Result<bool> {
    let wants_getter = context.tables.is_getter_referenced(&property.name);
    let wants_setter =
        context.tables.is_setter_referenced(&property.name) && !property.is_readonly();
    if !wants_getter && !wants_setter {
        return Ok(false);
    }

    record_slot_imports(
        context,
        imports,
        &EncodedValue {
            name: property.name.clone(),
            type_hint: property.type_hint.clone(),
            value: property.value.clone(),
            encoding: property.encoding.clone(),
        },
    )?;

    let (target, receiver) = if property.is_class_property() {
        (
            class.name.clone(),
            format!("Bridge.dispatchClass('{}'", class.name),
        )
    } else {
        (
            format!("{}.prototype", class.name),
            "Bridge.dispatch(this.$native".to_string(),
        )
    };

    let _ = writeln!(
        body,
        "Object.defineProperty({}, '{}', {{",
        target, property.name
    );
    if wants_getter {
        let _ = writeln!(body, "\tget: function () {{");
        let _ = writeln!(body, "\t\treturn {}, '{}');", receiver, property.name);
        let _ = writeln!(body, "\t}},");
    }
    if wants_setter {
        let setter = setter_selector(&property.name);
        let _ = writeln!(body, "\tset: function (_{}) {{", property.name);
        let _ = writeln!(
            body,
            "\t\t{}, '{}', [_{}]);",
            receiver, setter, property.name
        );
        let _ = writeln!(body, "\t}},");
    }
    let _ = writeln!(body, "\tenumerable: true");
    let _ = writeln!(body, "}});");
    let _ = writeln!(body);
    Ok(true)
}

fn render_method(
    context: &mut GenerationContext<'_>,
    class: &ClassMetadata,
    method: &MethodMetadata,
    body: &mut String,
    imports: &mut ImportSet,
    block_modules: &mut IndexMap<String, String>,
) -> Result<()> {
    let target = if method.instance {
        format!("{}.prototype.{}", class.name, method.name)
    } else {
        format!("{}.{}", class.name, method.name)
    };

    if let Some(override_impl) = &method.override_impl {
        let _ = writeln!(body, "{target} = function () {{");
        for line in override_impl.lines() {
            let _ = writeln!(body, "\t{line}");
        }
        let _ = writeln!(body, "}};");
        let _ = writeln!(body);
        return Ok(());
    }

    let framework = method
        .framework
        .clone()
        .unwrap_or_else(|| class.framework.clone());

    let mut parameters = Vec::with_capacity(method.arguments.len());
    let mut dispatch_values = Vec::with_capacity(method.arguments.len());
    let mut block_lines: Vec<String> = Vec::new();
    for (index, argument) in method.arguments.iter().enumerate() {
        let parameter = if argument.name.is_empty() {
            format!("arg{index}")
        } else {
            argument.name.clone()
        };
        record_slot_imports(context, imports, argument)?;
        if is_block_slot(argument) {
            let binding = context.require_block(&framework, &argument.value)?;
            let variable = block_modules
                .entry(binding.module.clone())
                .or_insert_with(|| format!("{}$module", binding.module))
                .clone();
            block_lines.push(format!(
                "\tvar {parameter}$block = {variable}.{}({parameter});",
                binding.symbol
            ));
            dispatch_values.push(format!("{parameter}$block"));
        } else {
            dispatch_values.push(parameter.clone());
        }
        parameters.push(parameter);
    }
    if let Some(returns) = &method.returns {
        record_slot_imports(context, imports, returns)?;
    }

    let selector = if method.selector.is_empty() {
        method.name.clone()
    } else {
        method.selector.clone()
    };

    let _ = writeln!(body, "{} = function ({}) {{", target, parameters.join(", "));
    for line in &block_lines {
        let _ = writeln!(body, "{line}");
    }
    let dispatch = if method.instance {
        format!(
            "\treturn Bridge.dispatch(this.$native, '{}', [{}]);",
            selector,
            dispatch_values.join(", ")
        )
    } else {
        format!(
            "\treturn Bridge.dispatchClass('{}', '{}', [{}]);",
            class.name,
            selector,
            dispatch_values.join(", ")
        )
    };
    let _ = writeln!(body, "{dispatch}");
    let _ = writeln!(body, "}};");
    let _ = writeln!(body);
    Ok(())
}

/// Record the classes and structs a value slot mentions.
pub(crate) fn record_slot_imports(
    context: &GenerationContext<'_>,
    imports: &mut ImportSet,
    slot: &EncodedValue,
) -> Result<()> {
    if let Some(encoding) = &slot.encoding {
        if !encoding.is_empty() {
            let descriptor = context.metabase.type_descriptor(encoding)?;
            if let Some(class_name) = descriptor.referenced_class() {
                if let Some(meta) = context.metabase.class(class_name) {
                    imports.add(class_name.to_string(), meta.framework.clone());
                }
            }
            if let Some(struct_name) = descriptor.struct_name() {
                if let Some(meta) = context.metabase.strukt(struct_name) {
                    imports.add(meta.name.clone(), meta.framework.clone());
                }
            }
        }
    }
    if matches!(
        slot.type_hint.as_str(),
        "objc_interface" | "obj_interface" | "objc_pointer" | "id"
    ) {
        let spelled = slot.value.replace('*', "");
        let spelled = spelled.trim();
        if let Some(meta) = context.metabase.class(spelled) {
            imports.add(spelled.to_string(), meta.framework.clone());
        }
    }
    Ok(())
}

pub(crate) fn is_block_slot(slot: &EncodedValue) -> bool {
    slot.type_hint == "block" || slot.encoding.as_deref() == Some("@?")
}

fn setter_selector(property: &str) -> String {
    let mut characters = property.chars();
    match characters.next() {
        Some(first) => format!(
            "set{}{}:",
            first.to_uppercase(),
            characters.as_str()
        ),
        None => "set:".to_string(),
    }
}
