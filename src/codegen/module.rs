//! Module wrapper generation.
//!
//! Free functions, constant variables, enum constants and block wrappers have
//! no owning class; they are grouped per framework into a module file. When a
//! class shares the module's name, the module body is appended to the class
//! file as a fragment instead of getting a file of its own, so `UIKit.UIView`
//! and the `UIKit` module resolve from one require each.
//!
//! Variadic functions have no fixed arity to dispatch with, so their wrappers
//! pad the declared arguments out to a fixed maximum.

use std::fmt::Write;

use crate::{
    codegen::{block::wrappers_for_module, context::GenerationContext},
    metabase::{EnumMetadata, FunctionMetadata, VarMetadata},
    Result,
};

/// Highest total argument count a variadic wrapper accepts.
pub const MAX_VARIADIC_ARGUMENTS: usize = 10;

/// A generated module, ready to stand alone or be appended to a class file.
#[derive(Debug, Clone)]
pub struct ModuleUnit {
    /// Module name, same as the framework
    pub name: String,
    /// Owning framework
    pub framework: String,
    /// The exports body, without file header or requires
    pub fragment: String,
    /// Members that survived reference pruning, block wrappers included
    pub member_count: usize,
}

impl ModuleUnit {
    /// Render the module as a standalone source file.
    #[must_use]
    pub fn standalone_contents(&self) -> String {
        let mut contents = String::new();
        let _ = writeln!(contents, "/**");
        let _ = writeln!(contents, " * {} module", self.framework);
        let _ = writeln!(contents, " * Generated wrapper. Do not edit.");
        let _ = writeln!(contents, " */");
        let _ = writeln!(contents, "'use strict';");
        let _ = writeln!(contents);
        let _ = writeln!(contents, "var Bridge = require('/bridge/runtime');");
        let _ = writeln!(contents);
        let _ = writeln!(contents, "module.exports = {{}};");
        let _ = writeln!(contents);
        contents.push_str(&self.fragment);
        contents
    }

    /// Render the module as a fragment appended to the same-named class file.
    /// The class file already requires the runtime; only the exports body
    /// follows.
    #[must_use]
    pub fn merged_contents(&self) -> String {
        let mut contents = String::new();
        let _ = writeln!(contents);
        contents.push_str(&self.fragment);
        contents
    }

    /// `true` when pruning left nothing to emit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member_count == 0
    }
}

/// Generate the module wrapper for one framework from the closure members
/// that landed in it. Call after class generation so block wrappers the
/// classes registered are picked up.
///
/// # Errors
/// Propagates [`crate::Error::BlockNotFound`] for function block arguments
/// with no matching descriptor.
pub fn generate_module(
    context: &mut GenerationContext<'_>,
    framework: &str,
    functions: &[&FunctionMetadata],
    vars: &[&VarMetadata],
    enums: &[&EnumMetadata],
) -> Result<ModuleUnit> {
    let mut body = String::new();
    let mut member_count = 0usize;

    for function in functions {
        // double-underscore names are private runtime plumbing
        if function.name.starts_with("__") {
            continue;
        }
        if !context.tables.is_function_referenced(&function.name) {
            continue;
        }
        render_function(context, framework, function, &mut body)?;
        member_count += 1;
    }

    for var in vars {
        if !context.tables.is_getter_referenced(&var.name)
            && !context.tables.is_setter_referenced(&var.name)
        {
            continue;
        }
        let _ = writeln!(
            body,
            "\tObject.defineProperty(exports, '{}', {{",
            var.name
        );
        let _ = writeln!(body, "\t\tget: function () {{");
        let _ = writeln!(
            body,
            "\t\t\treturn Bridge.constant('{}', '{}');",
            framework, var.name
        );
        let _ = writeln!(body, "\t\t}},");
        let _ = writeln!(body, "\t\tenumerable: true");
        let _ = writeln!(body, "\t}});");
        let _ = writeln!(body);
        member_count += 1;
    }

    for enumeration in enums {
        for (constant, value) in &enumeration.values {
            if !context.tables.is_getter_referenced(constant) {
                continue;
            }
            let _ = writeln!(body, "\texports.{constant} = {value};");
            member_count += 1;
        }
    }

    // block wrappers registered while rendering classes and the functions
    // above
    let wrappers = wrappers_for_module(context, framework);
    for rendered in &wrappers.rendered {
        for line in rendered.lines() {
            let _ = writeln!(body, "\t{line}");
        }
        let _ = writeln!(body);
    }
    member_count += wrappers.len();

    let mut fragment = String::new();
    let _ = writeln!(fragment, "(function (exports) {{");
    fragment.push_str(&body);
    let _ = writeln!(fragment, "}})(module.exports);");

    Ok(ModuleUnit {
        name: framework.to_string(),
        framework: framework.to_string(),
        fragment,
        member_count,
    })
}

fn render_function(
    context: &mut GenerationContext<'_>,
    framework: &str,
    function: &FunctionMetadata,
    body: &mut String,
) -> Result<()> {
    let mut parameters = Vec::new();
    let mut dispatch_values = Vec::new();
    let mut block_lines = Vec::new();

    for (index, argument) in function.arguments.iter().enumerate() {
        let parameter = if argument.name.is_empty() {
            format!("arg{index}")
        } else {
            argument.name.clone()
        };
        if crate::codegen::class::is_block_slot(argument) {
            let binding = context.require_block(framework, &argument.value)?;
            block_lines.push(format!(
                "\t\tvar {parameter}$block = exports.{}({parameter});",
                binding.symbol
            ));
            dispatch_values.push(format!("{parameter}$block"));
        } else {
            dispatch_values.push(parameter.clone());
        }
        parameters.push(parameter);
    }
    if function.variadic {
        for index in parameters.len()..MAX_VARIADIC_ARGUMENTS {
            let parameter = format!("arg{index}");
            dispatch_values.push(parameter.clone());
            parameters.push(parameter);
        }
    }

    let _ = writeln!(
        body,
        "\texports.{} = function ({}) {{",
        function.name,
        parameters.join(", ")
    );
    for line in &block_lines {
        let _ = writeln!(body, "{line}");
    }
    let _ = writeln!(
        body,
        "\t\treturn Bridge.invoke('{}', '{}', [{}]);",
        framework,
        function.name,
        dispatch_values.join(", ")
    );
    let _ = writeln!(body, "\t}};");
    let _ = writeln!(body);
    Ok(())
}
