//! Block-callback marshaling, planned as a small IR before rendering.
//!
//! A script function handed to a native block argument needs an intermediary:
//! unwrap each native argument into a script value, hop to the main context
//! (the script engine is single-threaded), invoke the function, and wrap a
//! result back when the block returns a value. Planning the steps separately
//! from rendering keeps the dispatch semantics testable without string
//! matching.
//!
//! The hop is synchronous only when the block returns a value the native
//! caller is waiting for; fire-and-forget blocks dispatch asynchronously so a
//! background thread never blocks on the script engine.

use std::fmt::Write;

use crate::codegen::context::block_symbol;
use crate::metabase::BlockMetadata;

/// One step of the intermediary callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalStep {
    /// Unwrap native argument `index` into a script value
    UnwrapArgument {
        /// Argument position
        index: usize,
    },
    /// Define the invocation closure over the unwrapped arguments
    InvokeCallback {
        /// How many unwrapped arguments to pass
        arguments: usize,
    },
    /// Dispatch the invocation on the main context
    MainContextHop {
        /// Block the native caller until the invocation returns
        sync: bool,
    },
    /// Wrap the invocation result back into a native value
    WrapResult,
}

/// The marshal plan for one block signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    /// Block signature being wrapped
    pub signature: String,
    /// Exported wrapper symbol
    pub symbol: String,
    /// Number of non-void block arguments
    pub arguments: usize,
    /// Steps in execution order
    pub steps: Vec<MarshalStep>,
}

impl BlockPlan {
    /// `true` when the plan blocks the native caller for a result.
    #[must_use]
    pub fn is_sync(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, MarshalStep::MainContextHop { sync: true }))
    }
}

/// Plan the intermediary callback for `block`.
#[must_use]
pub fn plan_block(block: &BlockMetadata) -> BlockPlan {
    let arguments = block
        .arguments
        .iter()
        .filter(|argument| argument.type_hint != "void")
        .count();
    let sync = block
        .returns
        .as_ref()
        .is_some_and(|returns| returns.type_hint != "void" && !returns.type_hint.is_empty());

    let mut steps = Vec::with_capacity(arguments + 3);
    for index in 0..arguments {
        steps.push(MarshalStep::UnwrapArgument { index });
    }
    steps.push(MarshalStep::InvokeCallback { arguments });
    steps.push(MarshalStep::MainContextHop { sync });
    if sync {
        steps.push(MarshalStep::WrapResult);
    }

    BlockPlan {
        signature: block.signature.clone(),
        symbol: block_symbol(&block.signature),
        arguments,
        steps,
    }
}

/// Render the plan as an exported wrapper function.
#[must_use]
pub fn render_block(plan: &BlockPlan) -> String {
    let mut code = String::new();
    let parameters = (0..plan.arguments)
        .map(|index| format!("arg{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(code, "exports.{} = function (callback) {{", plan.symbol);
    let _ = writeln!(
        code,
        "\treturn Bridge.createBlock('{}', function ({}) {{",
        plan.signature, parameters
    );
    for step in &plan.steps {
        match step {
            MarshalStep::UnwrapArgument { index } => {
                let _ = writeln!(code, "\t\tvar _arg{index} = Bridge.wrap(arg{index});");
            }
            MarshalStep::InvokeCallback { arguments } => {
                let unwrapped = (0..*arguments)
                    .map(|index| format!("_arg{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(code, "\t\tvar invoke = function () {{");
                let _ = writeln!(code, "\t\t\treturn callback({unwrapped});");
                let _ = writeln!(code, "\t\t}};");
            }
            MarshalStep::MainContextHop { sync: true } => {
                let _ = writeln!(code, "\t\tvar result = Bridge.callOnMainContext(invoke, true);");
            }
            MarshalStep::MainContextHop { sync: false } => {
                let _ = writeln!(code, "\t\tBridge.callOnMainContext(invoke, false);");
            }
            MarshalStep::WrapResult => {
                let _ = writeln!(code, "\t\treturn Bridge.unwrap(result);");
            }
        }
    }
    let _ = writeln!(code, "\t}});");
    let _ = writeln!(code, "}};");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabase::EncodedValue;

    fn block(signature: &str, argument_hints: &[&str], return_hint: Option<&str>) -> BlockMetadata {
        BlockMetadata {
            signature: signature.to_string(),
            arguments: argument_hints
                .iter()
                .map(|hint| EncodedValue {
                    type_hint: (*hint).to_string(),
                    ..EncodedValue::default()
                })
                .collect(),
            returns: return_hint.map(|hint| EncodedValue {
                type_hint: hint.to_string(),
                ..EncodedValue::default()
            }),
            framework: None,
        }
    }

    #[test]
    fn test_fire_and_forget_plan_is_async() {
        let plan = plan_block(&block("void (^)(BOOL)", &["bool"], Some("void")));
        assert_eq!(plan.arguments, 1);
        assert!(!plan.is_sync());
        assert_eq!(
            plan.steps.last(),
            Some(&MarshalStep::MainContextHop { sync: false })
        );
    }

    #[test]
    fn test_value_returning_plan_is_sync_and_wraps() {
        let plan = plan_block(&block("BOOL (^)(id)", &["id"], Some("bool")));
        assert!(plan.is_sync());
        assert_eq!(plan.steps.last(), Some(&MarshalStep::WrapResult));
    }

    #[test]
    fn test_void_arguments_are_skipped() {
        let plan = plan_block(&block("void (^)(void)", &["void"], Some("void")));
        assert_eq!(plan.arguments, 0);
        assert_eq!(
            plan.steps.first(),
            Some(&MarshalStep::InvokeCallback { arguments: 0 })
        );
    }

    #[test]
    fn test_render_async_block() {
        let plan = plan_block(&block("void (^)(NSError *)", &["objc_interface"], None));
        let code = render_block(&plan);
        assert!(code.contains("exports.Block_void_____NSError___"));
        assert!(code.contains("var _arg0 = Bridge.wrap(arg0);"));
        assert!(code.contains("Bridge.callOnMainContext(invoke, false);"));
        assert!(!code.contains("Bridge.unwrap(result)"));
    }

    #[test]
    fn test_render_sync_block() {
        let plan = plan_block(&block("BOOL (^)(void)", &[], Some("bool")));
        let code = render_block(&plan);
        assert!(code.contains("var result = Bridge.callOnMainContext(invoke, true);"));
        assert!(code.contains("return Bridge.unwrap(result);"));
    }
}
