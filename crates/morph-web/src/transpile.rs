//! TypeScript/JSX transpiler built on the oxc toolchain.

use morph_core::{EsTarget, JsxRuntimeKind, Stage, TransformError, TranspileOptions, Transpiler};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxRuntime, TransformOptions, Transformer};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct OxcTranspiler;

impl OxcTranspiler {
    pub fn new() -> Self {
        Self
    }
}

fn transform_options(options: &TranspileOptions) -> Result<TransformOptions, TransformError> {
    let mut transform = match options.target {
        EsTarget::EsNext => TransformOptions::default(),
        target => TransformOptions::from_target(target.as_str())
            .map_err(|err| TransformError::new(Stage::Transpile, format!("{err:?}")))?,
    };
    transform.jsx.runtime = match options.jsx {
        JsxRuntimeKind::Classic => JsxRuntime::Classic,
        JsxRuntimeKind::Automatic => JsxRuntime::Automatic,
    };
    Ok(transform)
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl Transpiler for OxcTranspiler {
    fn transpile(
        &self,
        source: &str,
        options: &TranspileOptions,
    ) -> Result<String, TransformError> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, SourceType::tsx()).parse();
        if parsed.panicked || !parsed.errors.is_empty() {
            return Err(TransformError::new(Stage::Transpile, join_errors(&parsed.errors)));
        }
        let mut program = parsed.program;

        let (symbols, scopes) = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_symbol_table_and_scope_tree();

        let transform = transform_options(options)?;
        let transformed = Transformer::new(&allocator, Path::new("input.tsx"), &transform)
            .build_with_symbols_and_scopes(symbols, scopes, &mut program);
        if !transformed.errors.is_empty() {
            return Err(TransformError::new(Stage::Transpile, join_errors(&transformed.errors)));
        }

        Ok(Codegen::new().build(&program).code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transpile(source: &str) -> Result<String, TransformError> {
        OxcTranspiler.transpile(source, &TranspileOptions::default())
    }

    #[test]
    fn strips_type_annotations() {
        let out = transpile("const x: number = 1").unwrap();
        assert!(out.contains("const x = 1"), "got {out}");
        assert!(!out.contains(": number"));
    }

    #[test]
    fn removes_interfaces() {
        let out = transpile("interface Point { x: number }\nlet p = 1;").unwrap();
        assert!(!out.contains("interface"));
        assert!(out.contains("let p = 1"));
    }

    #[test]
    fn lowers_jsx_to_create_element() {
        let out = transpile("const el = <div className=\"a\">hi</div>;").unwrap();
        assert!(out.contains("React.createElement"), "got {out}");
        assert!(!out.contains("<div"));
    }

    #[test]
    fn syntax_error_is_a_transpile_failure() {
        let err = transpile("const = ;").unwrap_err();
        assert_eq!(err.stage, Stage::Transpile);
        assert!(!err.message.is_empty());
    }
}
