//! Input text -> optional transpile -> optional minify -> output text.
//!
//! Transpile always runs before minify: minifying type-annotated source is
//! invalid, and that failure has to reach the user rather than be hidden by
//! reordering.

use crate::capability::{Minifier, Stage, TransformError, TranspileOptions, Transpiler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A non-fatal problem reported by a step that fell back to its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

impl From<TransformError> for Diagnostic {
    fn from(err: TransformError) -> Self {
        Self {
            stage: err.stage,
            message: err.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineOutput {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineOutput {
    /// UTF-8 encoded length of the output.
    pub fn byte_count(&self) -> usize {
        self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Minify(TransformError),
}

/// A step runs only when it is enabled and its module is present.
pub fn compute(
    input: &str,
    transpile_enabled: bool,
    transpiler: Option<&dyn Transpiler>,
    minify_enabled: bool,
    minifier: Option<&dyn Minifier>,
) -> Result<PipelineOutput, PipelineError> {
    let mut current = input.to_string();
    let mut diagnostics = Vec::new();

    if let Some(transpiler) = transpiler.filter(|_| transpile_enabled) {
        match transpiler.transpile(&current, &TranspileOptions::default()) {
            Ok(text) => current = text,
            Err(err) => {
                tracing::warn!(error = %err, "transpile step fell back to its input");
                diagnostics.push(Diagnostic::from(err));
            }
        }
    }

    if let Some(minifier) = minifier.filter(|_| minify_enabled) {
        current = minifier.minify(&current).map_err(PipelineError::Minify)?;
    }

    Ok(PipelineOutput {
        text: current,
        diagnostics,
    })
}

/// Owned snapshot of everything one recomputation needs, tagged with the
/// revision it was scheduled for. Only active modules are carried.
#[derive(Clone)]
pub struct PipelineJob {
    pub revision: u64,
    pub input: String,
    pub transpiler: Option<Arc<dyn Transpiler>>,
    pub minifier: Option<Arc<dyn Minifier>>,
}

impl PipelineJob {
    pub fn run(&self) -> Result<PipelineOutput, PipelineError> {
        compute(
            &self.input,
            true,
            self.transpiler.as_deref(),
            true,
            self.minifier.as_deref(),
        )
    }
}

impl std::fmt::Debug for PipelineJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineJob")
            .field("revision", &self.revision)
            .field("input_bytes", &self.input.len())
            .field("transpile", &self.transpiler.is_some())
            .field("minify", &self.minifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drops `: type` annotations up to the next `=`, `,` or `)`.
    struct StripTypes;

    impl Transpiler for StripTypes {
        fn transpile(
            &self,
            source: &str,
            _options: &TranspileOptions,
        ) -> Result<String, TransformError> {
            if source.contains("@@") {
                return Err(TransformError::new(Stage::Transpile, "unexpected token"));
            }
            let mut out = String::new();
            let mut skipping = false;
            for ch in source.chars() {
                match ch {
                    ':' => skipping = true,
                    '=' | ',' | ')' if skipping => {
                        skipping = false;
                        out.push(' ');
                        out.push(ch);
                    }
                    _ if skipping => {}
                    _ => out.push(ch),
                }
            }
            Ok(out.split_whitespace().collect::<Vec<_>>().join(" "))
        }
    }

    struct Squash;

    impl Minifier for Squash {
        fn minify(&self, source: &str) -> Result<String, TransformError> {
            if source.contains(':') {
                return Err(TransformError::new(Stage::Minify, "unexpected ':'"));
            }
            Ok(source.split_whitespace().collect())
        }
    }

    #[test]
    fn identity_when_both_steps_disabled() {
        for text in ["", "const x: number = 1", "héllo wörld ✓", "  spaced  "] {
            let out = compute(text, false, Some(&StripTypes), false, Some(&Squash)).unwrap();
            assert_eq!(out.text, text);
            assert!(out.diagnostics.is_empty());
        }
    }

    #[test]
    fn enabled_step_without_module_passes_through() {
        let out = compute("let a = 1", true, None, true, None).unwrap();
        assert_eq!(out.text, "let a = 1");
    }

    #[test]
    fn transpile_runs_before_minify() {
        let out = compute(
            "const x: number = 1",
            true,
            Some(&StripTypes),
            true,
            Some(&Squash),
        )
        .unwrap();
        assert_eq!(out.text, "constx=1");
    }

    #[test]
    fn minifying_type_annotations_is_an_error() {
        let err = compute("const x: number = 1", false, None, true, Some(&Squash)).unwrap_err();
        let PipelineError::Minify(inner) = err;
        assert_eq!(inner.stage, Stage::Minify);
    }

    #[test]
    fn transpile_failure_is_reported_and_falls_back() {
        let out = compute("let @@ = 1", true, Some(&StripTypes), false, None).unwrap();
        assert_eq!(out.text, "let @@ = 1");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].stage, Stage::Transpile);
    }

    #[test]
    fn byte_count_is_utf8_length() {
        let out = compute("é✓", false, None, false, None).unwrap();
        assert_eq!(out.byte_count(), 5);
        assert_eq!(out.text.chars().count(), 2);
    }

    #[test]
    fn job_is_idempotent() {
        let job = PipelineJob {
            revision: 3,
            input: "const x: number = 1".to_string(),
            transpiler: Some(Arc::new(StripTypes)),
            minifier: None,
        };
        let first = job.run().unwrap();
        let second = job.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.text, "const x = 1");
    }
}
