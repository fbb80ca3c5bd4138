//! Capability contracts for the third-party transforms the playground consumes.
//!
//! Each capability is an opaque handle with a single text-to-text operation.
//! The session never sees how a capability is implemented; it only holds
//! `Arc<dyn ...>` handles once the module loader has produced them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stage of the transform chain a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transpile,
    Minify,
    Highlight,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Transpile => "transpile",
            Stage::Minify => "minify",
            Stage::Highlight => "highlight",
        })
    }
}

/// A capability rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed: {message}")]
pub struct TransformError {
    pub stage: Stage,
    pub message: String,
}

impl TransformError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// ECMAScript level the transpiler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsTarget {
    Es2015,
    Es2020,
    #[default]
    EsNext,
}

impl EsTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            EsTarget::Es2015 => "es2015",
            EsTarget::Es2020 => "es2020",
            EsTarget::EsNext => "esnext",
        }
    }
}

/// How JSX is lowered. `Classic` emits `React.createElement` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsxRuntimeKind {
    #[default]
    Classic,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranspileOptions {
    pub target: EsTarget,
    pub jsx: JsxRuntimeKind,
}

pub trait Transpiler: Send + Sync {
    fn transpile(&self, source: &str, options: &TranspileOptions) -> Result<String, TransformError>;
}

pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String, TransformError>;
}

/// Turns source text into HTML markup. Implementations must escape the
/// text content so the result can be embedded verbatim.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, source: &str, lang: &str) -> Result<String, TransformError>;
}

/// Identifier the module loader keys its cache by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleId {
    Transpiler,
    Minifier,
    Highlighter,
}

impl ModuleId {
    pub const ALL: [ModuleId; 3] =
        [ModuleId::Transpiler, ModuleId::Minifier, ModuleId::Highlighter];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::Transpiler => "transpiler",
            ModuleId::Minifier => "minifier",
            ModuleId::Highlighter => "highlighter",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded module.
#[derive(Clone)]
pub enum Capability {
    Transpiler(Arc<dyn Transpiler>),
    Minifier(Arc<dyn Minifier>),
    Highlighter(Arc<dyn Highlighter>),
}

impl Capability {
    pub fn module_id(&self) -> ModuleId {
        match self {
            Capability::Transpiler(_) => ModuleId::Transpiler,
            Capability::Minifier(_) => ModuleId::Minifier,
            Capability::Highlighter(_) => ModuleId::Highlighter,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.module_id()).finish()
    }
}
