//! Core of the morph playground: capability contracts, the module loader,
//! the transform pipeline and the reducer-driven session.

pub mod capability;
pub mod loader;
pub mod pipeline;
pub mod session;
pub mod state;

pub use capability::{
    Capability, EsTarget, Highlighter, JsxRuntimeKind, Minifier, ModuleId, Stage, TransformError,
    TranspileOptions, Transpiler,
};
pub use loader::{Acquire, LoadError, LoadResult, ModuleLoader, ModuleSource};
pub use pipeline::{Diagnostic, PipelineError, PipelineJob, PipelineOutput, compute};
pub use session::{Session, SessionClosed, SessionHandle};
pub use state::{Action, Effect, SessionState, Transition, reduce};
