//! Session state and the pure reducer that drives it.
//!
//! `reduce` never mutates: it returns the next state together with the
//! effects the driver has to carry out. Every action has a defined outcome;
//! actions that change nothing return the current state with no effects.
//!
//! Recomputation is scheduled only when the input text, a toggle, or a
//! transform module actually changes. Each scheduled recomputation bumps
//! `revision`; results computed for an older revision are discarded when
//! they arrive, whatever order they complete in.

use crate::capability::{Capability, Highlighter, Minifier, ModuleId, Transpiler};
use crate::pipeline::{Diagnostic, PipelineJob, PipelineOutput};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Action {
    ChangeInput(String),
    ToggleTranspile(bool),
    ToggleMinify(bool),
    ModuleLoaded(Capability),
    ModuleFailed { module: ModuleId, message: String },
    OutputComputed { revision: u64, output: PipelineOutput },
    ComputeFailed { revision: u64, message: String },
}

#[derive(Debug, Clone)]
pub enum Effect {
    Acquire(ModuleId),
    Recompute(PipelineJob),
    Render,
}

#[derive(Clone, Default)]
pub struct SessionState {
    input_text: String,
    output_text: String,
    transpile_enabled: bool,
    minify_enabled: bool,
    transpiler: Option<Arc<dyn Transpiler>>,
    minifier: Option<Arc<dyn Minifier>>,
    highlighter: Option<Arc<dyn Highlighter>>,
    revision: u64,
    diagnostics: Vec<Diagnostic>,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn output_text(&self) -> &str {
        &self.output_text
    }

    /// Size of the output in bytes (UTF-8), not characters.
    pub fn byte_count(&self) -> usize {
        self.output_text.len()
    }

    pub fn transpile_enabled(&self) -> bool {
        self.transpile_enabled
    }

    pub fn minify_enabled(&self) -> bool {
        self.minify_enabled
    }

    pub fn transpiler(&self) -> Option<&Arc<dyn Transpiler>> {
        self.transpiler.as_ref()
    }

    pub fn minifier(&self) -> Option<&Arc<dyn Minifier>> {
        self.minifier.as_ref()
    }

    pub fn highlighter(&self) -> Option<&Arc<dyn Highlighter>> {
        self.highlighter.as_ref()
    }

    pub fn is_loaded(&self, module: ModuleId) -> bool {
        match module {
            ModuleId::Transpiler => self.transpiler.is_some(),
            ModuleId::Minifier => self.minifier.is_some(),
            ModuleId::Highlighter => self.highlighter.is_some(),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Effects to run once when a session starts.
    pub fn initial_effects(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.highlighter.is_none() {
            effects.push(Effect::Acquire(ModuleId::Highlighter));
        }
        effects.push(Effect::Render);
        effects
    }

    fn schedule(&mut self, effects: &mut Vec<Effect>) {
        self.revision += 1;
        effects.push(Effect::Recompute(PipelineJob {
            revision: self.revision,
            input: self.input_text.clone(),
            transpiler: self.transpiler.clone().filter(|_| self.transpile_enabled),
            minifier: self.minifier.clone().filter(|_| self.minify_enabled),
        }));
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("input_text", &self.input_text)
            .field("output_text", &self.output_text)
            .field("transpile_enabled", &self.transpile_enabled)
            .field("minify_enabled", &self.minify_enabled)
            .field("transpiler", &self.transpiler.is_some())
            .field("minifier", &self.minifier.is_some())
            .field("highlighter", &self.highlighter.is_some())
            .field("revision", &self.revision)
            .field("diagnostics", &self.diagnostics)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn identity(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.effects.is_empty()
    }
}

pub fn reduce(state: &SessionState, action: Action) -> Transition {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match action {
        Action::ChangeInput(text) => {
            if text == state.input_text {
                return Transition::identity(state);
            }
            next.input_text = text;
            next.schedule(&mut effects);
        }
        Action::ToggleTranspile(enabled) => {
            if enabled == state.transpile_enabled {
                return Transition::identity(state);
            }
            next.transpile_enabled = enabled;
            if enabled && next.transpiler.is_none() {
                effects.push(Effect::Acquire(ModuleId::Transpiler));
            }
            next.schedule(&mut effects);
        }
        Action::ToggleMinify(enabled) => {
            if enabled == state.minify_enabled {
                return Transition::identity(state);
            }
            next.minify_enabled = enabled;
            if enabled && next.minifier.is_none() {
                effects.push(Effect::Acquire(ModuleId::Minifier));
            }
            next.schedule(&mut effects);
        }
        Action::ModuleLoaded(capability) => {
            if state.is_loaded(capability.module_id()) {
                return Transition::identity(state);
            }
            match capability {
                Capability::Transpiler(module) => {
                    next.transpiler = Some(module);
                    next.schedule(&mut effects);
                }
                Capability::Minifier(module) => {
                    next.minifier = Some(module);
                    next.schedule(&mut effects);
                }
                Capability::Highlighter(module) => {
                    next.highlighter = Some(module);
                }
            }
        }
        Action::ModuleFailed { module, message } => {
            next.last_error = Some(format!("failed to load {module}: {message}"));
        }
        Action::OutputComputed { revision, output } => {
            if revision < state.revision {
                return Transition::identity(state);
            }
            next.output_text = output.text;
            next.diagnostics = output.diagnostics;
            next.last_error = None;
        }
        Action::ComputeFailed { revision, message } => {
            if revision < state.revision {
                return Transition::identity(state);
            }
            next.last_error = Some(message);
        }
    }

    effects.push(Effect::Render);
    Transition {
        state: next,
        effects,
    }
}
