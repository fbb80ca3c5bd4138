//! Messages exchanged with the browser runtime over the session socket.

use crate::view::{ModuleStatus, ViewModel, render_controls, render_output_pane};
use morph_core::{Action, SessionState};
use serde::{Deserialize, Serialize};

/// Actions the page may send. Anything module- or result-related is
/// produced server-side only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    ChangeInput { value: String },
    ToggleTranspile { checked: bool },
    ToggleMinify { checked: bool },
}

impl From<ClientMessage> for Action {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::ChangeInput { value } => Action::ChangeInput(value),
            ClientMessage::ToggleTranspile { checked } => Action::ToggleTranspile(checked),
            ClientMessage::ToggleMinify { checked } => Action::ToggleMinify(checked),
        }
    }
}

/// Pushed to the page after every committed transition. `output_html` is
/// the highlighted output alone; `output_pane` and `controls` are the
/// rendered surfaces the runtime swaps in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionFrame {
    pub revision: u64,
    pub byte_count: usize,
    pub input_text: String,
    pub output_html: String,
    pub output_pane: String,
    pub controls: String,
    pub transpile_enabled: bool,
    pub minify_enabled: bool,
    pub modules: ModuleStatus,
    pub error: Option<String>,
}

impl SessionFrame {
    pub fn from_view(vm: &ViewModel) -> Self {
        Self {
            revision: vm.revision,
            byte_count: vm.byte_count,
            input_text: vm.input_text.clone(),
            output_html: vm.output_html.clone(),
            output_pane: render_output_pane(vm),
            controls: render_controls(vm),
            transpile_enabled: vm.transpile_enabled,
            minify_enabled: vm.minify_enabled,
            modules: vm.modules,
            error: vm.error.clone(),
        }
    }

    pub fn from_state(state: &SessionState) -> Self {
        Self::from_view(&ViewModel::from_state(state))
    }
}
