//! Render surfaces: a small node tree for the playground UI and its HTML
//! rendering. Presentation only; every value shown comes from a
//! [`ViewModel`] projected out of the session state.

use morph_core::{ModuleId, SessionState};
use serde::Serialize;

pub const EDITOR_ID: &str = "morph-editor";
pub const CONTROLS_ID: &str = "morph-controls";
pub const OUTPUT_ID: &str = "morph-output";
pub const OUTPUT_LANG: &str = "javascript";

const EDITOR_PLACEHOLDER: &str = "Type TypeScript or JavaScript here";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Text {
        content: String,
        class: Option<&'static str>,
    },
    Stack {
        id: Option<&'static str>,
        class: &'static str,
        children: Vec<ViewNode>,
    },
    Editor {
        value: String,
    },
    Toggle {
        name: &'static str,
        label: &'static str,
        action: &'static str,
        checked: bool,
        status: Option<&'static str>,
    },
    /// `markup` is emitted verbatim and must already be escaped.
    Code {
        class: String,
        markup: String,
    },
}

impl ViewNode {
    pub fn text(content: impl Into<String>) -> Self {
        ViewNode::Text {
            content: content.into(),
            class: None,
        }
    }

    fn styled_text(content: impl Into<String>, class: &'static str) -> Self {
        ViewNode::Text {
            content: content.into(),
            class: Some(class),
        }
    }
}

pub fn render_to_string(node: &ViewNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &ViewNode, out: &mut String) {
    match node {
        ViewNode::Text { content, class } => {
            out.push_str("<span");
            if let Some(class) = class {
                push_attr(out, "class", class);
            }
            out.push('>');
            out.push_str(&escape_html(content));
            out.push_str("</span>");
        }
        ViewNode::Stack { id, class, children } => {
            out.push_str("<div");
            if let Some(id) = id {
                push_attr(out, "id", id);
            }
            push_attr(out, "class", class);
            out.push('>');
            for child in children {
                write_node(child, out);
            }
            out.push_str("</div>");
        }
        ViewNode::Editor { value } => {
            out.push_str("<textarea");
            push_attr(out, "id", EDITOR_ID);
            push_attr(out, "class", "editor");
            push_attr(out, "data-morph-action", "CHANGE_INPUT");
            push_attr(out, "placeholder", EDITOR_PLACEHOLDER);
            push_attr(out, "spellcheck", "false");
            out.push('>');
            out.push_str(&escape_html(value));
            out.push_str("</textarea>");
        }
        ViewNode::Toggle {
            name,
            label,
            action,
            checked,
            status,
        } => {
            out.push_str("<label class=\"toggle\"><input type=\"checkbox\"");
            push_attr(out, "name", name);
            push_attr(out, "data-morph-action", action);
            if *checked {
                out.push_str(" checked");
            }
            out.push_str("> ");
            out.push_str(&escape_html(label));
            if let Some(status) = status {
                out.push_str(" <small class=\"module-status\">");
                out.push_str(&escape_html(status));
                out.push_str("</small>");
            }
            out.push_str("</label>");
        }
        ViewNode::Code { class, markup } => {
            out.push_str("<pre><code");
            push_attr(out, "class", class);
            out.push('>');
            out.push_str(markup);
            out.push_str("</code></pre>");
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_html(value));
    out.push('"');
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModuleStatus {
    pub transpiler: bool,
    pub minifier: bool,
    pub highlighter: bool,
}

/// What the surfaces display for one session state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewModel {
    pub input_text: String,
    /// Escaped or highlighted markup for the output text.
    pub output_html: String,
    pub byte_count: usize,
    pub revision: u64,
    pub transpile_enabled: bool,
    pub minify_enabled: bool,
    pub modules: ModuleStatus,
    pub error: Option<String>,
    pub diagnostics: Vec<String>,
}

impl ViewModel {
    pub fn from_state(state: &SessionState) -> Self {
        let mut diagnostics: Vec<String> = state
            .diagnostics()
            .iter()
            .map(|d| format!("{} failed: {}", d.stage, d.message))
            .collect();

        let output_html = match state.highlighter() {
            Some(highlighter) => match highlighter.highlight(state.output_text(), OUTPUT_LANG) {
                Ok(markup) => markup,
                Err(err) => {
                    tracing::warn!(error = %err, "highlighting fell back to plain text");
                    diagnostics.push(err.to_string());
                    escape_html(state.output_text())
                }
            },
            None => escape_html(state.output_text()),
        };

        Self {
            input_text: state.input_text().to_string(),
            output_html,
            byte_count: state.byte_count(),
            revision: state.revision(),
            transpile_enabled: state.transpile_enabled(),
            minify_enabled: state.minify_enabled(),
            modules: ModuleStatus {
                transpiler: state.is_loaded(ModuleId::Transpiler),
                minifier: state.is_loaded(ModuleId::Minifier),
                highlighter: state.is_loaded(ModuleId::Highlighter),
            },
            error: state.last_error().map(str::to_string),
            diagnostics,
        }
    }

    fn code_class(&self) -> String {
        let mut class = format!("language-{OUTPUT_LANG}");
        if self.minify_enabled {
            class.push_str(" minified");
        }
        class
    }
}

fn module_status(enabled: bool, loaded: bool) -> Option<&'static str> {
    match (enabled, loaded) {
        (_, true) => Some("ready"),
        (true, false) => Some("loading"),
        (false, false) => None,
    }
}

pub fn controls_view(vm: &ViewModel) -> ViewNode {
    ViewNode::Stack {
        id: Some(CONTROLS_ID),
        class: "controls",
        children: vec![
            ViewNode::Toggle {
                name: "transpile",
                label: "Use TypeScript",
                action: "TOGGLE_TRANSPILE",
                checked: vm.transpile_enabled,
                status: module_status(vm.transpile_enabled, vm.modules.transpiler),
            },
            ViewNode::Toggle {
                name: "minify",
                label: "Minify",
                action: "TOGGLE_MINIFY",
                checked: vm.minify_enabled,
                status: module_status(vm.minify_enabled, vm.modules.minifier),
            },
        ],
    }
}

pub fn output_view(vm: &ViewModel) -> ViewNode {
    let mut children = vec![
        ViewNode::styled_text(format!("bytes: {}", vm.byte_count), "byte-count"),
        ViewNode::Code {
            class: vm.code_class(),
            markup: vm.output_html.clone(),
        },
    ];
    if let Some(error) = &vm.error {
        children.push(ViewNode::styled_text(error.clone(), "error"));
    }
    children.extend(
        vm.diagnostics
            .iter()
            .map(|d| ViewNode::styled_text(d.clone(), "diagnostic")),
    );
    ViewNode::Stack {
        id: Some(OUTPUT_ID),
        class: "output-pane",
        children,
    }
}

/// Whole playground: controls, editor pane, output pane.
pub fn app_view(vm: &ViewModel) -> ViewNode {
    ViewNode::Stack {
        id: None,
        class: "playground",
        children: vec![
            controls_view(vm),
            ViewNode::Stack {
                id: None,
                class: "panes",
                children: vec![
                    ViewNode::Stack {
                        id: None,
                        class: "editor-pane",
                        children: vec![ViewNode::Editor {
                            value: vm.input_text.clone(),
                        }],
                    },
                    output_view(vm),
                ],
            },
        ],
    }
}

pub fn render_output_pane(vm: &ViewModel) -> String {
    render_to_string(&output_view(vm))
}

pub fn render_controls(vm: &ViewModel) -> String {
    render_to_string(&controls_view(vm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::{Action, Capability, Highlighter, Stage, TransformError, reduce};
    use std::sync::Arc;

    struct Bracket;

    impl Highlighter for Bracket {
        fn highlight(&self, source: &str, _lang: &str) -> Result<String, TransformError> {
            Ok(format!("<b>{}</b>", escape_html(source)))
        }
    }

    struct Broken;

    impl Highlighter for Broken {
        fn highlight(&self, _source: &str, _lang: &str) -> Result<String, TransformError> {
            Err(TransformError::new(Stage::Highlight, "no grammar"))
        }
    }

    fn committed(state: &SessionState, text: &str) -> SessionState {
        let transition = reduce(state, Action::ChangeInput(text.into()));
        let revision = transition.state.revision();
        reduce(
            &transition.state,
            Action::OutputComputed {
                revision,
                output: morph_core::PipelineOutput {
                    text: text.into(),
                    diagnostics: Vec::new(),
                },
            },
        )
        .state
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn initial_view_shows_empty_editor_and_zero_bytes() {
        let vm = ViewModel::from_state(&SessionState::new());
        let html = render_to_string(&app_view(&vm));
        assert!(html.contains("<textarea id=\"morph-editor\""));
        assert!(html.contains("></textarea>"));
        assert!(html.contains("bytes: 0"));
        assert!(html.contains("Use TypeScript"));
        assert!(html.contains("Minify"));
        assert!(!html.contains(" checked"));
        assert!(html.contains("<pre><code class=\"language-javascript\"></code></pre>"));
    }

    #[test]
    fn output_without_highlighter_is_escaped() {
        let state = committed(&SessionState::new(), "a < b");
        let pane = render_output_pane(&ViewModel::from_state(&state));
        assert!(pane.contains("a &lt; b"));
        assert!(pane.contains("bytes: 5"));
    }

    #[test]
    fn output_goes_through_loaded_highlighter() {
        let state = reduce(
            &SessionState::new(),
            Action::ModuleLoaded(Capability::Highlighter(Arc::new(Bracket))),
        )
        .state;
        let state = committed(&state, "x");
        let vm = ViewModel::from_state(&state);
        assert_eq!(vm.output_html, "<b>x</b>");
        assert!(vm.modules.highlighter);
    }

    #[test]
    fn highlight_failure_falls_back_and_reports() {
        let state = reduce(
            &SessionState::new(),
            Action::ModuleLoaded(Capability::Highlighter(Arc::new(Broken))),
        )
        .state;
        let vm = ViewModel::from_state(&committed(&state, "<x>"));
        assert_eq!(vm.output_html, "&lt;x&gt;");
        assert_eq!(vm.diagnostics, vec!["highlight failed: no grammar".to_string()]);
    }

    #[test]
    fn minify_flag_marks_code_block_and_toggle() {
        let state = reduce(&SessionState::new(), Action::ToggleMinify(true)).state;
        let vm = ViewModel::from_state(&state);
        let html = render_to_string(&app_view(&vm));
        assert!(html.contains("class=\"language-javascript minified\""));
        assert!(html.contains("name=\"minify\" data-morph-action=\"TOGGLE_MINIFY\" checked"));
        assert!(render_controls(&vm).contains("loading"));
    }

    #[test]
    fn editor_value_is_escaped() {
        let vm = ViewModel {
            input_text: "</textarea><script>".into(),
            ..ViewModel::default()
        };
        let html = render_to_string(&app_view(&vm));
        assert!(html.contains("&lt;/textarea&gt;&lt;script&gt;"));
    }

    #[test]
    fn error_is_rendered_in_output_pane() {
        let vm = ViewModel {
            error: Some("minify failed: unexpected token".into()),
            ..ViewModel::default()
        };
        let pane = render_output_pane(&vm);
        assert!(pane.contains("<span class=\"error\">minify failed: unexpected token</span>"));
    }
}
