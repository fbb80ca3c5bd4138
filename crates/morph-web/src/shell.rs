//! Page shell: the fixed document around the playground, the bootstrap
//! payload and the browser runtime.

use crate::view::{ViewModel, app_view, render_to_string};
use serde::Serialize;
use thiserror::Error;

pub const MORPH_RUNTIME_JS: &str = include_str!("morph-runtime.js");
pub const SESSION_PATH: &str = "/session";
pub const MOUNT_ID: &str = "morph-app";

const TITLE: &str = "morph playground";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Pre-render the initial UI tree into the mount point.
    #[default]
    Server,
    /// Empty mount point; the runtime mounts the tree from the payload.
    Static,
}

impl RenderMode {
    pub fn from_ssr(ssr: bool) -> Self {
        if ssr {
            RenderMode::Server
        } else {
            RenderMode::Static
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode bootstrap payload: {0}")]
    Bootstrap(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Bootstrap<'a> {
    mode: RenderMode,
    session: &'static str,
    state: &'a ViewModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    app: Option<String>,
}

const BASE_CSS: &str = r#"
html, body { margin: 0; padding: 0; min-height: 100%; }
body { font-family: Inter, system-ui, sans-serif; color: #0f172a; background: #f8fafc; }
#morph-app { box-sizing: border-box; padding: 16px; min-height: 100vh; }
#morph-app * { box-sizing: border-box; }
.controls { display: flex; gap: 16px; margin-bottom: 12px; }
.toggle { display: inline-flex; align-items: center; gap: 6px; cursor: pointer; }
.module-status { color: #64748b; }
.panes { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.editor {
  width: 100%; min-height: 60vh; font: 14px/1.5 ui-monospace, monospace;
  padding: 10px 12px; border: 1px solid #e2e8f0; border-radius: 10px;
}
.output-pane pre {
  margin: 8px 0 0; padding: 10px 12px; min-height: 60vh; overflow: auto;
  background: #ffffff; border: 1px solid #e2e8f0; border-radius: 10px;
}
.output-pane code.minified { white-space: pre-wrap; word-break: break-all; }
.byte-count { color: #64748b; font-size: 12px; }
.error, .diagnostic { display: block; margin-top: 8px; color: #dc2626; }
.keyword, .storage { color: #7c3aed; }
.string { color: #059669; }
.comment { color: #94a3b8; }
.constant.numeric { color: #d97706; }
.entity.name.function { color: #2563eb; }
"#;

/// Serializes a value for a `<script>` block; `</` is escaped so the payload
/// cannot close the element.
fn script_json<T: Serialize>(value: &T) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

pub fn render_page(mode: RenderMode, vm: &ViewModel) -> Result<String, RenderError> {
    let app = render_to_string(&app_view(vm));
    let (mounted, deferred) = match mode {
        RenderMode::Server => (app, None),
        RenderMode::Static => (String::new(), Some(app)),
    };
    let bootstrap = script_json(&Bootstrap {
        mode,
        session: SESSION_PATH,
        state: vm,
        app: deferred,
    })?;

    let mut html = String::with_capacity(mounted.len() + MORPH_RUNTIME_JS.len() + 2048);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{TITLE}</title>\n"));
    html.push_str(&format!("<style>{BASE_CSS}</style>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<div id=\"{MOUNT_ID}\">{mounted}</div>\n"));
    html.push_str(&format!("<script>window.__MORPH__ = {bootstrap};</script>\n"));
    html.push_str(&format!("<script>{MORPH_RUNTIME_JS}</script>\n"));
    html.push_str("</body>\n</html>");
    Ok(html)
}

/// First paint for a fresh session.
pub fn render_initial(mode: RenderMode) -> Result<String, RenderError> {
    render_page(mode, &ViewModel::from_state(&morph_core::SessionState::new()))
}
