#[cfg(feature = "axum")]
pub mod adapters;
pub mod highlight;
pub mod jsminify;
pub mod modules;
pub mod protocol;
pub mod shell;
pub mod transpile;
pub mod view;

#[cfg(feature = "axum")]
pub use adapters::axum::AxumMorphAdapter;
pub use highlight::SyntectHighlighter;
pub use jsminify::{JsMinifier, minify_js};
pub use modules::BuiltinModules;
pub use protocol::{ClientMessage, SessionFrame};
pub use shell::{
    MORPH_RUNTIME_JS, RenderError, RenderMode, SESSION_PATH, render_initial, render_page,
};
pub use transpile::OxcTranspiler;
pub use view::{ViewModel, ViewNode, app_view, escape_html, render_output_pane, render_to_string};
