use crate::highlight::SyntectHighlighter;
use crate::jsminify::JsMinifier;
use crate::transpile::OxcTranspiler;
use futures::future::{BoxFuture, FutureExt};
use morph_core::{Capability, LoadError, LoadResult, ModuleId, ModuleSource};
use std::sync::Arc;

/// Builds the bundled capabilities on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinModules;

fn build(module: ModuleId) -> Capability {
    match module {
        ModuleId::Transpiler => Capability::Transpiler(Arc::new(OxcTranspiler::new())),
        ModuleId::Minifier => Capability::Minifier(Arc::new(JsMinifier::new())),
        ModuleId::Highlighter => Capability::Highlighter(Arc::new(SyntectHighlighter::load())),
    }
}

impl ModuleSource for BuiltinModules {
    fn fetch(&self, module: ModuleId) -> BoxFuture<'static, LoadResult> {
        async move {
            let started = std::time::Instant::now();
            let capability = tokio::task::spawn_blocking(move || build(module))
                .await
                .map_err(|err| LoadError::Fetch {
                    module,
                    message: err.to_string(),
                })?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(%module, elapsed_ms, "module ready");
            Ok(capability)
        }
        .boxed()
    }
}
