use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use morph_core::{ModuleId, ModuleLoader, PipelineOutput, compute};
use morph_web::{
    AxumMorphAdapter, BuiltinModules, JsMinifier, OxcTranspiler, RenderMode, render_initial,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "morph_cli=info,morph_web=info,morph_core=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(name = "morph", version, about = "Code transform playground")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve(ServeArgs),
    /// Print the page shell to stdout.
    Render {
        /// Emit the static shell instead of the server-rendered page.
        #[arg(long = "static")]
        static_shell: bool,
    },
    /// Run the transform pipeline over a file and print the result.
    Transform {
        file: PathBuf,
        #[arg(long)]
        transpile: bool,
        #[arg(long)]
        minify: bool,
    },
    /// Write the browser runtime script.
    InitClient {
        #[arg(long, default_value = "morph-runtime.js")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Pre-render the UI on the server.
    #[arg(long, env = "MORPH_SSR", default_value_t = true, action = clap::ArgAction::Set)]
    pub ssr: bool,

    /// Serve files from this directory when SSR is off.
    #[arg(long, env = "MORPH_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run_from_env() -> anyhow::Result<()> {
    run(Cli::parse()).await
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None => serve(cli.serve).await,
        Some(Command::Serve(args)) => serve(args).await,
        Some(Command::Render { static_shell }) => {
            let html = render_initial(RenderMode::from_ssr(!static_shell))?;
            println!("{html}");
            Ok(())
        }
        Some(Command::Transform { file, transpile, minify }) => {
            let output = transform_file(&file, transpile, minify)?;
            println!("{}", output.text);
            for diagnostic in &output.diagnostics {
                eprintln!("warning: {} failed: {}", diagnostic.stage, diagnostic.message);
            }
            eprintln!("bytes: {}", output.byte_count());
            Ok(())
        }
        Some(Command::InitClient { out }) => {
            write_client(&out)?;
            println!("wrote {}", out.display());
            Ok(())
        }
    }
}

pub fn transform_file(
    file: &Path,
    transpile: bool,
    minify: bool,
) -> anyhow::Result<PipelineOutput> {
    let source =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let output = compute(
        &source,
        transpile,
        Some(&OxcTranspiler::new()),
        minify,
        Some(&JsMinifier::new()),
    )?;
    Ok(output)
}

pub fn write_client(out: &Path) -> anyhow::Result<()> {
    fs::write(out, morph_web::MORPH_RUNTIME_JS)
        .with_context(|| format!("failed to write {}", out.display()))
}

pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let loader = Arc::new(ModuleLoader::new(BuiltinModules));
    let mode = RenderMode::from_ssr(args.ssr);

    let mut adapter = AxumMorphAdapter::new(Arc::clone(&loader)).with_mode(mode);
    if let Some(dir) = &args.static_dir {
        if mode == RenderMode::Server {
            tracing::warn!(dir = %dir.display(), "static dir is only used when SSR is off");
        }
        adapter = adapter.with_static_dir(dir);
    }
    let app = adapter.router();

    // every page needs the highlighter; start loading it before the first one connects
    tokio::spawn({
        let loader = Arc::clone(&loader);
        async move {
            if let Err(e) = loader.load(ModuleId::Highlighter).await {
                tracing::warn!(error = %e, "highlighter prewarm failed");
            }
        }
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return Err(e).with_context(|| format!("failed to bind {addr}"));
        }
    };

    tracing::info!(
        port = args.port,
        ?mode,
        "morph listening on http://localhost:{}",
        args.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("morph stopped, bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for interrupt; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("interrupt received, closing listener");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["morph"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.host, "0.0.0.0");
        if std::env::var_os("PORT").is_none() {
            assert_eq!(cli.serve.port, 3000);
        }
        if std::env::var_os("MORPH_SSR").is_none() {
            assert!(cli.serve.ssr);
        }
    }

    #[test]
    fn serve_flags() {
        let cli = Cli::try_parse_from([
            "morph",
            "serve",
            "--port",
            "8080",
            "--ssr",
            "false",
            "--static-dir",
            "dist",
        ])
        .unwrap();
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8080);
        assert!(!args.ssr);
        assert_eq!(args.static_dir, Some(PathBuf::from("dist")));
    }

    #[test]
    fn top_level_flags_conflict_with_subcommands() {
        assert!(Cli::try_parse_from(["morph", "--port", "1", "render"]).is_err());
        assert!(Cli::try_parse_from(["morph", "serve", "--port", "nope"]).is_err());
    }

    #[test]
    fn render_and_transform_commands() {
        let cli = Cli::try_parse_from(["morph", "render", "--static"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Render { static_shell: true })));

        let cli = Cli::try_parse_from(["morph", "transform", "a.ts", "--transpile"]).unwrap();
        let Some(Command::Transform { file, transpile, minify }) = cli.command else {
            panic!("expected transform");
        };
        assert_eq!(file, PathBuf::from("a.ts"));
        assert!(transpile);
        assert!(!minify);

        let cli = Cli::try_parse_from(["morph", "init-client"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::InitClient { out }) if out == Path::new("morph-runtime.js")
        ));
    }

    #[test]
    fn transform_file_strips_types() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("input.ts");
        fs::write(&file, "const x: number = 1").unwrap();

        let out = transform_file(&file, true, false).unwrap();
        assert!(out.text.contains("const x = 1"));
        assert!(!out.text.contains(": number"));

        let plain = transform_file(&file, false, false).unwrap();
        assert_eq!(plain.text, "const x: number = 1");
        assert_eq!(plain.byte_count(), 19);
    }

    #[test]
    fn transform_file_minifies() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("add.js");
        let source = "function add(a,b){return a+b}";
        fs::write(&file, source).unwrap();
        let out = transform_file(&file, false, true).unwrap();
        assert!(out.byte_count() <= source.len());
    }

    #[test]
    fn transform_missing_file_names_path() {
        let err = transform_file(Path::new("/nonexistent/morph.ts"), false, false).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/morph.ts"));
    }

    #[test]
    fn init_client_writes_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("morph-runtime.js");
        write_client(&out).unwrap();
        let written = fs::read_to_string(&out).unwrap();
        assert_eq!(written, morph_web::MORPH_RUNTIME_JS);
    }
}
