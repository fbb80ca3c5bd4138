#[tokio::main]
async fn main() {
    morph_cli::init_tracing();
    if let Err(e) = morph_cli::run_from_env().await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
