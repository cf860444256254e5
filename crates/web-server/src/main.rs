// This main function is the entry point when running `cargo run -p web-server`.
// It loads `academia.toml` (if present) and the environment, then serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configuration::load_config(None)?;
    let _log_guard = configuration::init_tracing(&settings.logging)?;
    web_server::run_server(settings).await
}
