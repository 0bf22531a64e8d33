use anyhow::{Context, Result};
use specflow_core::config::Config;
use specflow_server::AppState;
use std::path::Path;

pub fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<()> {
    let mut config = Config::load(config_path).with_context(|| match config_path {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading config from environment".to_string(),
    })?;
    if let Some(port) = port {
        config.port = port;
    }
    tracing::info!(
        port = config.port,
        endpoint = %config.github_api_endpoint,
        ai = config.has_ai_key(),
        "starting specflow server"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let state = AppState::from_config(config)?;
        specflow_server::serve(state).await
    })
}
