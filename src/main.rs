use resilience::{config::ResilienceConfig, init_server, init_tracing};
use std::env;
use std::path::Path;
use std::process;
use tracing::info;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/resilience.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        match ResilienceConfig::from_file(&config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", config_path, e);
                eprintln!("Usage: resilience [config_file]");
                process::exit(1);
            }
        }
    } else {
        info!(path = %config_path, "Config file not found, using built-in dependency table");
        ResilienceConfig::builtin()
    };

    if let Err(e) = init_server(config).await {
        eprintln!("Resilience service error: {}", e);
        process::exit(1);
    }
}
