use std::collections::HashMap;

/// Adapter configuration as the orchestrator would pass it to `init`.
pub fn adapter_config(
    rest_api_url: &str,
    bucket: &str,
    region: &str,
    prefix: Option<&str>,
) -> HashMap<String, String> {
    let mut config = HashMap::from([
        ("rookRestAPIURL".to_string(), rest_api_url.to_string()),
        ("bucket".to_string(), bucket.to_string()),
        ("region".to_string(), region.to_string()),
    ]);
    if let Some(prefix) = prefix {
        config.insert("prefix".to_string(), prefix.to_string());
    }
    config
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
