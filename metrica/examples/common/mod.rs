use std::sync::Arc;

use metrica::CampaignBackend;
use metrica_http::HttpBackend;
use metrica_mock::MockBackend;

/// Backend for the examples: the HTTP backend when `METRICA_BASE_URL` is set
/// and `METRICA_EXAMPLES_USE_MOCK` is not, the mock backend otherwise.
#[must_use]
pub fn get_backend() -> Arc<dyn CampaignBackend> {
    let base_url = std::env::var("METRICA_BASE_URL").ok();
    match base_url {
        Some(url) if std::env::var("METRICA_EXAMPLES_USE_MOCK").is_err() => {
            let mut builder = HttpBackend::builder(url);
            if let Ok(token) = std::env::var("METRICA_TOKEN") {
                builder = builder.bearer_token(token);
            }
            match builder.build() {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    println!("--- (HTTP backend unavailable: {e}; using mock) ---");
                    Arc::new(MockBackend::new())
                }
            }
        }
        _ => {
            println!("--- (Using Mock Backend) ---");
            Arc::new(MockBackend::new())
        }
    }
}

/// Install a `fmt` subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,metrica=debug")),
        )
        .try_init();
}
