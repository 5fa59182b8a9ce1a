mod http;
mod sse;

pub use http::HttpBackend;
pub use sse::SseDecoder;

use analyst_core::backend::Backend;
use analyst_core::config::AppConfig;
use analyst_core::error::TransportError;
use std::sync::Arc;

/// Create the HTTP backend described by `config`.
pub fn create_backend(config: &AppConfig) -> Result<Arc<dyn Backend>, TransportError> {
    Ok(Arc::new(HttpBackend::from_config(config)?))
}
