use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;

use super::error::ExtractorError;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the client used for playlist fetches.
pub fn create_client(user_agent: Option<&str>) -> Result<Client, ExtractorError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ExtractorError::Client(e.to_string()))?
        .with_platform_verifier()
        .map_err(|e| ExtractorError::Client(e.to_string()))?
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(user_agent.unwrap_or(DEFAULT_UA))
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| ExtractorError::Client(e.to_string()))
}
