use async_trait::async_trait;
use notaryflow_core::LogFetcher;
use notaryflow_domain::Result;
use tracing::debug;

use super::client::HttpClient;

/// Retrieves notarization logs from the `LogFileURL` reported by the status
/// tool. The body is returned verbatim; it is not validated as JSON.
#[derive(Clone)]
pub struct HttpLogFetcher {
    http: HttpClient,
}

impl HttpLogFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogFetcher for HttpLogFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let body = self.http.get_text(url).await?;
        debug!(bytes = body.len(), "Fetched notarization log");
        Ok(body)
    }
}
