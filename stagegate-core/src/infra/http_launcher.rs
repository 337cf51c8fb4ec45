use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::debug;
use url::Url;

use crate::error::{Result, StageError};
use crate::ports::LaunchInvoker;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Invokes the launcher through an HTTP gateway: the payload is POSTed to
/// `<endpoint>/<function_name>` and the response body is handed back as-is.
pub struct HttpLaunchInvoker {
    client: reqwest::Client,
    endpoint: Url,
}

impl fmt::Debug for HttpLaunchInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLaunchInvoker")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Parses a gateway base URL, normalising it to end in `/` so function names
/// are joined beneath it rather than replacing its last segment.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl HttpLaunchInvoker {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Self::with_client(client, endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(endpoint)?,
        })
    }

    pub fn function_url(&self, function_name: &str) -> Result<Url> {
        Ok(self.endpoint.join(function_name.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl LaunchInvoker for HttpLaunchInvoker {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.function_url(function_name)?;
        debug!(
            target: "stage::launch",
            %url,
            bytes = payload.len(),
            "posting launch payload"
        );

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::Launch(format!(
                "launcher gateway returned {status}: {body}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
