// # reqwest Transport
//
// This crate puts `papi-core` requests on the wire with `reqwest`.
//
// ## Scope
//
// - One HTTP exchange per `execute` call
// - Per-request timeout from `ClientConfig::request_timeout_secs`
// - `accountSwitchKey` appended to every request when an account key is set
// - Request signing delegated to a pluggable `RequestSigner`
// - No retries, no backoff, no caching: failures go straight back to the caller
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or `Debug` output
// - Signing material stays inside the signer; this crate only hands it the
//   fully built request
//
// ## Usage
//
// ```rust,ignore
// use papi_core::{ClientConfig, PapiClient};
// use papi_transport_reqwest::ReqwestTransport;
//
// let config = ClientConfig::from_env("default")?;
// let transport = ReqwestTransport::from_config(&config)?.with_signer(my_signer);
// let client = PapiClient::new(Box::new(transport)).with_use_prefixes(config.use_prefixes);
// ```

use async_trait::async_trait;
use papi_core::traits::{HttpRequest, HttpResponse, Method, Transport};
use papi_core::{ClientConfig, Error, Result};
use reqwest::Url;
use std::time::Duration;

/// Query parameter carrying the account switch key
pub const ACCOUNT_SWITCH_KEY_PARAM: &str = "accountSwitchKey";

/// Signs a fully built request before it is sent
///
/// Implementations add whatever authorization headers the API expects.
/// A signing failure aborts the request; nothing is sent.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut reqwest::Request) -> anyhow::Result<()>;
}

/// Signer that leaves requests untouched
///
/// Useful against local mocks and behind proxies that sign on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

impl RequestSigner for NoopSigner {
    fn sign(&self, _request: &mut reqwest::Request) -> anyhow::Result<()> {
        Ok(())
    }
}

/// `reqwest`-backed transport
///
/// # Security
///
/// The Debug implementation does NOT expose the signer or the account key.
pub struct ReqwestTransport {
    /// HTTP client, carrying the request timeout
    client: reqwest::Client,

    /// Scheme and host every request path is joined onto
    base_url: Url,

    /// Account switch key
    /// ⚠️ NEVER log this value
    account_key: Option<String>,

    /// Largest body the signer covers
    max_body: usize,

    /// Request signer
    signer: Box<dyn RequestSigner>,

    /// False while the `NoopSigner` from `from_config` is in place
    signing: bool,
}

// Custom Debug implementation that hides the account key
impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url.as_str())
            .field(
                "account_key",
                &self.account_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("max_body", &self.max_body)
            .field("signer", &if self.signing { "<REDACTED>" } else { "<none>" })
            .finish()
    }
}

impl ReqwestTransport {
    /// Build a transport from a validated client configuration
    ///
    /// Requests go to `https://{host}` UNSIGNED until a signer is set with
    /// [`with_signer`](Self::with_signer): the client token, client secret
    /// and access token are validated here but never read. A warning is
    /// logged for every transport built this way.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = parse_base_url(&config.base_url())?;

        tracing::warn!(
            "no request signer set for {}; requests are sent unsigned",
            config.host
        );

        Ok(Self {
            client,
            base_url,
            account_key: config.account_key.clone().filter(|key| !key.is_empty()),
            max_body: config.max_body,
            signer: Box::new(NoopSigner),
            signing: false,
        })
    }

    /// Replace the request signer
    pub fn with_signer(mut self, signer: impl RequestSigner + 'static) -> Self {
        self.signer = Box::new(signer);
        self.signing = true;
        self
    }

    /// True once a signer has been set with [`with_signer`](Self::with_signer)
    pub fn is_signing(&self) -> bool {
        self.signing
    }

    /// Send requests to another base URL, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Full URL of a request, account switch key included
    fn request_url(&self, request: &HttpRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&request.path_and_query())
            .map_err(|e| Error::transport(format!("invalid request path {:?}: {}", request.path, e)))?;

        if let Some(key) = &self.account_key {
            url.query_pairs_mut().append_pair(ACCOUNT_SWITCH_KEY_PARAM, key);
        }

        Ok(url)
    }

    /// Turn a core request into a signed `reqwest::Request`
    fn build_request(&self, request: &HttpRequest) -> Result<reqwest::Request> {
        let url = self.request_url(request)?;

        let mut builder = self.client.request(reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let mut built = builder
            .build()
            .map_err(|e| Error::transport(format!("failed to build request: {}", e)))?;

        if let Some(len) = built.body().and_then(|b| b.as_bytes()).map(<[u8]>::len) {
            if len > self.max_body {
                tracing::debug!(
                    "request body of {} bytes exceeds signed limit of {} bytes",
                    len,
                    self.max_body
                );
            }
        }

        self.signer
            .sign(&mut built)
            .map_err(|e| Error::transport(format!("request signing failed: {}", e)))?;

        Ok(built)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    /// Send one request and collect the full response
    ///
    /// Any status is a successful exchange; status handling belongs to the
    /// client. Connection failures, timeouts and unreadable bodies map to
    /// [`Error::Transport`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let built = self.build_request(&request)?;

        tracing::debug!("{} {}", request.method, request.path);

        let response = self
            .client
            .execute(built)
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("failed to read response body: {}", e)))?;

        tracing::debug!("{} {} -> {}", request.method, request.path, status);

        Ok(headers
            .into_iter()
            .fold(HttpResponse::new(status, body.to_vec()), |response, (name, value)| {
                response.with_header(&name, value)
            }))
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("invalid base URL {:?}: {}", raw, e)))
}
