//! HTTP client for the Vault system API
//!
//! A thin blocking wrapper around a hyper client: the orchestrators are
//! synchronous, so each request is driven to completion on a
//! current-thread runtime.

use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::runtime::Runtime;
use url::Url;

use super::types::ApiErrors;
use super::{GenerateRootStatus, SealStatus, VaultApi, VaultError};

/// Client for one Vault server
pub struct VaultClient {
    base: Url,
    client: Client<HttpsConnector<HttpConnector>>,
    runtime: Runtime,
}

impl VaultClient {
    /// Create a client for `host`, connecting on `port`
    ///
    /// TLS is used unless `insecure` selects plain HTTP.
    pub fn new(host: &str, port: u16, insecure: bool) -> Result<Self, VaultError> {
        let scheme = if insecure { "http" } else { "https" };
        let base = Url::parse(&format!("{}://{}:{}", scheme, host, port))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        Ok(Self {
            base,
            client: Client::builder().build(HttpsConnector::new()),
            runtime,
        })
    }

    /// Host and port of the server this client talks to
    pub fn host(&self) -> String {
        match self.base.port() {
            Some(port) => format!("{}:{}", self.base.host_str().unwrap_or_default(), port),
            None => self.base.host_str().unwrap_or_default().to_string(),
        }
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, VaultError> {
        let uri = format!("{}v1/{}", self.base, path);
        debug!("{} {}", method, uri);

        let mut builder = Request::builder().method(method).uri(uri.as_str());
        let request = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                builder.body(Body::from(serde_json::to_vec(&value)?))?
            }
            None => builder.body(Body::empty())?,
        };

        let (status, bytes) = self.runtime.block_on(async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, VaultError>((status, bytes))
        })?;

        if !status.is_success() {
            let errors: ApiErrors = serde_json::from_slice(&bytes).unwrap_or_else(|_| ApiErrors {
                errors: vec![String::from_utf8_lossy(&bytes).into_owned()],
            });
            return Err(VaultError::Api {
                status: status.as_u16(),
                errors: errors.errors,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl VaultApi for VaultClient {
    fn seal_status(&self) -> Result<SealStatus, VaultError> {
        self.request(Method::GET, "sys/seal-status", None)
    }

    fn unseal(&self, share: &str) -> Result<SealStatus, VaultError> {
        self.request(Method::PUT, "sys/unseal", Some(json!({ "key": share })))
    }

    fn generate_root_status(&self) -> Result<GenerateRootStatus, VaultError> {
        self.request(Method::GET, "sys/generate-root/attempt", None)
    }

    fn generate_root_update(
        &self,
        share: &str,
        nonce: &str,
    ) -> Result<GenerateRootStatus, VaultError> {
        self.request(
            Method::PUT,
            "sys/generate-root/update",
            Some(json!({ "key": share, "nonce": nonce })),
        )
    }
}
