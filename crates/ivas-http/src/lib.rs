//! reqwest adapter for the portal transport port.
//!
//! Each `open()` builds a separate `reqwest::Client` with its own cookie
//! store, so every logged-in user gets an isolated portal session.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use ivas_core::{
    errors::PortalError,
    portal::{HttpResponse, PortalTransport, TransportFactory},
};

#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

/// One cookie jar talking to the portal.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| PortalError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }

    async fn finish(resp: reqwest::Response) -> Result<HttpResponse, PortalError> {
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp.text().await.map_err(map_err)?;
        Ok(HttpResponse { status, url, body })
    }
}

fn map_err(e: reqwest::Error) -> PortalError {
    if e.is_timeout() {
        return PortalError::Transport(format!("request timed out: {e}"));
    }
    PortalError::Transport(format!("portal request error: {e}"))
}

fn header_map(headers: &[(&str, &str)]) -> Result<HeaderMap, PortalError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PortalError::Transport(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| PortalError::Transport(format!("invalid header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl PortalTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, PortalError> {
        let resp = self.http.get(url).send().await.map_err(map_err)?;
        Self::finish(resp).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, PortalError> {
        let resp = self
            .http
            .post(url)
            .headers(header_map(headers)?)
            .form(form)
            .send()
            .await
            .map_err(map_err)?;
        tracing::debug!(url, status = resp.status().as_u16(), "portal form posted");
        Self::finish(resp).await
    }
}

/// Opens a fresh `ReqwestTransport` per login.
#[derive(Clone, Debug)]
pub struct ReqwestFactory {
    settings: HttpSettings,
}

impl ReqwestFactory {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl TransportFactory for ReqwestFactory {
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError> {
        Ok(Arc::new(ReqwestTransport::new(&self.settings)?))
    }
}
