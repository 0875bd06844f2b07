use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::PortalError;

/// What the client needs to know about a finished request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects were followed.
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Hexagonal port for the portal's HTTP surface.
///
/// One instance owns one cookie jar: every call made through it shares the
/// same server-side session. Implementations follow redirects and enforce a
/// bounded timeout; connection failures surface as `PortalError::Transport`.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, PortalError>;

    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, PortalError>;
}

/// Opens fresh, cookie-less transports (one per login attempt).
pub trait TransportFactory: Send + Sync {
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError>;
}
