use std::sync::Arc;

use crate::{config::PortalEndpoints, errors::PortalError};

use super::{
    parse,
    transport::{HttpResponse, PortalTransport},
    types::{NumberRecord, SmsMessage},
};

/// One cookie-bearing relationship with the portal.
///
/// A session is created empty and becomes believed-authenticated after
/// `authenticate` lands on the portal area. The server may expire it at any
/// time without telling us; `is_authenticated` is the only way to find out.
pub struct PortalSession {
    endpoints: Arc<PortalEndpoints>,
    http: Arc<dyn PortalTransport>,
    captcha_response: String,
}

impl PortalSession {
    /// `captcha_response` is sent verbatim in the `g-recaptcha-response`
    /// field. It is a placeholder; a live reCAPTCHA challenge will reject it.
    pub fn new(
        endpoints: Arc<PortalEndpoints>,
        http: Arc<dyn PortalTransport>,
        captcha_response: impl Into<String>,
    ) -> Self {
        Self {
            endpoints,
            http,
            captcha_response: captcha_response.into(),
        }
    }

    /// Log in with the given credentials. Safe to call again on a live session.
    ///
    /// Every failure (rejected credentials, missing form token, network error)
    /// is logged and reported as `false`.
    pub async fn authenticate(&self, email: &str, password: &str) -> bool {
        match self.try_authenticate(email, password).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::info!("portal login rejected (did not land on the portal area)");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "portal login failed");
                false
            }
        }
    }

    pub async fn try_authenticate(&self, email: &str, password: &str) -> Result<bool, PortalError> {
        let page = self.http.get(&self.endpoints.login).await?;
        let token =
            parse::login_form_token(&page.body).ok_or(PortalError::MissingToken("_token"))?;

        let headers = [
            ("Referer", self.endpoints.login.as_str()),
            ("Origin", self.endpoints.origin.as_str()),
            ("Upgrade-Insecure-Requests", "1"),
        ];
        let form = [
            ("_token", token.as_str()),
            ("email", email),
            ("password", password),
            ("remember", "on"),
            ("g-recaptcha-response", self.captcha_response.as_str()),
            ("submit", "register"),
        ];

        let landed = self
            .http
            .post_form(&self.endpoints.login, &headers, &form)
            .await?;
        Ok(url_path(&landed.url).contains(self.endpoints.portal_marker.as_str()))
    }

    /// CSRF token from the authenticated landing page, or an empty string.
    ///
    /// Empty means "cannot proceed": not logged in and a changed page layout
    /// look the same here.
    pub async fn fetch_csrf_token(&self) -> String {
        match self.try_fetch_csrf_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch portal csrf token");
                String::new()
            }
        }
    }

    pub async fn try_fetch_csrf_token(&self) -> Result<String, PortalError> {
        let page = self.http.get(&self.endpoints.home).await?;
        parse::csrf_meta_token(&page.body).ok_or(PortalError::MissingToken("csrf-token"))
    }

    /// Inbound SMS in the order the portal renders them. Empty on any failure.
    pub async fn list_messages(&self) -> Vec<SmsMessage> {
        match self.try_list_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, "failed to retrieve sms messages");
                Vec::new()
            }
        }
    }

    pub async fn try_list_messages(&self) -> Result<Vec<SmsMessage>, PortalError> {
        let page = ok_status(self.http.get(&self.endpoints.messages).await?)?;
        parse::sms_table(&page.body).ok_or_else(|| {
            PortalError::Malformed(format!("table #{} not found", parse::SMS_TABLE_ID))
        })
    }

    /// Numbers registered under `termination_id`. Empty on any failure.
    pub async fn list_numbers(&self, termination_id: &str) -> Vec<NumberRecord> {
        match self.try_list_numbers(termination_id).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, termination_id, "failed to retrieve numbers");
                Vec::new()
            }
        }
    }

    /// Requires a fresh CSRF token; without one the numbers endpoint is never called.
    pub async fn try_list_numbers(
        &self,
        termination_id: &str,
    ) -> Result<Vec<NumberRecord>, PortalError> {
        let token = self.try_fetch_csrf_token().await?;

        let headers = [
            ("Accept", "*/*"),
            ("Origin", self.endpoints.origin.as_str()),
            ("Referer", self.endpoints.messages.as_str()),
            ("X-Requested-With", "XMLHttpRequest"),
            ("X-CSRF-TOKEN", token.as_str()),
        ];
        let form = [("termination_id", termination_id), ("_token", token.as_str())];

        let resp = ok_status(
            self.http
                .post_form(&self.endpoints.numbers, &headers, &form)
                .await?,
        )?;
        parse::numbers_payload(&resp.body)
    }

    /// Session-expiry probe: one extra GET of the landing page.
    ///
    /// Heuristic. An expired session is redirected to the login page, so the
    /// final URL no longer is the portal home. Network failures count as
    /// "not authenticated"; use `try_probe` to tell them apart.
    pub async fn is_authenticated(&self) -> bool {
        match self.try_probe().await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::warn!(error = %e, "portal session probe failed");
                false
            }
        }
    }

    pub async fn try_probe(&self) -> Result<bool, PortalError> {
        let page = self.http.get(&self.endpoints.home).await?;
        Ok(is_path(&page.url, &self.endpoints.home_path))
    }
}

fn ok_status(resp: HttpResponse) -> Result<HttpResponse, PortalError> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(PortalError::Status(resp.status))
    }
}

/// Path component of an absolute URL, without query or fragment.
fn url_path(url: &str) -> &str {
    let without_scheme = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let path = match without_scheme.find('/') {
        Some(i) => &without_scheme[i..],
        None => "/",
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn is_path(url: &str, expected: &str) -> bool {
    let path = url_path(url).trim_end_matches('/');
    path == expected.trim_end_matches('/')
}
