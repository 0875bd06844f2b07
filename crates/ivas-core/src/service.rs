use std::sync::Arc;

use crate::{
    config::PortalEndpoints,
    domain::UserId,
    errors::Error,
    portal::{NumberRecord, PortalSession, SmsMessage, TransportFactory},
    registry::SessionRegistry,
    Result,
};

/// Outcome of a portal read for a logged-in user.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    Items(Vec<T>),
    /// Nothing came back but the session still reaches the portal.
    Empty,
    /// Nothing came back and the probe landed outside the portal area.
    /// The registry entry has already been evicted.
    SessionExpired,
}

impl<T> Fetched<T> {
    pub fn is_expired(&self) -> bool {
        matches!(self, Fetched::SessionExpired)
    }

}

/// Public contract consumed by the chat layer: login, read SMS, read numbers.
///
/// Session expiry is inferred, never observed directly: after a zero-result
/// read the service spends one extra GET probing the landing page.
pub struct PortalService {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn TransportFactory>,
    endpoints: Arc<PortalEndpoints>,
    captcha_response: String,
}

impl PortalService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        factory: Arc<dyn TransportFactory>,
        endpoints: PortalEndpoints,
        captcha_response: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            factory,
            endpoints: Arc::new(endpoints),
            captcha_response: captcha_response.into(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn is_logged_in(&self, user: UserId) -> bool {
        self.registry.get(user).await.is_some()
    }

    /// Log `user` in with a brand new cookie jar.
    ///
    /// On success the session replaces whatever the user had before. On
    /// failure the registry is left untouched.
    pub async fn login(&self, user: UserId, email: &str, password: &str) -> bool {
        let http = match self.factory.open() {
            Ok(http) => http,
            Err(e) => {
                tracing::warn!(user = user.0, error = %e, "could not open portal transport");
                return false;
            }
        };

        let session = Arc::new(PortalSession::new(
            self.endpoints.clone(),
            http,
            self.captcha_response.clone(),
        ));
        if !session.authenticate(email, password).await {
            tracing::info!(user = user.0, "portal login failed");
            return false;
        }

        self.registry.put(user, session).await;
        let active_sessions = self.registry.len().await;
        tracing::info!(
            user = user.0,
            active_sessions,
            "portal login succeeded"
        );
        true
    }

    pub async fn logout(&self, user: UserId) -> bool {
        let removed = self.registry.remove(user).await.is_some();
        if removed {
            let active_sessions = self.registry.len().await;
            tracing::info!(
                user = user.0,
                active_sessions,
                "portal session dropped"
            );
        }
        removed
    }

    /// `Err(Error::NotLoggedIn)` when `user` has no session.
    pub async fn get_messages(&self, user: UserId) -> Result<Fetched<SmsMessage>> {
        let session = self.registry.get(user).await.ok_or(Error::NotLoggedIn)?;
        let items = session.list_messages().await;
        Ok(self.settle(user, &session, items).await)
    }

    /// `Err(Error::NotLoggedIn)` when `user` has no session.
    pub async fn get_numbers(
        &self,
        user: UserId,
        termination_id: &str,
    ) -> Result<Fetched<NumberRecord>> {
        let session = self.registry.get(user).await.ok_or(Error::NotLoggedIn)?;
        let items = session.list_numbers(termination_id).await;
        Ok(self.settle(user, &session, items).await)
    }

    async fn settle<T>(
        &self,
        user: UserId,
        session: &Arc<PortalSession>,
        items: Vec<T>,
    ) -> Fetched<T> {
        if !items.is_empty() {
            return Fetched::Items(items);
        }

        match session.try_probe().await {
            Ok(true) => Fetched::Empty,
            Ok(false) => {
                self.registry.remove_if_same(user, session).await;
                tracing::info!(user = user.0, "portal session expired; evicted");
                Fetched::SessionExpired
            }
            Err(e) => {
                // A network blip says nothing about the session; keep it.
                tracing::warn!(user = user.0, error = %e, "session probe failed");
                Fetched::Empty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::fake::{
        html_page, login_page, portal_home, FakeFactory, FakeTransport, Method,
    };

    const SMS_URL: &str = "https://ivas.test/portal/live/my_sms";
    const NUMBERS_URL: &str = "https://ivas.test/portal/live/getNumbers";
    const HOME_URL: &str = "https://ivas.test/portal";
    const LOGIN_URL: &str = "https://ivas.test/login";

    fn service(factory: Arc<FakeFactory>) -> PortalService {
        PortalService::new(
            Arc::new(SessionRegistry::new()),
            factory,
            PortalEndpoints::from_base("https://ivas.test"),
            "placeholder",
        )
    }

    fn accepting_portal() -> Arc<FakeTransport> {
        let fake = Arc::new(FakeTransport::default());
        fake.route(Method::Get, LOGIN_URL, login_page("tok"));
        fake.route(Method::Post, LOGIN_URL, portal_home("csrf"));
        fake.route(Method::Get, HOME_URL, portal_home("csrf"));
        fake
    }

    async fn logged_in(fake: Arc<FakeTransport>) -> PortalService {
        let factory = Arc::new(FakeFactory::default());
        factory.push(fake);
        let svc = service(factory);
        assert!(svc.login(UserId(7), "me@x.test", "pw").await);
        svc
    }

    #[tokio::test]
    async fn successful_login_registers_session() {
        let factory = Arc::new(FakeFactory::default());
        factory.push(accepting_portal());
        let svc = service(factory.clone());

        assert!(svc.login(UserId(7), "me@x.test", "pw").await);
        assert!(svc.is_logged_in(UserId(7)).await);
        assert!(svc.registry().get(UserId(7)).await.is_some());
        assert_eq!(factory.opened(), 1);
    }

    #[tokio::test]
    async fn rejected_login_leaves_registry_empty() {
        let fake = Arc::new(FakeTransport::default());
        fake.route(Method::Get, LOGIN_URL, login_page("tok"));
        fake.route(Method::Post, LOGIN_URL, login_page("tok-again"));
        let factory = Arc::new(FakeFactory::default());
        factory.push(fake);
        let svc = service(factory);

        assert!(!svc.login(UserId(7), "me@x.test", "bad").await);
        assert_eq!(svc.registry().len().await, 0);
    }

    #[tokio::test]
    async fn login_without_transport_fails() {
        let svc = service(Arc::new(FakeFactory::default()));
        assert!(!svc.login(UserId(7), "me@x.test", "pw").await);
    }

    #[tokio::test]
    async fn relogin_replaces_session() {
        let factory = Arc::new(FakeFactory::default());
        factory.push(accepting_portal());
        factory.push(accepting_portal());
        let svc = service(factory);

        assert!(svc.login(UserId(7), "me@x.test", "pw").await);
        let first = svc.registry().get(UserId(7)).await.unwrap();
        assert!(svc.login(UserId(7), "me@x.test", "pw").await);
        let second = svc.registry().get(UserId(7)).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn reads_require_a_session() {
        let svc = service(Arc::new(FakeFactory::default()));
        assert!(matches!(
            svc.get_messages(UserId(1)).await,
            Err(Error::NotLoggedIn)
        ));
        assert!(matches!(
            svc.get_numbers(UserId(1), "301984").await,
            Err(Error::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn messages_are_returned_without_probing() {
        let fake = accepting_portal();
        fake.route(
            Method::Get,
            SMS_URL,
            html_page(
                200,
                SMS_URL,
                r#"<table id="my_live_sms_table"><tr><th>h</th></tr>
                   <tr><td>1</td><td>hi</td><td>now</td></tr></table>"#,
            ),
        );
        let svc = logged_in(fake.clone()).await;

        let out = svc.get_messages(UserId(7)).await.unwrap();
        assert!(matches!(out, Fetched::Items(ref rows) if rows.len() == 1));
        assert_eq!(fake.count(Method::Get, HOME_URL), 0);
    }

    #[tokio::test]
    async fn empty_inbox_with_live_session_is_empty() {
        let fake = accepting_portal();
        fake.route(
            Method::Get,
            SMS_URL,
            html_page(200, SMS_URL, r#"<table id="my_live_sms_table"><tr><th>h</th></tr></table>"#),
        );
        let svc = logged_in(fake.clone()).await;

        assert_eq!(svc.get_messages(UserId(7)).await.unwrap(), Fetched::Empty);
        assert!(svc.is_logged_in(UserId(7)).await);
        assert_eq!(fake.count(Method::Get, HOME_URL), 1);
    }

    #[tokio::test]
    async fn expired_session_is_evicted() {
        let fake = accepting_portal();
        let svc = logged_in(fake.clone()).await;

        // Server forgot us: every portal page now bounces to the login form.
        fake.route(Method::Get, SMS_URL, login_page("tok"));
        fake.route(Method::Get, HOME_URL, login_page("tok"));

        let out = svc.get_messages(UserId(7)).await.unwrap();
        assert!(out.is_expired());
        assert!(!svc.is_logged_in(UserId(7)).await);
    }

    #[tokio::test]
    async fn numbers_expiry_is_detected_too() {
        let fake = accepting_portal();
        let svc = logged_in(fake.clone()).await;
        fake.route(Method::Get, HOME_URL, login_page("tok"));

        let out = svc.get_numbers(UserId(7), "301984").await.unwrap();
        assert_eq!(out, Fetched::SessionExpired);
        assert!(!svc.is_logged_in(UserId(7)).await);
        // The login page has no csrf meta tag, so the numbers POST never ran.
        assert_eq!(fake.count(Method::Post, NUMBERS_URL), 0);
    }

    #[tokio::test]
    async fn numbers_are_returned_in_order() {
        let fake = accepting_portal();
        fake.route(
            Method::Post,
            NUMBERS_URL,
            html_page(200, NUMBERS_URL, r#"{"data":[{"number":"123"},{"number":"456"}]}"#),
        );
        let svc = logged_in(fake).await;

        let Fetched::Items(records) = svc.get_numbers(UserId(7), "301984").await.unwrap() else {
            panic!("expected numbers");
        };
        let nums: Vec<String> = records.into_iter().map(|r| r.number).collect();
        assert_eq!(nums, vec!["123".to_string(), "456".to_string()]);
    }

    #[tokio::test]
    async fn probe_network_failure_keeps_session() {
        let fake = accepting_portal();
        let svc = logged_in(fake.clone()).await;
        fake.fail(Method::Get, SMS_URL, "timeout");
        fake.fail(Method::Get, HOME_URL, "timeout");

        assert_eq!(svc.get_messages(UserId(7)).await.unwrap(), Fetched::Empty);
        assert!(svc.is_logged_in(UserId(7)).await);
    }

    #[tokio::test]
    async fn logout_evicts() {
        let svc = logged_in(accepting_portal()).await;
        assert!(svc.logout(UserId(7)).await);
        assert!(!svc.logout(UserId(7)).await);
        assert!(!svc.is_logged_in(UserId(7)).await);
    }
}
