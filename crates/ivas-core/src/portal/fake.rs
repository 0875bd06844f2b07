//! Scripted in-memory transport for tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use crate::errors::PortalError;

use super::transport::{HttpResponse, PortalTransport, TransportFactory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

type Reply = Result<HttpResponse, PortalError>;

/// Each route answers with the same reply until it is re-routed.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn route(&self, method: Method, url: &str, resp: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), Ok(resp));
    }

    pub fn fail(&self, method: Method, url: &str, reason: &str) {
        self.routes.lock().unwrap().insert(
            (method, url.to_string()),
            Err(PortalError::Transport(reason.to_string())),
        );
    }

    pub fn calls_to(&self, method: Method, url: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls_to(method, url).len()
    }

    fn answer(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Reply {
        let owned = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>()
        };
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            headers: owned(headers),
            form: owned(form),
        });

        self.routes
            .lock()
            .unwrap()
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(PortalError::Transport(format!("no route for {url}"))))
    }
}

#[async_trait]
impl PortalTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, PortalError> {
        self.answer(Method::Get, url, &[], &[])
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, PortalError> {
        self.answer(Method::Post, url, headers, form)
    }
}

/// Hands out pre-built transports in order.
#[derive(Default)]
pub(crate) struct FakeFactory {
    queue: Mutex<VecDeque<Arc<FakeTransport>>>,
    opened: AtomicUsize,
}

impl FakeFactory {
    pub fn push(&self, t: Arc<FakeTransport>) {
        self.queue.lock().unwrap().push_back(t);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl TransportFactory for FakeFactory {
    fn open(&self) -> Result<Arc<dyn PortalTransport>, PortalError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.queue.lock().unwrap().pop_front() {
            Some(t) => Ok(t as Arc<dyn PortalTransport>),
            None => Err(PortalError::Transport("no transport scripted".to_string())),
        }
    }
}

pub(crate) fn html_page(status: u16, url: &str, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        url: url.to_string(),
        body: body.to_string(),
    }
}

pub(crate) fn login_page(token: &str) -> HttpResponse {
    html_page(
        200,
        "https://ivas.test/login",
        &format!(
            r#"<html><body><form method="POST">
               <input type="hidden" name="_token" value="{token}">
               </form></body></html>"#
        ),
    )
}

pub(crate) fn portal_home(csrf: &str) -> HttpResponse {
    html_page(
        200,
        "https://ivas.test/portal",
        &format!(r#"<html><head><meta name="csrf-token" content="{csrf}"></head></html>"#),
    )
}
