use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{domain::UserId, portal::PortalSession};

/// Process-wide map from Telegram user to their logged-in portal session.
///
/// Owned by the application state and shared by reference. At most one
/// session per user; the last `put` wins and the replaced session is simply
/// dropped once no in-flight request holds it.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<UserId, Arc<PortalSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, user: UserId, session: Arc<PortalSession>) {
        self.inner.lock().await.insert(user, session);
    }

    /// `None` means the caller has to start a login first.
    pub async fn get(&self, user: UserId) -> Option<Arc<PortalSession>> {
        self.inner.lock().await.get(&user).cloned()
    }

    pub async fn remove(&self, user: UserId) -> Option<Arc<PortalSession>> {
        self.inner.lock().await.remove(&user)
    }

    /// Evict `user` only if the stored session is still `session`.
    ///
    /// Keeps a concurrent re-login from being thrown away by an expiry probe
    /// that ran against the older session.
    pub async fn remove_if_same(&self, user: UserId, session: &Arc<PortalSession>) -> bool {
        let mut map = self.inner.lock().await;
        match map.get(&user) {
            Some(current) if Arc::ptr_eq(current, session) => {
                map.remove(&user);
                true
            }
            _ => false,
        }
    }

    /// Number of users with a session.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
