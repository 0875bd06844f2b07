use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
enum LoginState {
    AwaitingEmail,
    AwaitingPassword { email: String },
}

/// What the chat layer should do with a text message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The user is not in a login dialogue; the text is not ours.
    Ignored,
    /// Email recorded, ask for the password next.
    AskPassword,
    /// Both credentials collected; the dialogue is over.
    Credentials { email: String, password: String },
}

/// Per-user `/login` dialogue: email, then password.
#[derive(Default)]
pub struct LoginConversations {
    inner: Mutex<HashMap<UserId, LoginState>>,
}

impl LoginConversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the dialogue for `user`.
    pub async fn begin(&self, user: UserId) {
        self.inner
            .lock()
            .await
            .insert(user, LoginState::AwaitingEmail);
    }

    pub async fn advance(&self, user: UserId, text: &str) -> Step {
        let mut map = self.inner.lock().await;
        let Some(state) = map.remove(&user) else {
            return Step::Ignored;
        };

        match state {
            LoginState::AwaitingEmail => {
                map.insert(
                    user,
                    LoginState::AwaitingPassword {
                        email: text.trim().to_string(),
                    },
                );
                Step::AskPassword
            }
            LoginState::AwaitingPassword { email } => Step::Credentials {
                email,
                password: text.to_string(),
            },
        }
    }

    /// Returns whether a dialogue was in progress.
    pub async fn cancel(&self, user: UserId) -> bool {
        self.inner.lock().await.remove(&user).is_some()
    }
}
