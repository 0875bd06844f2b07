use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

const DEFAULT_BASE_URL: &str = "https://www.ivasms.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";
const DEFAULT_CAPTCHA_PLACEHOLDER: &str = "simulated_recaptcha_response";

/// Typed configuration for the bot process.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub group_chat_id: i64,
    pub telegram_safe_limit: usize,

    // Portal
    pub portal_base_url: String,
    pub portal_timeout: Duration,
    pub user_agent: String,
    pub captcha_placeholder: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| env_str("BOT_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let group_chat_id = match env_str("GROUP_CHAT_ID").and_then(non_empty) {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("GROUP_CHAT_ID must be a numeric chat id, got {raw:?}"))
            })?,
            None => {
                return Err(Error::Config(
                    "GROUP_CHAT_ID environment variable is required".to_string(),
                ))
            }
        };

        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000).max(200);

        let portal_base_url = env_str("IVAS_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let portal_base_url = portal_base_url.trim().trim_end_matches('/').to_string();
        if !portal_base_url.starts_with("http://") && !portal_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "IVAS_BASE_URL must be an http(s) url, got {portal_base_url:?}"
            )));
        }

        let portal_timeout =
            Duration::from_millis(env_u64("PORTAL_TIMEOUT_MS").unwrap_or(30_000).max(1));
        let user_agent = env_str("PORTAL_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let captcha_placeholder = env_str("CAPTCHA_PLACEHOLDER")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_CAPTCHA_PLACEHOLDER.to_string());

        Ok(Self {
            telegram_bot_token,
            group_chat_id,
            telegram_safe_limit,
            portal_base_url,
            portal_timeout,
            user_agent,
            captcha_placeholder,
        })
    }

    pub fn endpoints(&self) -> PortalEndpoints {
        PortalEndpoints::from_base(&self.portal_base_url)
    }
}

/// Absolute URLs of the portal pages the client talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalEndpoints {
    pub origin: String,
    pub login: String,
    pub home: String,
    pub messages: String,
    pub numbers: String,
    /// Path fragment present in every URL of the authenticated area.
    pub portal_marker: String,
    /// Path of the authenticated landing page (used by the expiry probe).
    pub home_path: String,
}

impl PortalEndpoints {
    pub fn from_base(base: &str) -> Self {
        let origin = base.trim().trim_end_matches('/').to_string();
        Self {
            login: format!("{origin}/login"),
            home: format!("{origin}/portal"),
            messages: format!("{origin}/portal/live/my_sms"),
            numbers: format!("{origin}/portal/live/getNumbers"),
            portal_marker: "portal".to_string(),
            home_path: "/portal".to_string(),
            origin,
        }
    }
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_BASE_URL)
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
