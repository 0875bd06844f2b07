use std::sync::Arc;

use ivas_core::{config::Config, registry::SessionRegistry, service::PortalService};
use ivas_http::{HttpSettings, ReqwestFactory};

#[tokio::main]
async fn main() -> Result<(), ivas_core::Error> {
    ivas_core::logging::init("ivas")?;

    let cfg = Arc::new(Config::load()?);

    let factory = Arc::new(ReqwestFactory::new(HttpSettings {
        timeout: cfg.portal_timeout,
        user_agent: cfg.user_agent.clone(),
    }));

    let service = Arc::new(PortalService::new(
        Arc::new(SessionRegistry::new()),
        factory,
        cfg.endpoints(),
        cfg.captcha_placeholder.clone(),
    ));

    ivas_telegram::router::run_polling(cfg, service)
        .await
        .map_err(|e| ivas_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
