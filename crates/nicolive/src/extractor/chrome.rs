use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, EventRequestWillBeSent, ResourceType as CdpResourceType,
    SetCookiesParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::browser::{BrowserLauncher, BrowserSession, NetworkRequest, RequestStream, ResourceType};
use super::error::ExtractorError;
use crate::cookies::Cookie;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: Option<String>,
    /// How often DOM waits re-check their condition.
    pub poll_interval: Duration,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            user_agent: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Launches a local Chrome over the DevTools protocol.
pub struct ChromeLauncher {
    config: ChromeConfig,
}

impl ChromeLauncher {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ExtractorError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--autoplay-policy=no-user-gesture-required");

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(ua) = &self.config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }

        builder.build().map_err(ExtractorError::automation)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ExtractorError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(ExtractorError::automation)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shutdown(&mut browser, &handler).await;
                return Err(ExtractorError::automation(e));
            }
        };

        debug!("Browser session started");
        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler,
            poll_interval: self.config.poll_interval,
            released: false,
        }))
    }
}

/// Close the browser, reap its process and stop the CDP handler.
async fn shutdown(browser: &mut Browser, handler: &JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {e}");
    }
    if let Err(e) = browser.wait().await {
        warn!("Failed to wait for browser exit: {e}");
    }
    handler.abort();
}

struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    released: bool,
}

impl ChromeSession {
    async fn eval_bool(&self, expression: String) -> Result<bool, ExtractorError> {
        self.page
            .evaluate_expression(expression)
            .await
            .map_err(ExtractorError::automation)?
            .into_value::<bool>()
            .map_err(ExtractorError::automation)
    }

    /// Poll `predicate` until it returns `true`. Evaluation failures (e.g. a
    /// context torn down mid-navigation) count as "not yet".
    async fn wait_until(&self, selector: &str, predicate: &str) -> Result<(), ExtractorError> {
        let literal = serde_json::to_string(selector).map_err(ExtractorError::automation)?;
        let expression = predicate.replace("$SELECTOR", &literal);

        loop {
            match self.eval_bool(expression.clone()).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!(selector, "DOM wait evaluation failed: {e}"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

const VISIBLE_PREDICATE: &str = "(() => { \
    const el = document.querySelector($SELECTOR); \
    if (!el) return false; \
    const style = window.getComputedStyle(el); \
    const rect = el.getBoundingClientRect(); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && rect.width > 0 && rect.height > 0; \
})()";

const ENABLED_PREDICATE: &str = "(() => { \
    const el = document.querySelector($SELECTOR); \
    return !!el && !el.disabled; \
})()";

fn resource_type(cdp: Option<&CdpResourceType>) -> ResourceType {
    match cdp {
        Some(CdpResourceType::Document) => ResourceType::Document,
        Some(CdpResourceType::Script) => ResourceType::Script,
        Some(CdpResourceType::Xhr) => ResourceType::Xhr,
        Some(CdpResourceType::Fetch) => ResourceType::Fetch,
        Some(CdpResourceType::Media) => ResourceType::Media,
        _ => ResourceType::Other,
    }
}

fn cookie_param(cookie: &Cookie) -> Result<CookieParam, ExtractorError> {
    CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only)
        .build()
        .map_err(ExtractorError::automation)
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn subscribe_requests(&mut self) -> Result<RequestStream, ExtractorError> {
        let events = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(ExtractorError::automation)?;

        Ok(events
            .map(|event| {
                NetworkRequest::new(event.request.url.clone(), resource_type(event.r#type.as_ref()))
            })
            .boxed())
    }

    async fn enable_network(&mut self) -> Result<(), ExtractorError> {
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(ExtractorError::automation)?;
        Ok(())
    }

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ExtractorError> {
        let params = cookies
            .iter()
            .map(cookie_param)
            .collect::<Result<Vec<_>, _>>()?;
        self.page
            .execute(SetCookiesParams::new(params))
            .await
            .map_err(ExtractorError::automation)?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), ExtractorError> {
        self.page
            .goto(url)
            .await
            .map_err(ExtractorError::automation)?;
        Ok(())
    }

    async fn wait_visible(&mut self, selector: &str) -> Result<(), ExtractorError> {
        self.wait_until(selector, VISIBLE_PREDICATE).await
    }

    async fn wait_enabled(&mut self, selector: &str) -> Result<(), ExtractorError> {
        self.wait_until(selector, ENABLED_PREDICATE).await
    }

    async fn click(&mut self, selector: &str) -> Result<(), ExtractorError> {
        self.page
            .find_element(selector)
            .await
            .map_err(ExtractorError::automation)?
            .click()
            .await
            .map_err(ExtractorError::automation)?;
        Ok(())
    }

    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        shutdown(&mut self.browser, &self.handler).await;
        debug!("Browser session released");
    }
}
