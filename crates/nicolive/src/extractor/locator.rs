use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use super::browser::{BrowserLauncher, BrowserSession, RequestStream, ResourceType};
use super::error::ExtractorError;
use crate::cookies::CookieJar;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Path fragment of the master playlist request issued by the player.
const MANIFEST_MARKER: &str = "/playlists/variants/";

/// CSS selectors the locator waits on before starting playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    /// Element that only becomes visible once the player has rendered.
    pub footer: String,
    pub play_button: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            footer: "#akashic-gameview".to_string(),
            play_button: r#"#root button[aria-label="再生 (Space)"]"#.to_string(),
        }
    }
}

/// Write-once slot for the manifest url. The first resolve wins.
#[derive(Clone)]
struct ManifestSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl ManifestSignal {
    fn new() -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Returns `false` if the signal was already resolved.
    fn resolve(&self, url: String) -> bool {
        match self.slot.lock().take() {
            Some(tx) => tx.send(url).is_ok(),
            None => false,
        }
    }
}

/// Aborts the request observer when the locate call ends.
struct ObserverGuard(JoinHandle<()>);

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

fn is_manifest_request(resource_type: ResourceType, url: &str) -> bool {
    resource_type == ResourceType::Xhr && url.contains(MANIFEST_MARKER)
}

async fn observe(mut requests: RequestStream, signal: ManifestSignal) {
    while let Some(request) = requests.next().await {
        if is_manifest_request(request.resource_type, &request.url) {
            if signal.resolve(request.url.clone()) {
                debug!(url = %request.url, "Captured manifest request");
            } else {
                debug!(url = %request.url, "Ignoring repeated manifest request");
            }
        }
    }
}

/// Finds the master playlist url of a live event page by playing it in a
/// browser and watching the requests it makes.
pub struct ManifestLocator {
    launcher: Arc<dyn BrowserLauncher>,
    selectors: PageSelectors,
}

impl ManifestLocator {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            selectors: PageSelectors::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: PageSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Open `page_url` with `jar`'s cookies, start playback and return the
    /// first master playlist url the player requests.
    ///
    /// The whole call, browser launch included, is bounded by `timeout`. The
    /// browser session is released on every exit path.
    pub async fn locate(
        &self,
        page_url: &str,
        jar: &CookieJar,
        timeout: Duration,
    ) -> Result<String, ExtractorError> {
        let deadline = deadline_after(timeout);
        let timed_out = |source| ExtractorError::LocatorTimeout { timeout, source };

        info!(url = page_url, "Locating manifest");
        let mut session = timeout_at(deadline, self.launcher.launch())
            .await
            .map_err(timed_out)??;

        let outcome = timeout_at(deadline, self.drive(session.as_mut(), page_url, jar)).await;
        session.release().await;

        let url = outcome.map_err(timed_out)??;
        if url.is_empty() {
            return Err(ExtractorError::EmptyManifest);
        }

        info!(manifest = %url, "Manifest located");
        Ok(url)
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        page_url: &str,
        jar: &CookieJar,
    ) -> Result<String, ExtractorError> {
        let (signal, rx) = ManifestSignal::new();
        let requests = session.subscribe_requests().await?;
        let _observer = ObserverGuard(tokio::spawn(observe(requests, signal)));

        session.enable_network().await?;
        if !jar.is_empty() {
            session.set_cookies(jar.as_slice()).await?;
        }
        session.navigate(page_url).await?;
        session.wait_visible(&self.selectors.footer).await?;
        session.wait_enabled(&self.selectors.play_button).await?;
        session.click(&self.selectors.play_button).await?;
        debug!("Playback started, waiting for manifest request");

        match rx.await {
            Ok(url) => Ok(url),
            // The request stream ended without a match; only the deadline can end the wait.
            Err(_) => std::future::pending().await,
        }
    }
}
