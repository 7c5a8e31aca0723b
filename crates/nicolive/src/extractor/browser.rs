//! Browser automation capability used by the manifest locator.
//!
//! [`ManifestLocator`](super::ManifestLocator) only talks to these traits, so
//! it can run against a scripted fake in tests and against
//! [`ChromeLauncher`](super::ChromeLauncher) in production.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::ExtractorError;
use crate::cookies::Cookie;

/// Resource type of an outgoing request, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Document,
    Script,
    Xhr,
    Fetch,
    Media,
    Other,
}

/// An outgoing request observed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub url: String,
    pub resource_type: ResourceType,
}

impl NetworkRequest {
    pub fn new<S: Into<String>>(url: S, resource_type: ResourceType) -> Self {
        Self {
            url: url.into(),
            resource_type,
        }
    }
}

pub type RequestStream = BoxStream<'static, NetworkRequest>;

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ExtractorError>;
}

/// A live page in a launched browser.
///
/// Callers must call [`release`](BrowserSession::release) once they are done,
/// whatever the outcome of the other calls.
#[async_trait]
pub trait BrowserSession: Send {
    /// Stream of every request the page sends from now on.
    async fn subscribe_requests(&mut self) -> Result<RequestStream, ExtractorError>;

    async fn enable_network(&mut self) -> Result<(), ExtractorError>;

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ExtractorError>;

    async fn navigate(&mut self, url: &str) -> Result<(), ExtractorError>;

    /// Resolves once an element matching `selector` is rendered and visible.
    async fn wait_visible(&mut self, selector: &str) -> Result<(), ExtractorError>;

    /// Resolves once an element matching `selector` exists and is not disabled.
    async fn wait_enabled(&mut self, selector: &str) -> Result<(), ExtractorError>;

    async fn click(&mut self, selector: &str) -> Result<(), ExtractorError>;

    /// Close the page and the browser process. Never fails; problems are logged.
    async fn release(&mut self);
}
