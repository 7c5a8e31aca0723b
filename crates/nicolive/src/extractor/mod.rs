pub mod browser;
pub mod chrome;
mod default;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod selector;

pub use browser::{BrowserLauncher, BrowserSession, NetworkRequest, RequestStream, ResourceType};
pub use chrome::{ChromeConfig, ChromeLauncher};
pub use default::{DEFAULT_UA, create_client};
pub use locator::{DEFAULT_LOCATE_TIMEOUT, ManifestLocator, PageSelectors};
pub use manifest::{MasterPlaylist, parse_master};
pub use selector::select_best;
