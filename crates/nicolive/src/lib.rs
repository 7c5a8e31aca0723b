//! # nicolive-extractor
//!
//! Pulls a downloadable stream out of a cookie-gated, script-rendered live
//! event page.
//!
//! The pipeline is:
//!
//! 1. [`cookies`] turns a raw `Cookie:` header into a [`cookies::CookieJar`]
//!    and persists it in the Netscape text layout.
//! 2. [`extractor::ManifestLocator`] drives a browser session until the page
//!    requests its master playlist.
//! 3. [`extractor::parse_master`] splits that playlist into audio and video
//!    variants, and [`extractor::select_best`] ranks them.
//! 4. [`playlist::PlaylistRewriter`] repairs the chosen sub-playlist and hands
//!    it to an external segment downloader.

pub mod cookies;
pub mod extractor;
pub mod media;
pub mod playlist;
pub mod process;

#[cfg(test)]
mod test_support;

pub use cookies::{Cookie, CookieJar};
pub use extractor::error::{ErrorKind, ExtractorError};
pub use media::{Quality, Track, Variant};
