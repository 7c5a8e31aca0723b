//! Cookie model and the Netscape jar codec.

mod netscape;

pub use netscape::{JAR_HEADER, encode, read_jar, write_jar};

use serde::{Deserialize, Serialize};

/// Domain the site's session cookies are scoped to.
pub const DEFAULT_COOKIE_DOMAIN: &str = ".nicovideo.jp";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// A host cookie scoped to `/`, neither secure nor http-only.
    pub fn new<N: Into<String>, V: Into<String>, D: Into<String>>(
        name: N,
        value: V,
        domain: D,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            secure: false,
            http_only: false,
        }
    }
}

/// An ordered set of cookies, unique by `(name, domain)`.
///
/// Insertion order is kept so the written jar is deterministic. Inserting a
/// cookie whose `(name, domain)` already exists replaces the earlier entry in
/// place.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cookie: Cookie) {
        match self
            .cookies
            .iter_mut()
            .find(|c| c.name == cookie.name && c.domain == cookie.domain)
        {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn get(&self, name: &str, domain: &str) -> Option<&Cookie> {
        self.cookies
            .iter()
            .find(|c| c.name == name && c.domain == domain)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cookie> {
        self.cookies.iter()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn as_slice(&self) -> &[Cookie] {
        &self.cookies
    }
}

impl<'a> IntoIterator for &'a CookieJar {
    type Item = &'a Cookie;
    type IntoIter = std::slice::Iter<'a, Cookie>;

    fn into_iter(self) -> Self::IntoIter {
        self.cookies.iter()
    }
}

impl FromIterator<Cookie> for CookieJar {
    fn from_iter<I: IntoIterator<Item = Cookie>>(iter: I) -> Self {
        let mut jar = CookieJar::new();
        for cookie in iter {
            jar.insert(cookie);
        }
        jar
    }
}
