use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use super::{Cookie, CookieJar};
use crate::extractor::error::ExtractorError;

pub const JAR_HEADER: &str = "# Netscape HTTP Cookie File";

const COOKIE_PREFIX: &str = "Cookie: ";
const JAR_FIELDS: usize = 7;
const EXPIRY_DAYS: i64 = 10 * 365;

/// Build a jar from a raw `Cookie` request header.
///
/// Pairs without `=`, or with an empty name or value, are logged and skipped.
/// When `filter` is non-empty only the named cookies are kept.
pub fn encode(raw: &str, domain: &str, filter: &[&str]) -> Result<CookieJar, ExtractorError> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(COOKIE_PREFIX).unwrap_or(raw);

    let mut jar = CookieJar::new();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let Some((name, value)) = pair.split_once('=') else {
            warn!(pair, "Ignoring invalid cookie");
            continue;
        };
        if name.is_empty() || value.is_empty() {
            warn!(pair, "Ignoring invalid cookie");
            continue;
        }

        if !filter.is_empty() && !filter.contains(&name) {
            debug!(name, "Cookie not in filter, skipping");
            continue;
        }

        jar.insert(Cookie::new(name, value, domain));
    }

    if jar.is_empty() {
        return Err(ExtractorError::NoValidCookies);
    }
    Ok(jar)
}

/// Persist `jar` at `path`, truncating any existing file.
///
/// Every entry expires ten years from now. The subdomain column is always
/// `TRUE`.
pub fn write_jar(jar: &CookieJar, path: &Path) -> Result<(), ExtractorError> {
    if jar.is_empty() {
        return Err(ExtractorError::NoValidCookies);
    }

    let expires = (Utc::now() + TimeDelta::days(EXPIRY_DAYS)).timestamp();
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(render(jar, expires).as_bytes())?;
    writer.flush()?;

    debug!(path = %path.display(), count = jar.len(), "Cookie jar written");
    Ok(())
}

/// Load a jar written by [`write_jar`] (or any Netscape-format jar).
///
/// Blank lines and `#` lines are ignored; lines without exactly seven
/// tab-separated fields are logged and skipped.
pub fn read_jar(path: &Path) -> Result<CookieJar, ExtractorError> {
    let reader = BufReader::new(File::open(path)?);
    parse(reader)
}

fn render(jar: &CookieJar, expires: i64) -> String {
    let mut out = format!("{JAR_HEADER}\n\n");
    for cookie in jar {
        out.push_str(&format!(
            "{}\tTRUE\t{}\t{}\t{}\t{}\t{}\n",
            cookie.domain,
            cookie.path,
            flag(cookie.secure),
            expires,
            cookie.name,
            cookie.value,
        ));
    }
    out
}

fn parse<R: BufRead>(reader: R) -> Result<CookieJar, ExtractorError> {
    let mut jar = CookieJar::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != JAR_FIELDS {
            warn!(line, "Ignoring invalid cookie jar line");
            continue;
        }

        // fields[1] (include subdomains) and fields[4] (expiry) are not kept
        jar.insert(Cookie {
            domain: fields[0].to_string(),
            path: fields[2].to_string(),
            secure: fields[3] == "TRUE",
            name: fields[5].to_string(),
            value: fields[6].to_string(),
            http_only: false,
        });
    }

    if jar.is_empty() {
        return Err(ExtractorError::NoValidCookies);
    }
    Ok(jar)
}

fn flag(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}
