//! Origin derivation and URL resolution.

use std::fmt;
use url::{ParseError, Url};

use crate::errors::{PageWalkError, Result};

/// Scheme + host (+ port) of the page a browsing session started from.
///
/// All relative image and link paths are resolved against this value. It is
/// fixed when a session begins and held for every page of a pagination run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    url: Url,
}

impl Origin {
    /// Derives the origin of a page URL, dropping credentials, path, query and fragment.
    pub fn from_page_url(page: &Url) -> Result<Self> {
        if !is_http_scheme(page.scheme()) {
            return Err(PageWalkError::invalid_url(
                page.as_str(),
                format!("unsupported scheme '{}'", page.scheme()),
            ));
        }
        if page.host_str().is_none() {
            return Err(PageWalkError::invalid_url(page.as_str(), "missing host"));
        }

        let mut url = page.clone();
        url.set_path("");
        url.set_query(None);
        url.set_fragment(None);
        // Both only fail for URLs without a host, excluded above.
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self { url })
    }

    /// Parses user-typed text into an origin, fixing a missing scheme first.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_page_url(&parse_page_url(input)?)
    }

    /// The origin as a URL with an empty path.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// The origin's host.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Value for the `Referer` header, e.g. `https://example.com`.
    #[must_use]
    pub fn referer(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Resolves a raw attribute value into an absolute URL.
    ///
    /// Surrounding whitespace is trimmed first.
    ///
    /// - `//host/path` gets an `https:` prefix.
    /// - Values without a host, and values whose host is `localhost`, keep
    ///   only their path and take this origin's scheme, host and port. This
    ///   covers relative paths as well as `data:` and `javascript:` values.
    /// - Absolute `http`/`https` URLs are returned unchanged; other schemes
    ///   with a host get an `https://` prefix.
    ///
    /// Returns `None` for values that cannot be parsed.
    #[must_use]
    pub fn process_url(&self, raw: &str) -> Option<Url> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let candidate = if raw.starts_with("//") {
            format!("https:{raw}")
        } else {
            raw.to_string()
        };

        match Url::parse(&candidate) {
            Ok(url) => match url.host_str() {
                Some(host) if !host.eq_ignore_ascii_case("localhost") => with_web_scheme(url),
                _ => Some(self.join_path(url.path())),
            },
            Err(ParseError::RelativeUrlWithoutBase) => Some(self.join_path(path_of(raw))),
            Err(_) => None,
        }
    }

    fn join_path(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        if path.starts_with('/') {
            url.set_path(path);
        } else {
            url.set_path(&format!("/{path}"));
        }
        url
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.referer())
    }
}

/// Adds `https:` to protocol-relative input and `https://` to input with no web scheme.
#[must_use]
pub fn fix_scheme(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("//") {
        return format!("https:{raw}");
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Parses a page address as typed by a user or reported by a web view.
pub fn parse_page_url(input: &str) -> Result<Url> {
    let fixed = fix_scheme(input);
    let url = Url::parse(&fixed).map_err(|e| PageWalkError::invalid_url(input, e.to_string()))?;
    if url.host_str().is_none() {
        return Err(PageWalkError::invalid_url(input, "missing host"));
    }
    Ok(url)
}

fn is_http_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

fn with_web_scheme(url: Url) -> Option<Url> {
    if is_http_scheme(url.scheme()) {
        Some(url)
    } else {
        Url::parse(&format!("https://{url}")).ok()
    }
}

/// The path portion of a relative reference, without query or fragment.
fn path_of(raw: &str) -> &str {
    raw.split(['?', '#']).next().unwrap_or_default()
}
