//! `Set-Cookie` parsing and `Cookie` header assembly.
//!
//! Only the leading `name=value` pair of a `Set-Cookie` value is used;
//! attributes such as `Path` or `Max-Age` are kept verbatim in `raw` and
//! otherwise ignored.

use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
    /// The complete header value the pair was parsed from.
    pub raw: String,
}

impl CookiePair {
    /// Parse a single `Set-Cookie` header value.
    pub fn parse(set_cookie: &str) -> Option<Self> {
        let pair = set_cookie.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            raw: set_cookie.to_string(),
        })
    }
}

impl fmt::Display for CookiePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Ordered cookies from the `Set-Cookie` headers of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCookies {
    cookies: Vec<CookiePair>,
}

impl SetCookies {
    /// Collect every parseable `Set-Cookie` header, preserving order.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(CookiePair::parse)
            .collect();

        Self { cookies }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn first(&self) -> Option<&CookiePair> {
        self.cookies.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookiePair> {
        self.cookies.iter()
    }

    /// Exact name lookup.
    pub fn find_cookie(&self, name: &str) -> Option<&CookiePair> {
        self.cookies.iter().find(|cookie| cookie.name == name)
    }

    /// First cookie whose name starts with `prefix`.
    ///
    /// The provider suffixes its session cookie names with a client hash,
    /// e.g. `oauth2_consent_csrf_1234`.
    pub fn find_cookie_with_prefix(&self, prefix: &str) -> Option<&CookiePair> {
        self.cookies
            .iter()
            .find(|cookie| cookie.name.starts_with(prefix))
    }

    /// Exact name lookup that also reports where the cookie was found.
    pub fn position_of(&self, name: &str) -> Option<(usize, &CookiePair)> {
        self.cookies
            .iter()
            .enumerate()
            .find(|(_, cookie)| cookie.name == name)
    }
}

impl FromIterator<CookiePair> for SetCookies {
    fn from_iter<I: IntoIterator<Item = CookiePair>>(iter: I) -> Self {
        Self {
            cookies: iter.into_iter().collect(),
        }
    }
}

/// Join cookies into a `Cookie` request header value.
pub fn cookie_header<'a>(cookies: impl IntoIterator<Item = &'a CookiePair>) -> String {
    cookies
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
