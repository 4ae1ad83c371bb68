//! Host identity extraction.
//!
//! The story backend is keyed by a numeric user id. A mini-app host hands
//! it over inside its signed init data; a plain browser link carries it as
//! a `user_id` query parameter. Either source may be missing or garbled,
//! in which case there is simply no identity.

use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Opaque identifier the graph is fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Accept the string form of a finite, non-zero number.
    ///
    /// Integral values come out in plain integer form, so `"1e3"` reads as `1000`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return (id != 0).then(|| Self(id.to_string()));
        }

        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v != 0.0)?;
        Some(Self(value.to_string()))
    }

    /// Read `user.id` from a mini-app init-data query string.
    pub fn from_init_data(raw: &str) -> Option<Self> {
        let user = query_param(raw, "user")?;
        let user: Value = match serde_json::from_str(&user) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "init data user is not JSON");
                return None;
            }
        };

        match user.get("id")? {
            Value::Number(n) => Self::parse(&n.to_string()),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Read the `user_id` parameter of a URL query string.
    pub fn from_query(raw: &str) -> Option<Self> {
        Self::parse(&query_param(raw, "user_id")?)
    }

    /// Init data first, then the URL query.
    pub fn resolve(init_data: Option<&str>, query: Option<&str>) -> Option<Self> {
        init_data
            .and_then(Self::from_init_data)
            .or_else(|| query.and_then(Self::from_query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn query_param(raw: &str, key: &str) -> Option<String> {
    let raw = raw.trim().trim_start_matches('?');
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).ok()?;
    pairs.into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}
