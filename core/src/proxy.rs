//! Proxy selection.
//!
//! # Design
//! Proxy settings are read through a `ProxySource` at the start of every
//! call instead of straight from the process environment, so tests and
//! embedders can pin them. Host exclusion is a separate predicate; the
//! default one consults `NO_PROXY`/`no_proxy` on each call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::Scheme;

/// Supplies the proxy URI to use for a target scheme, if any.
pub trait ProxySource: Send + Sync {
    fn proxy_for(&self, scheme: Scheme) -> Option<String>;
}

impl<F> ProxySource for F
where
    F: Fn(Scheme) -> Option<String> + Send + Sync,
{
    fn proxy_for(&self, scheme: Scheme) -> Option<String> {
        self(scheme)
    }
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn first_non_empty(lookup: &dyn Fn(&str) -> Option<String>, names: [&str; 2]) -> Option<String> {
    names
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.is_empty())
}

/// Reads `HTTP_PROXY`/`http_proxy` and `HTTPS_PROXY`/`https_proxy`. The first
/// non-empty variable of each pair wins.
#[derive(Clone)]
pub struct EnvProxy {
    lookup: Lookup,
}

impl EnvProxy {
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Use `lookup` in place of the process environment.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    fn first_set(&self, names: [&str; 2]) -> Option<String> {
        first_non_empty(&*self.lookup, names)
    }
}

impl Default for EnvProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvProxy").finish_non_exhaustive()
    }
}

impl ProxySource for EnvProxy {
    fn proxy_for(&self, scheme: Scheme) -> Option<String> {
        match scheme {
            Scheme::Http => self.first_set(["HTTP_PROXY", "http_proxy"]),
            Scheme::Https => self.first_set(["HTTPS_PROXY", "https_proxy"]),
        }
    }
}

/// Fixed proxy settings, typically loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
}

impl ProxySource for ProxyConfig {
    fn proxy_for(&self, scheme: Scheme) -> Option<String> {
        let value = match scheme {
            Scheme::Http => self.http.as_ref(),
            Scheme::Https => self.https.as_ref(),
        };
        value.filter(|v| !v.is_empty()).cloned()
    }
}

/// A `NO_PROXY` style exclusion list.
///
/// Entries are comma separated. `*` matches every host; any other entry
/// matches that host and its subdomains, with or without a leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoProxy {
    entries: Vec<String>,
}

impl NoProxy {
    /// `None` when neither `NO_PROXY` nor `no_proxy` holds any entry. An empty
    /// `NO_PROXY` falls through to `no_proxy`.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `from_env` reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Self::parse(&first_non_empty(&lookup, ["NO_PROXY", "no_proxy"])?)
    }

    pub fn parse(list: &str) -> Option<Self> {
        let entries: Vec<String> = list
            .split(',')
            .map(|entry| entry.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() {
            return None;
        }
        Some(Self { entries })
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
        self.entries.iter().any(|entry| {
            entry == "*"
                || host == *entry
                || host
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Default bypass predicate: the current `NO_PROXY` list.
pub fn env_bypass(host: &str) -> bool {
    NoProxy::from_env().is_some_and(|list| list.matches(host))
}

/// The proxy a request is forwarded through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAgent {
    /// Scheme of the target the proxy was selected for.
    pub target: Scheme,
    pub uri: Url,
}

impl ProxyAgent {
    /// Proxy URIs without a scheme are taken as `http://`.
    pub fn new(target: Scheme, raw: &str) -> Result<Self, url::ParseError> {
        let uri = if raw.contains("://") {
            Url::parse(raw)?
        } else {
            Url::parse(&format!("http://{raw}"))?
        };
        Ok(Self { target, uri })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvProxy {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvProxy::with_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn upper_case_variable_wins() {
        let source = env(&[
            ("HTTP_PROXY", "http://upper:8080"),
            ("http_proxy", "http://lower:8080"),
        ]);
        assert_eq!(source.proxy_for(Scheme::Http).as_deref(), Some("http://upper:8080"));
    }

    #[test]
    fn empty_upper_case_falls_through() {
        let source = env(&[("HTTPS_PROXY", ""), ("https_proxy", "http://lower:3128")]);
        assert_eq!(source.proxy_for(Scheme::Https).as_deref(), Some("http://lower:3128"));
    }

    #[test]
    fn schemes_use_their_own_variables() {
        let source = env(&[("HTTP_PROXY", "http://plain:8080")]);
        assert!(source.proxy_for(Scheme::Https).is_none());
        assert!(source.proxy_for(Scheme::Http).is_some());
    }

    #[test]
    fn static_config_ignores_empty_entries() {
        let config: ProxyConfig =
            serde_json::from_str(r#"{"http":"","https":"http://proxy:8443"}"#).unwrap();
        assert!(config.proxy_for(Scheme::Http).is_none());
        assert_eq!(config.proxy_for(Scheme::Https).as_deref(), Some("http://proxy:8443"));
    }

    #[test]
    fn no_proxy_matches_domains_and_subdomains() {
        let list = NoProxy::parse("example.com, .internal ,LOCALHOST").unwrap();
        assert!(list.matches("example.com"));
        assert!(list.matches("api.example.com"));
        assert!(list.matches("svc.internal"));
        assert!(list.matches("localhost"));
        assert!(!list.matches("notexample.com"));
        assert!(!list.matches("example.org"));
    }

    #[test]
    fn no_proxy_wildcard_matches_everything() {
        let list = NoProxy::parse("*").unwrap();
        assert!(list.matches("anything.test"));
    }

    #[test]
    fn blank_no_proxy_is_none() {
        assert!(NoProxy::parse("").is_none());
        assert!(NoProxy::parse(" , ").is_none());
    }

    #[test]
    fn empty_no_proxy_falls_through_to_lower_case() {
        let vars = HashMap::from([("NO_PROXY", ""), ("no_proxy", "internal.test")]);
        let list = NoProxy::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert!(list.matches("api.internal.test"));

        let vars = HashMap::from([("NO_PROXY", "upper.test"), ("no_proxy", "lower.test")]);
        let list = NoProxy::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert!(list.matches("upper.test"));
        assert!(!list.matches("lower.test"));

        assert!(NoProxy::from_lookup(|_| None).is_none());
    }

    #[test]
    fn agent_defaults_to_http_scheme() {
        let agent = ProxyAgent::new(Scheme::Https, "proxy.local:3128").unwrap();
        assert_eq!(agent.uri.as_str(), "http://proxy.local:3128/");
        assert_eq!(agent.target, Scheme::Https);
    }
}
