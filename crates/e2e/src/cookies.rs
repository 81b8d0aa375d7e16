//! Cookie jar shared by every request a client makes

use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Name to value store fed by `Set-Cookie` and replayed as `Cookie`
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Insert or overwrite an entry
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored `(name, value)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Store the `name=value` pair of one `Set-Cookie` line. Attributes after
    /// the first `; ` are ignored. Returns the stored name, or `None` when
    /// the line carries no pair.
    pub fn store_set_cookie(&mut self, line: &str) -> Option<String> {
        let pair = line.split("; ").next().unwrap_or_default();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        self.entries.insert(name.to_string(), value.to_string());
        Some(name.to_string())
    }

    /// Merge every `Set-Cookie` header of a response. Returns the lines that
    /// could not be parsed.
    pub fn absorb(&mut self, headers: &HeaderMap) -> Vec<String> {
        let mut rejected = Vec::new();

        for value in headers.get_all(SET_COOKIE) {
            let line = String::from_utf8_lossy(value.as_bytes());
            if self.store_set_cookie(&line).is_none() {
                rejected.push(line.into_owned());
            }
        }

        rejected
    }

    /// Value for a single `Cookie` request header, `None` when empty
    pub fn header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        Some(pairs.join("; "))
    }
}
