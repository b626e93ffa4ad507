//! Ordered, de-duplicated recipient list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Parse a comma-separated list: entries are trimmed, empties dropped,
    /// repeats removed keeping the first occurrence.
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

impl<S: AsRef<str>> FromIterator<S> for Recipients {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out: Vec<String> = Vec::new();
        for entry in iter {
            let addr = entry.as_ref().trim();
            if addr.is_empty() {
                continue;
            }
            // Addresses compare case-insensitively for de-duplication only.
            if !out.iter().any(|a| a.eq_ignore_ascii_case(addr)) {
                out.push(addr.to_string());
            }
        }
        Recipients(out)
    }
}
