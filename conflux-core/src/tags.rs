//! Tag rewrite rules.

use std::fmt;
use std::str::FromStr;

use crate::Tags;

/// A `key=value` pair where an empty value acts as a wildcard.
///
/// # Examples
///
/// ```
/// use conflux_core::Tag;
///
/// let tag: Tag = "highway=residential".parse().unwrap_or_default();
/// assert_eq!(tag.key, "highway");
/// assert_eq!(tag.value, "residential");
///
/// let any: Tag = "highway".parse().unwrap_or_default();
/// assert!(any.value.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Tag key. An empty key matches nothing.
    pub key: String,
    /// Tag value. Empty means "any value" when matching and "keep the
    /// original value" when rewriting.
    pub value: String,
}

impl Tag {
    /// Construct a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Tag matching `key` with any value.
    #[must_use]
    pub fn any(key: impl Into<String>) -> Self {
        Self::new(key, String::new())
    }

    fn matches(&self, tags: &Tags) -> bool {
        !self.key.is_empty()
            && tags
                .get(&self.key)
                .is_some_and(|value| self.value.is_empty() || *value == self.value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.key)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

impl FromStr for Tag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once('=') {
            Some((key, value)) => Self::new(key.trim(), value.trim()),
            None => Self::any(s.trim()),
        })
    }
}

/// Ordered rewrite rules applied to every primitive's tags.
///
/// Each rule maps a source [`Tag`] to a target [`Tag`]:
///
/// - an empty source key makes the rule a no-op;
/// - an empty target key deletes the matched tag;
/// - otherwise the matched tag is renamed to the target key and takes the
///   target value, or keeps its own when the target value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagMapping {
    rules: Vec<(Tag, Tag)>,
}

impl TagMapping {
    /// Create an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, from: Tag, to: Tag) -> Self {
        self.rules.push((from, to));
        self
    }

    /// Rules in application order.
    #[must_use]
    pub fn rules(&self) -> &[(Tag, Tag)] {
        &self.rules
    }

    /// Return `true` when there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite `tags` in place.
    pub fn apply(&self, tags: &mut Tags) {
        for (from, to) in &self.rules {
            if !from.matches(tags) {
                continue;
            }
            let Some(original) = tags.remove(&from.key) else {
                continue;
            };
            if to.key.is_empty() {
                continue;
            }
            let value = if to.value.is_empty() {
                original
            } else {
                to.value.clone()
            };
            tags.insert(to.key.clone(), value);
        }
    }
}

impl FromIterator<(Tag, Tag)> for TagMapping {
    fn from_iter<I: IntoIterator<Item = (Tag, Tag)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
