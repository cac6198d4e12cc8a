//! Case-insensitive keyword sets matched as substrings.
//!
//! Keywords and the text they are matched against are both folded with
//! [`fold`]: lower-cased, trimmed, and with whitespace runs collapsed to a
//! single space. A keyword matches when its folded form is a substring of the
//! folded text.

use serde::{Deserialize, Serialize};

/// Fold text for keyword matching.
pub fn fold(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Trim and collapse whitespace runs to one space, preserving case.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An ordered, de-duplicated set of folded keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = Vec::new();
        for kw in keywords {
            let kw = fold(kw.as_ref());
            if !folded.contains(&kw) {
                folded.push(kw);
            }
        }
        Self { keywords: folded }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// True if any keyword folded to the empty string.
    pub fn has_blank(&self) -> bool {
        self.keywords.iter().any(|k| k.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Distinct keywords found in `folded_text`, in configured order.
    ///
    /// `folded_text` must already be folded.
    pub fn matches<'a>(&'a self, folded_text: &str) -> Vec<&'a str> {
        self.iter()
            .filter(|kw| !kw.is_empty() && folded_text.contains(*kw))
            .collect()
    }

    /// First keyword found in `folded_text`, in configured order.
    pub fn first_match<'a>(&'a self, folded_text: &str) -> Option<&'a str> {
        self.iter()
            .find(|kw| !kw.is_empty() && folded_text.contains(*kw))
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.keywords
    }
}
