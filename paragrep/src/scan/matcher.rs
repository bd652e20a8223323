use regex::bytes::Regex;
use tracing::debug;

use crate::errors::ScanResult;

/// Wraps a user pattern so matches must sit on word-like boundaries: the
/// characters around a match (if any) are non-alphanumeric, non-underscore.
/// `cat` therefore matches in `cat sat` but not inside `category`.
pub(crate) fn wrap_word_boundaries(pattern: &str) -> String {
    format!("(^|[^[:alnum:]_])({pattern})([^[:alnum:]_]|$)")
}

/// Compiled matcher applied to each completed paragraph.
#[derive(Debug, Clone)]
pub struct ParagraphMatcher {
    regex: Regex,
}

impl ParagraphMatcher {
    /// Wraps and compiles the user pattern. Compilation failure is fatal
    /// for the run and carries the regex diagnostic.
    pub fn new(pattern: &str) -> ScanResult<Self> {
        let wrapped = wrap_word_boundaries(pattern);
        debug!("compiling wrapped pattern: {}", wrapped);
        let regex = Regex::new(&wrapped)?;
        Ok(ParagraphMatcher { regex })
    }

    /// Tests one paragraph. Byte-oriented so content need not be UTF-8.
    pub fn is_match(&self, paragraph: &[u8]) -> bool {
        self.regex.is_match(paragraph)
    }
}
