//! Page artifact file names.

use std::path::Path;

/// Placeholder for the page number in an output pattern.
pub const PAGE_PLACEHOLDER: &str = "{p}";

/// File-name pattern of page artifacts, split around the page placeholder.
///
/// `output/p{p}.svg` gives prefix `p` and suffix `.svg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePattern {
    prefix: String,
    suffix: String,
}

impl Default for PagePattern {
    fn default() -> Self {
        Self {
            prefix: "p".into(),
            suffix: ".svg".into(),
        }
    }
}

impl PagePattern {
    /// Parse the file-name part of an output pattern.
    ///
    /// Returns `None` unless the file name holds exactly one placeholder.
    pub fn parse(pattern: &str) -> Option<Self> {
        let name = Path::new(pattern).file_name()?.to_str()?;
        let (prefix, suffix) = name.split_once(PAGE_PLACEHOLDER)?;
        if suffix.contains(PAGE_PLACEHOLDER) {
            return None;
        }

        Some(Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        })
    }

    /// Whether `name` looks like a page artifact.
    pub fn matches(&self, name: &str) -> bool {
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }

    /// Page number embedded in `name`; 0 when it is malformed.
    pub fn parse_index(&self, name: &str) -> u32 {
        if !self.matches(name) {
            return 0;
        }
        name[self.prefix.len()..name.len() - self.suffix.len()]
            .parse()
            .unwrap_or(0)
    }
}

/// Page number embedded in `file_name` under `pattern`; 0 when malformed.
pub fn parse_page_index(file_name: &str, pattern: &PagePattern) -> u32 {
    pattern.parse_index(file_name)
}
