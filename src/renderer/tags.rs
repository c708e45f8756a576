//! Tag selector.
//!
//! The selector is a regular expression tested against each tagged object's
//! tag. Objects without a tag core always pass. Match results are memoized on
//! the object together with the selector version, so they are only
//! re-evaluated after the selector changes.

use regex::Regex;

use crate::errors::Result;
use crate::scene::{CoreRef, TagCore};

#[derive(Debug, Default)]
pub struct TagSelector {
    pattern: Option<Regex>,
    version: u64,
}

impl TagSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `selector`; an empty selector clears it.
    ///
    /// On a bad pattern the previous selector stays active.
    pub fn select(&mut self, selector: &str) -> Result<()> {
        if selector.is_empty() {
            self.clear();
            return Ok(());
        }
        let pattern = Regex::new(selector)?;
        self.pattern = Some(pattern);
        self.version += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        if self.pattern.take().is_some() {
            self.version += 1;
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Tests `tag`, reusing `memo` when it was computed for this selector version.
    pub fn matches(&self, tag: &CoreRef<TagCore>, memo: &mut Option<(u64, bool)>) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        let Some(tag) = tag.present() else {
            return true;
        };
        if let Some((version, matched)) = *memo {
            if version == self.version {
                return matched;
            }
        }
        let matched = pattern.is_match(&tag.tag);
        *memo = Some((self.version, matched));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_selector_passes_everything() {
        let selector = TagSelector::new();
        let mut memo = None;
        assert!(selector.matches(&CoreRef::new(TagCore::new("x")), &mut memo));
        assert_eq!(memo, None);
    }

    #[test]
    fn test_untagged_objects_pass() {
        let mut selector = TagSelector::new();
        selector.select("^red$").unwrap();
        assert!(selector.matches(&CoreRef::Absent, &mut None));
    }

    #[test]
    fn test_match_is_memoized_per_version() {
        let mut selector = TagSelector::new();
        selector.select("red").unwrap();
        let tag = CoreRef::new(TagCore::new("red-box"));
        let mut memo = None;
        assert!(selector.matches(&tag, &mut memo));
        assert_eq!(memo, Some((selector.version(), true)));

        // A stale memo from a different version is recomputed.
        selector.select("blue").unwrap();
        assert!(!selector.matches(&tag, &mut memo));
        assert_eq!(memo, Some((selector.version(), false)));
    }

    #[test]
    fn test_bad_pattern_keeps_previous() {
        let mut selector = TagSelector::new();
        selector.select("red").unwrap();
        assert!(selector.select("(").is_err());
        assert_eq!(selector.as_str(), Some("red"));
    }
}
