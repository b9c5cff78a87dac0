//! Region attribute parsing
//!
//! Regions carry raw tag strings such as `_internal_name:target0`,
//! `points:10` or `command:play_sound(beep.wav)`. A key may repeat, so the
//! parsed form is an ordered multimap.

use serde::{Deserialize, Serialize};

use super::{COMMAND_TAG, INTERNAL_NAME_TAG};

/// Ordered multimap of region attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTags {
    entries: Vec<(String, Vec<String>)>,
}

impl RegionTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a key, keeping the key's first position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Record a bare key with no value
    pub fn insert_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.contains(&key) {
            self.entries.push((key, Vec::new()));
        }
    }

    /// All values for a key, in insertion order
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// First value for a key
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Whether this region belongs to an interactive target
    pub fn is_interactive(&self) -> bool {
        self.contains(INTERNAL_NAME_TAG)
    }

    /// Command strings attached to the region
    pub fn commands(&self) -> &[String] {
        self.get(COMMAND_TAG).unwrap_or(&[])
    }

    /// Group tag of the target this region belongs to
    pub fn target_tag(&self) -> Option<String> {
        self.first(INTERNAL_NAME_TAG)
            .map(|name| super::tag(INTERNAL_NAME_TAG, name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts raw surface tags into [`RegionTags`]
pub struct TagParser;

impl TagParser {
    /// Split each tag on its first `:`. Tags without a separator become bare keys.
    pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> RegionTags {
        let mut tags = RegionTags::new();
        for tag in raw {
            match tag.as_ref().split_once(':') {
                Some((key, value)) => tags.insert(key, value),
                None => tags.insert_key(tag.as_ref()),
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_commands() {
        let tags = TagParser::parse_tags(&[
            "_internal_name:target0",
            "command:play_sound(beep.wav)",
            "points:5",
            "command:clear_shots()",
        ]);

        assert!(tags.is_interactive());
        assert_eq!(tags.commands(), &["play_sound(beep.wav)", "clear_shots()"]);
        assert_eq!(tags.first("points"), Some("5"));
        assert_eq!(tags.target_tag().as_deref(), Some("_internal_name:target0"));

        // Keys keep first-seen order
        let keys: Vec<&str> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["_internal_name", "command", "points"]);
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let tags = TagParser::parse_tags(&["command:play_sound(sounds:beep.wav)"]);
        assert_eq!(tags.commands(), &["play_sound(sounds:beep.wav)"]);
    }

    #[test]
    fn test_bare_tags() {
        let tags = TagParser::parse_tags(&["background", "background"]);
        assert!(tags.contains("background"));
        assert_eq!(tags.get("background"), Some(&[][..]));
        assert_eq!(tags.len(), 1);
        assert!(!tags.is_interactive());
        assert!(tags.commands().is_empty());
    }
}
