//! Per-job link map accumulated while publishing artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key under which the master playlist URL is recorded.
pub const MASTER_PLAYLIST_KEY: &str = "auto";

/// Key under which the subtitle track URL is recorded.
pub const SUBTITLES_KEY: &str = "subtitles";

/// Mapping from rendition name (plus `"auto"` and `"subtitles"`) to a
/// public URL.
///
/// Owned by the worker instance processing one job; upload code takes a map
/// by value and returns the merged result, so concurrent jobs never share
/// accumulator state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkMap(BTreeMap<String, String>);

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a per-rendition manifest URL.
    pub fn insert_rendition(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.0.insert(name.into(), url.into());
    }

    /// Record the master playlist URL.
    pub fn set_master(&mut self, url: impl Into<String>) {
        self.0.insert(MASTER_PLAYLIST_KEY.to_string(), url.into());
    }

    /// Record the subtitle track URL.
    pub fn set_subtitles(&mut self, url: impl Into<String>) {
        self.0.insert(SUBTITLES_KEY.to_string(), url.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn subtitles(&self) -> Option<&str> {
        self.get(SUBTITLES_KEY)
    }

    /// Merge another map into this one; later entries win.
    pub fn merge(&mut self, other: LinkMap) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for LinkMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for LinkMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_entries() {
        let mut base = LinkMap::new();
        base.insert_rendition("360P", "https://cdn.example/a/360P/index.m3u8");
        base.set_master("https://cdn.example/a/playlist.m3u8");

        let mut incoming = LinkMap::new();
        incoming.insert_rendition("360P", "https://cdn.example/b/360P/index.m3u8");
        incoming.set_subtitles("https://cdn.example/a/subtitles.vtt");

        base.merge(incoming);
        assert_eq!(base.len(), 3);
        assert_eq!(base.get("360P"), Some("https://cdn.example/b/360P/index.m3u8"));
        assert_eq!(base.subtitles(), Some("https://cdn.example/a/subtitles.vtt"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut links = LinkMap::new();
        links.set_master("https://cdn.example/v/playlist.m3u8");
        let json = serde_json::to_string(&links).unwrap();
        assert_eq!(json, "{\"auto\":\"https://cdn.example/v/playlist.m3u8\"}");
    }
}
