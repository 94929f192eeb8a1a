//! Tag to track mapping
//!
//! Tags are named in the settings (`rfid_map`: name -> tag id) and tracks are
//! named in `rfid_song_map.json` next to the music (name -> track). Joining
//! the two on the name gives the lookup the tag worker needs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tunino_hardware::TagId;

use crate::config::ConfigError;

/// File inside MPD's music directory that names the tracks
pub const SONG_MAP_FILE: &str = "rfid_song_map.json";

/// Immutable tag id -> track reference lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagToTrackMap {
    tracks: HashMap<TagId, String>,
}

impl TagToTrackMap {
    /// Join tag names with track names
    ///
    /// Names that appear on only one side are logged and left out.
    pub fn from_named(tags: &HashMap<String, TagId>, songs: &HashMap<String, String>) -> Self {
        let mut tracks = HashMap::new();
        for (name, tag) in tags {
            match songs.get(name) {
                Some(track) => {
                    if let Some(previous) = tracks.insert(tag.clone(), track.clone()) {
                        tracing::warn!("Tag {} is mapped twice, {} replaces {}", tag, track, previous);
                    }
                }
                None => tracing::warn!("Tag name {} has no entry in {}", name, SONG_MAP_FILE),
            }
        }
        for name in songs.keys().filter(|name| !tags.contains_key(*name)) {
            tracing::warn!("Track name {} has no tag in rfid_map", name);
        }
        Self { tracks }
    }

    pub fn resolve(&self, tag: &TagId) -> Option<&str> {
        self.tracks.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagId, &str)> {
        self.tracks.iter().map(|(tag, track)| (tag, track.as_str()))
    }
}

/// Read `music_directory` from an `mpd.conf`
pub fn music_directory(mpd_conf: &Path) -> Result<PathBuf, ConfigError> {
    let text = fs::read_to_string(mpd_conf).map_err(|source| ConfigError::Read {
        path: mpd_conf.to_path_buf(),
        source,
    })?;
    parse_music_directory(&text).ok_or_else(|| {
        ConfigError::Invalid(format!("no music_directory in {}", mpd_conf.display()))
    })
}

/// First `music_directory "..."` line, with `~` expanded
fn parse_music_directory(text: &str) -> Option<PathBuf> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("music_directory"))?;
    let value = line.split('"').nth(1)?;
    if value.is_empty() {
        return None;
    }
    Some(expand_home(value))
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

/// Load `rfid_song_map.json` from a music directory
pub fn load_song_map(music_dir: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let path = music_dir.join(SONG_MAP_FILE);
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_tags(pairs: &[(&str, &str)]) -> HashMap<String, TagId> {
        pairs
            .iter()
            .map(|(name, id)| (name.to_string(), TagId::new(*id)))
            .collect()
    }

    fn songs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, track)| (name.to_string(), track.to_string()))
            .collect()
    }

    #[test]
    fn test_join_on_name() {
        let map = TagToTrackMap::from_named(
            &named_tags(&[("lullaby", "111"), ("march", "222"), ("orphan", "333")]),
            &songs(&[("lullaby", "kids/lullaby.mp3"), ("march", "kids/march.mp3"), ("unused", "x.mp3")]),
        );

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(&TagId::new("111")), Some("kids/lullaby.mp3"));
        assert_eq!(map.resolve(&TagId::new("222")), Some("kids/march.mp3"));
        assert_eq!(map.resolve(&TagId::new("333")), None);
    }

    #[test]
    fn test_parse_music_directory() {
        let conf = r#"
# comment
db_file            "/var/lib/mpd/tag_cache"
  music_directory    "/srv/music"
music_directory    "/ignored"
"#;
        assert_eq!(parse_music_directory(conf), Some(PathBuf::from("/srv/music")));
        assert_eq!(parse_music_directory("db_file \"x\"\n"), None);
        assert_eq!(parse_music_directory("music_directory \"\"\n"), None);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/srv/music"), PathBuf::from("/srv/music"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/music"), home.join("music"));
        }
    }

    #[test]
    fn test_load_song_map() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SONG_MAP_FILE), r#"{"lullaby": "kids/lullaby.mp3"}"#).unwrap();

        let map = load_song_map(dir.path()).unwrap();
        assert_eq!(map.get("lullaby").map(String::as_str), Some("kids/lullaby.mp3"));

        let missing = tempfile::tempdir().unwrap();
        assert!(matches!(load_song_map(missing.path()), Err(ConfigError::Read { .. })));
    }
}
