use crate::library::{self, BlobUrls, UploadReport};
use crate::model::{Album, DuplicateKey, Song, SongId, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UploadFile};
use std::collections::{HashMap, HashSet};

/// Replacement tags for a song. `None` keeps the current value and blank
/// strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEdit {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistGroup {
    pub name: String,
    pub songs: Vec<SongId>,
}

/// Owns every uploaded song and the album groupings derived from them.
///
/// Albums are rebuilt wholesale after each mutation of the song set rather
/// than patched incrementally.
#[derive(Debug, Default)]
pub struct Catalog {
    songs: Vec<Song>,
    lookup: HashMap<SongId, usize>,
    albums: Vec<Album>,
    urls: BlobUrls,
    next_seq: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn urls(&self) -> &BlobUrls {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, id: &SongId) -> Option<&Song> {
        self.position(id).and_then(|idx| self.songs.get(idx))
    }

    pub fn contains(&self, id: &SongId) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn position(&self, id: &SongId) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    pub fn album(&self, id: &str) -> Option<&Album> {
        self.albums.iter().find(|album| album.id == id)
    }

    /// Ingests an upload batch, skipping non-audio files and duplicates.
    ///
    /// A file is a duplicate when its (name, size, last-modified) key matches a
    /// song already in the catalog or an earlier file of the same batch. All
    /// accepted songs are appended in one step.
    pub fn add_songs(&mut self, batch: &[UploadFile], now: i64) -> UploadReport {
        let mut report = UploadReport::default();
        let mut seen: HashSet<DuplicateKey> = self
            .songs
            .iter()
            .map(|song| song.file.duplicate_key())
            .collect();
        let mut accepted = Vec::new();

        for file in batch {
            if !file.is_audio() {
                tracing::debug!(name = %file.name, media_type = %file.media_type, "rejected non-audio upload");
                report.rejected += 1;
                continue;
            }
            report.total_eligible += 1;

            if !seen.insert(file.duplicate_key()) {
                tracing::debug!(name = %file.name, "skipped duplicate upload");
                report.skipped += 1;
                continue;
            }

            accepted.push(self.song_from_upload(file, now));
        }

        report.accepted = accepted.len();
        if !accepted.is_empty() {
            self.songs.append(&mut accepted);
            self.rebuild_index();
            self.rebuild_albums();
        }

        tracing::info!(
            eligible = report.total_eligible,
            added = report.accepted,
            skipped = report.skipped,
            rejected = report.rejected,
            "upload batch processed"
        );
        report
    }

    /// Removes a song and releases its playable URL.
    pub fn remove_song(&mut self, id: &SongId) -> Option<Song> {
        let idx = self.position(id)?;
        let song = self.songs.remove(idx);
        self.urls.revoke(&song.url);
        self.rebuild_index();
        self.rebuild_albums();
        Some(song)
    }

    pub fn edit_metadata(&mut self, id: &SongId, edit: &MetadataEdit) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };

        let song = &mut self.songs[idx];
        if let Some(title) = edit.title.as_deref().and_then(clean_metadata_value) {
            song.title = title;
        }
        if let Some(artist) = edit.artist.as_deref().and_then(clean_metadata_value) {
            song.artist = artist;
        }
        if let Some(album) = edit.album.as_deref().and_then(clean_metadata_value) {
            song.album = album;
        }
        self.rebuild_albums();
        true
    }

    /// Resolves soft references in list order, dropping ids that no longer exist.
    pub fn songs_for<'a, I>(&self, ids: I) -> Vec<&Song>
    where
        I: IntoIterator<Item = &'a SongId>,
    {
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn artists(&self) -> Vec<ArtistGroup> {
        let mut groups: Vec<ArtistGroup> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for song in &self.songs {
            let slot = *index.entry(song.artist.as_str()).or_insert_with(|| {
                groups.push(ArtistGroup {
                    name: song.artist.clone(),
                    songs: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].songs.push(song.id.clone());
        }

        groups
    }

    /// Case-insensitive title match. A blank query matches nothing; otherwise
    /// surrounding whitespace is part of the needle.
    pub fn search(&self, query: &str) -> Vec<&Song> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        self.songs
            .iter()
            .filter(|song| song.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub(crate) fn record_play(&mut self, id: &SongId, at: i64) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let song = &mut self.songs[idx];
        song.play_count += 1;
        song.last_played = Some(at);
        true
    }

    pub(crate) fn set_duration(&mut self, id: &SongId, seconds: f64) {
        if let Some(idx) = self.position(id) {
            self.songs[idx].duration = seconds;
        }
    }

    fn song_from_upload(&mut self, file: &UploadFile, now: i64) -> Song {
        self.next_seq += 1;
        Song {
            id: SongId::new(format!("{now}-{}", self.next_seq)),
            title: library::title_from_file_name(&file.name),
            artist: String::from(UNKNOWN_ARTIST),
            album: String::from(UNKNOWN_ALBUM),
            duration: 0.0,
            url: self.urls.create(file),
            file: file.clone(),
            cover_art: None,
            added_at: now,
            last_played: None,
            play_count: 0,
        }
    }

    fn rebuild_index(&mut self) {
        self.lookup = self
            .songs
            .iter()
            .enumerate()
            .map(|(idx, song)| (song.id.clone(), idx))
            .collect();
    }

    fn rebuild_albums(&mut self) {
        let mut albums: Vec<Album> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();

        for song in &self.songs {
            let key = (song.album.as_str(), song.artist.as_str());
            let slot = *index.entry(key).or_insert_with(|| {
                albums.push(Album {
                    id: format!("{}-{}", song.album, song.artist),
                    name: song.album.clone(),
                    artist: song.artist.clone(),
                    songs: Vec::new(),
                    cover_art: song.cover_art.clone(),
                });
                albums.len() - 1
            });
            albums[slot].songs.push(song.id.clone());
        }

        self.albums = albums;
    }
}

fn clean_metadata_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn audio(name: &str, size: u64, last_modified: i64) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            media_type: String::from("audio/mpeg"),
            size,
            last_modified,
            source: PathBuf::from(name),
        }
    }

    fn other(name: &str) -> UploadFile {
        UploadFile {
            media_type: String::from("image/png"),
            ..audio(name, 1, 1)
        }
    }

    #[test]
    fn new_songs_get_defaults() {
        let mut catalog = Catalog::new();
        let report = catalog.add_songs(&[audio("Intro.mp3", 10, 1)], 1_000);
        assert_eq!(report.accepted, 1);

        let song = &catalog.songs()[0];
        assert_eq!(song.title, "Intro");
        assert_eq!(song.artist, UNKNOWN_ARTIST);
        assert_eq!(song.album, UNKNOWN_ALBUM);
        assert_eq!(song.duration, 0.0);
        assert_eq!(song.play_count, 0);
        assert_eq!(song.added_at, 1_000);
        assert_eq!(song.last_played, None);
        assert_eq!(
            catalog.urls().resolve(&song.url),
            Some(std::path::Path::new("Intro.mp3"))
        );
    }

    #[test]
    fn duplicates_within_batch_and_across_batches_are_skipped() {
        let mut catalog = Catalog::new();
        let first = catalog.add_songs(
            &[audio("a.mp3", 10, 1), audio("a.mp3", 10, 1), audio("b.mp3", 10, 1)],
            1,
        );
        assert_eq!(first.accepted, 2);
        assert_eq!(first.skipped, 1);
        assert_eq!(first.total_eligible, 3);

        let second = catalog.add_songs(&[audio("a.mp3", 10, 1), audio("a.mp3", 11, 1)], 2);
        assert_eq!(second.accepted, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn non_audio_files_are_rejected_not_skipped() {
        let mut catalog = Catalog::new();
        let report = catalog.add_songs(&[other("cover.png"), other("notes.txt")], 1);
        assert!(report.nothing_eligible());
        assert_eq!(report.rejected, 2);
        assert_eq!(report.skipped, 0);
        assert!(catalog.is_empty());
    }

    #[test]
    fn ids_are_unique_across_batches_at_the_same_instant() {
        let mut catalog = Catalog::new();
        catalog.add_songs(&[audio("a.mp3", 1, 1), audio("b.mp3", 1, 1)], 5);
        catalog.add_songs(&[audio("c.mp3", 1, 1), audio("d.mp3", 1, 1)], 5);

        let ids: HashSet<&SongId> = catalog.songs().iter().map(|song| &song.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn removal_revokes_url_and_prunes_empty_albums() {
        let mut catalog = Catalog::new();
        catalog.add_songs(&[audio("a.mp3", 1, 1), audio("b.mp3", 1, 1)], 1);
        let a = catalog.songs()[0].id.clone();
        let b = catalog.songs()[1].id.clone();
        catalog.edit_metadata(
            &b,
            &MetadataEdit {
                album: Some(String::from("Solo")),
                ..MetadataEdit::default()
            },
        );
        assert_eq!(catalog.albums().len(), 2);

        let removed = catalog.remove_song(&b).expect("removed");
        assert_eq!(catalog.urls().resolve(&removed.url), None);
        assert_eq!(catalog.urls().live_count(), 1);
        assert_eq!(catalog.albums().len(), 1);
        assert_eq!(catalog.albums()[0].songs, vec![a.clone()]);
        assert_eq!(catalog.position(&a), Some(0));
        assert!(catalog.remove_song(&b).is_none());
    }

    #[test]
    fn albums_group_by_album_and_artist() {
        let mut catalog = Catalog::new();
        catalog.add_songs(
            &[audio("1.mp3", 1, 1), audio("2.mp3", 1, 1), audio("3.mp3", 1, 1)],
            1,
        );
        let ids: Vec<SongId> = catalog.songs().iter().map(|s| s.id.clone()).collect();
        for id in &ids {
            catalog.edit_metadata(
                id,
                &MetadataEdit {
                    album: Some(String::from("Blue")),
                    artist: Some(String::from("Ana")),
                    ..MetadataEdit::default()
                },
            );
        }
        catalog.edit_metadata(
            &ids[1],
            &MetadataEdit {
                artist: Some(String::from("Bo")),
                ..MetadataEdit::default()
            },
        );

        let albums = catalog.albums();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].id, "Blue-Ana");
        assert_eq!(albums[0].songs, vec![ids[0].clone(), ids[2].clone()]);
        assert_eq!(albums[1].id, "Blue-Bo");
        assert_eq!(catalog.album("Blue-Bo").map(|a| a.songs.len()), Some(1));
    }

    #[test]
    fn blank_metadata_edits_are_ignored() {
        let mut catalog = Catalog::new();
        catalog.add_songs(&[audio("a.mp3", 1, 1)], 1);
        let id = catalog.songs()[0].id.clone();

        assert!(catalog.edit_metadata(
            &id,
            &MetadataEdit {
                title: Some(String::from("   ")),
                artist: Some(String::from("  Ana ")),
                album: None,
            },
        ));
        let song = catalog.get(&id).expect("song");
        assert_eq!(song.title, "a");
        assert_eq!(song.artist, "Ana");
        assert!(!catalog.edit_metadata(&SongId::new("missing"), &MetadataEdit::default()));
    }

    #[test]
    fn artists_search_and_resolution() {
        let mut catalog = Catalog::new();
        catalog.add_songs(
            &[audio("Night Drive.mp3", 1, 1), audio("Morning.mp3", 1, 1), audio("night owl.mp3", 1, 1)],
            1,
        );
        let ids: Vec<SongId> = catalog.songs().iter().map(|s| s.id.clone()).collect();
        catalog.edit_metadata(
            &ids[1],
            &MetadataEdit {
                artist: Some(String::from("Ana")),
                ..MetadataEdit::default()
            },
        );

        let artists = catalog.artists();
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, UNKNOWN_ARTIST);
        assert_eq!(artists[0].songs, vec![ids[0].clone(), ids[2].clone()]);

        let hits: Vec<&str> = catalog.search("NIGHT").iter().map(|s| s.title.as_str()).collect();
        assert_eq!(hits, vec!["Night Drive", "night owl"]);
        assert!(catalog.search("  ").is_empty());
        assert!(catalog.search("drive ").is_empty());
        let hits: Vec<&str> = catalog.search(" drive").iter().map(|s| s.title.as_str()).collect();
        assert_eq!(hits, vec!["Night Drive"]);

        let dangling = SongId::new("gone");
        let resolved = catalog.songs_for([&ids[2], &dangling, &ids[0], &ids[2]]);
        let titles: Vec<&str> = resolved.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["night owl", "Night Drive", "night owl"]);
    }
}
