use crate::audio::{PlaybackEvent, PlaybackEventKind, PlaybackHandle};
use crate::catalog::{ArtistGroup, Catalog, MetadataEdit};
use crate::collections::{Favorites, Playlists, Queue};
use crate::config;
use crate::library::UploadReport;
use crate::model::{Album, PersistedState, Playlist, PlaylistId, Song, SongId, UploadFile};
use crate::stats;
use crate::transport::Transport;
use std::path::Path;

/// Read-only copy of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub songs: Vec<Song>,
    pub playlists: Vec<Playlist>,
    pub albums: Vec<Album>,
    pub favorites: Vec<SongId>,
    pub queue: Vec<SongId>,
    pub current_song: Option<Song>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub shuffle: bool,
}

/// Central state container: catalog, collections and transport.
///
/// Every command runs to completion synchronously. `dirty` is raised after
/// any observable change and `status` carries a one-line message for the user.
#[derive(Debug)]
pub struct HarmonyCore {
    catalog: Catalog,
    playlists: Playlists,
    favorites: Favorites,
    queue: Queue,
    transport: Transport,
    pub dirty: bool,
    pub status: String,
    persist_pending: bool,
    last_stamp: i64,
}

impl HarmonyCore {
    pub fn from_persisted(state: PersistedState, handle: Box<dyn PlaybackHandle>) -> Self {
        Self::with_transport(state, Transport::new(handle))
    }

    pub fn with_transport(state: PersistedState, transport: Transport) -> Self {
        Self {
            catalog: Catalog::new(),
            playlists: Playlists::from_vec(state.playlists),
            favorites: Favorites::from_vec(state.favorites),
            queue: Queue::default(),
            transport,
            dirty: true,
            status: String::from("Ready"),
            persist_pending: false,
            last_stamp: 0,
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            playlists: self.playlists.to_vec(),
            favorites: self.favorites.as_slice().to_vec(),
        }
    }

    pub fn save_to(&mut self, path: &Path) -> anyhow::Result<()> {
        config::save_state_to_path(path, &self.persisted_state())?;
        self.persist_pending = false;
        Ok(())
    }

    pub fn request_save(&mut self) {
        self.persist_pending = true;
    }

    /// True once per batch of playlist/favorite changes not yet written out.
    pub fn take_persist_request(&mut self) -> bool {
        std::mem::take(&mut self.persist_pending)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn songs(&self) -> &[Song] {
        self.catalog.songs()
    }

    pub fn albums(&self) -> &[Album] {
        self.catalog.albums()
    }

    pub fn playlists(&self) -> &[Playlist] {
        self.playlists.as_slice()
    }

    pub fn favorites(&self) -> &[SongId] {
        self.favorites.as_slice()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.transport.current().and_then(|id| self.catalog.get(id))
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn current_time(&self) -> f64 {
        self.transport.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.transport.duration()
    }

    pub fn shuffle(&self) -> bool {
        self.transport.shuffle()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            songs: self.songs().to_vec(),
            playlists: self.playlists().to_vec(),
            albums: self.albums().to_vec(),
            favorites: self.favorites().to_vec(),
            queue: self.queue.to_vec(),
            current_song: self.current_song().cloned(),
            is_playing: self.is_playing(),
            current_time: self.current_time(),
            duration: self.duration(),
            shuffle: self.shuffle(),
        }
    }

    pub fn add_songs(&mut self, batch: &[UploadFile]) -> UploadReport {
        let report = self.catalog.add_songs(batch, stats::now_epoch_millis());
        self.set_status(&report.message());
        report
    }

    /// Drops the song from the catalog and the queue. Playlists and favorites
    /// keep their now-dangling references.
    pub fn remove_song(&mut self, id: &SongId) -> bool {
        let Some(song) = self.catalog.remove_song(id) else {
            self.set_status("Song not found");
            return false;
        };

        self.queue.remove(id);
        if self.transport.current() == Some(id) {
            self.transport.stop();
        }
        self.set_status(&format!("Removed {}", song.title));
        true
    }

    pub fn edit_metadata(&mut self, id: &SongId, edit: &MetadataEdit) -> bool {
        if !self.catalog.edit_metadata(id, edit) {
            self.set_status("Song not found");
            return false;
        }
        self.set_status("Song details updated");
        true
    }

    pub fn create_playlist(&mut self, name: &str) -> PlaylistId {
        let id = self.playlists.create(name, stats::now_epoch_millis());
        tracing::info!(%id, name, "playlist created");
        self.persist_pending = true;
        self.set_status("Playlist created");
        id
    }

    pub fn add_to_playlist(&mut self, playlist: &PlaylistId, song: &SongId) -> bool {
        if !self.playlists.add_song(playlist, song) {
            self.set_status("Playlist not found");
            return false;
        }
        self.persist_pending = true;
        self.set_status("Song added to playlist");
        true
    }

    pub fn remove_from_playlist(&mut self, playlist: &PlaylistId, song: &SongId) -> bool {
        if !self.playlists.remove_song(playlist, song) {
            self.set_status("Playlist not found");
            return false;
        }
        self.persist_pending = true;
        self.set_status("Song removed from playlist");
        true
    }

    pub fn delete_playlist(&mut self, playlist: &PlaylistId) -> bool {
        if !self.playlists.delete(playlist) {
            self.set_status("Playlist not found");
            return false;
        }
        tracing::info!(id = %playlist, "playlist deleted");
        self.persist_pending = true;
        self.set_status("Playlist deleted");
        true
    }

    /// Returns whether the song is a favorite afterwards.
    pub fn toggle_favorite(&mut self, song: &SongId) -> bool {
        let favorite = self.favorites.toggle(song);
        self.persist_pending = true;
        self.set_status(if favorite {
            "Added to favorites"
        } else {
            "Removed from favorites"
        });
        favorite
    }

    pub fn is_favorite(&self, song: &SongId) -> bool {
        self.favorites.contains(song)
    }

    pub fn add_to_queue(&mut self, song: &SongId) {
        self.queue.push(song);
        self.set_status("Added to queue");
    }

    pub fn remove_from_queue(&mut self, song: &SongId) {
        self.queue.remove(song);
        self.set_status("Removed from queue");
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.set_status("Queue cleared");
    }

    pub fn playlist_songs(&self, playlist: &PlaylistId) -> Vec<&Song> {
        self.playlists
            .get(playlist)
            .map(|entry| self.catalog.songs_for(&entry.songs))
            .unwrap_or_default()
    }

    pub fn favorite_songs(&self) -> Vec<&Song> {
        self.catalog.songs_for(self.favorites.as_slice())
    }

    pub fn queue_songs(&self) -> Vec<&Song> {
        self.catalog.songs_for(self.queue.iter())
    }

    pub fn album_songs(&self, album_id: &str) -> Vec<&Song> {
        self.catalog
            .album(album_id)
            .map(|album| self.catalog.songs_for(&album.songs))
            .unwrap_or_default()
    }

    pub fn artists(&self) -> Vec<ArtistGroup> {
        self.catalog.artists()
    }

    pub fn search(&self, query: &str) -> Vec<&Song> {
        self.catalog.search(query)
    }

    pub fn recent_plays(&self) -> Vec<&Song> {
        stats::recent_plays(self.catalog.songs())
    }

    /// Makes `id` the current song and starts it from the top.
    ///
    /// This is the only path that counts a play and stamps `last_played`.
    pub fn play_song(&mut self, id: &SongId) -> bool {
        let Some(song) = self.catalog.get(id) else {
            self.set_status("Song not found");
            return false;
        };
        let url = song.url.clone();
        let title = song.title.clone();

        let stamp = self.next_stamp();
        self.catalog.record_play(id, stamp);

        match self.transport.start(id, &url) {
            Ok(()) => self.set_status(&format!("Playing {title}")),
            Err(err) => {
                tracing::warn!(%id, "playback failed to start: {err:#}");
                self.set_status(&format!("playback error: {err:#}"));
            }
        }
        true
    }

    /// Advances playback. Queue first, then a shuffle pick, then the next
    /// catalog entry. Returns whether a song was started.
    pub fn play_next(&mut self) -> bool {
        while let Some(head) = self.queue.pop_front() {
            if self.catalog.contains(&head) {
                return self.play_song(&head);
            }
            tracing::debug!(id = %head, "dropping queued id with no catalog entry");
        }

        let len = self.catalog.len();
        if len == 0 {
            return false;
        }

        let current = self
            .transport
            .current()
            .and_then(|id| self.catalog.position(id));

        if self.transport.shuffle() && len > 1 {
            return match self.transport.random_index(len, current) {
                Some(pick) => self.play_index(pick),
                None => false,
            };
        }

        let has_current = self.transport.current().is_some();
        match (has_current, current) {
            (true, Some(idx)) if idx + 1 < len => self.play_index(idx + 1),
            (true, Some(_)) => {
                self.set_status("Reached end of library");
                false
            }
            _ => self.play_index(0),
        }
    }

    /// Steps back one catalog entry, or makes an independent shuffle pick.
    pub fn play_previous(&mut self) -> bool {
        let len = self.catalog.len();
        if len == 0 {
            return false;
        }

        let current = self
            .transport
            .current()
            .and_then(|id| self.catalog.position(id));

        if self.transport.shuffle() {
            return match self.transport.random_index(len, current) {
                Some(pick) => self.play_index(pick),
                None => false,
            };
        }

        match current {
            Some(idx) if idx > 0 => self.play_index(idx - 1),
            _ => false,
        }
    }

    /// Pauses or resumes without touching play counts.
    pub fn toggle_play(&mut self) -> bool {
        match self.transport.toggle() {
            None => {
                self.set_status("Nothing is playing");
                false
            }
            Some(Ok(playing)) => {
                self.set_status(if playing { "Playing" } else { "Paused" });
                true
            }
            Some(Err(err)) => {
                tracing::warn!("playback failed to resume: {err:#}");
                self.set_status(&format!("playback error: {err:#}"));
                true
            }
        }
    }

    pub fn seek(&mut self, seconds: f64) -> bool {
        let moved = self.transport.seek(seconds);
        if moved {
            self.dirty = true;
        }
        moved
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffle = self.transport.toggle_shuffle();
        self.set_status(if shuffle { "Shuffle on" } else { "Shuffle off" });
        shuffle
    }

    /// Applies one signal from the playback handle. A natural end of track
    /// advances playback once; stale signals are ignored.
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        let Some(kind) = self.transport.accept(event) else {
            return;
        };

        match kind {
            PlaybackEventKind::TimeUpdate(_) => {}
            PlaybackEventKind::DurationChange(seconds) => {
                if let Some(id) = self.transport.current().cloned() {
                    self.catalog.set_duration(&id, seconds);
                }
            }
            PlaybackEventKind::Ended => {
                self.play_next();
            }
        }
        self.dirty = true;
    }

    /// Pulls pending events from the handle and applies them in order.
    pub fn tick(&mut self) {
        for event in self.transport.drain_handle_events() {
            self.handle_event(event);
        }
    }

    fn play_index(&mut self, idx: usize) -> bool {
        let Some(id) = self.catalog.songs().get(idx).map(|song| song.id.clone()) else {
            return false;
        };
        self.play_song(&id)
    }

    fn next_stamp(&mut self) -> i64 {
        self.last_stamp = stats::now_epoch_millis().max(self.last_stamp + 1);
        self.last_stamp
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
