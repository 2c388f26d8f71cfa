use crate::model::{Playlist, PlaylistId, SongId};
use std::collections::VecDeque;

/// User playlists. Song ids are soft references and may outlive the songs
/// they name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlists {
    items: Vec<Playlist>,
}

impl Playlists {
    pub fn from_vec(items: Vec<Playlist>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Playlist] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<Playlist> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &PlaylistId) -> Option<&Playlist> {
        self.items.iter().find(|playlist| &playlist.id == id)
    }

    /// Creates an empty playlist keyed by the creation time. Ids restored from
    /// disk are never reused.
    pub fn create(&mut self, name: &str, now: i64) -> PlaylistId {
        let mut id = PlaylistId::new(now.to_string());
        let mut suffix = 1;
        while self.get(&id).is_some() {
            id = PlaylistId::new(format!("{now}-{suffix}"));
            suffix += 1;
        }

        self.items.push(Playlist {
            id: id.clone(),
            name: name.to_string(),
            songs: Vec::new(),
            created_at: now,
            cover_art: None,
        });
        id
    }

    pub fn add_song(&mut self, playlist: &PlaylistId, song: &SongId) -> bool {
        let Some(entry) = self.get_mut(playlist) else {
            return false;
        };
        entry.songs.push(song.clone());
        true
    }

    /// Drops every occurrence of `song` from the playlist.
    pub fn remove_song(&mut self, playlist: &PlaylistId, song: &SongId) -> bool {
        let Some(entry) = self.get_mut(playlist) else {
            return false;
        };
        entry.songs.retain(|id| id != song);
        true
    }

    pub fn delete(&mut self, playlist: &PlaylistId) -> bool {
        let before = self.items.len();
        self.items.retain(|entry| &entry.id != playlist);
        self.items.len() != before
    }

    fn get_mut(&mut self, id: &PlaylistId) -> Option<&mut Playlist> {
        self.items.iter_mut().find(|playlist| &playlist.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    ids: Vec<SongId>,
}

impl Favorites {
    /// Builds the set from stored ids, dropping repeats.
    pub fn from_vec(stored: Vec<SongId>) -> Self {
        let mut ids: Vec<SongId> = Vec::with_capacity(stored.len());
        for id in stored {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self { ids }
    }

    pub fn as_slice(&self) -> &[SongId] {
        &self.ids
    }

    pub fn contains(&self, id: &SongId) -> bool {
        self.ids.contains(id)
    }

    /// Returns whether `id` is a favorite after the toggle.
    pub fn toggle(&mut self, id: &SongId) -> bool {
        if let Some(pos) = self.ids.iter().position(|existing| existing == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id.clone());
            true
        }
    }
}

/// Session-only play queue, consumed from the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    ids: VecDeque<SongId>,
}

impl Queue {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongId> {
        self.ids.iter()
    }

    pub fn front(&self) -> Option<&SongId> {
        self.ids.front()
    }

    pub fn push(&mut self, id: &SongId) {
        self.ids.push_back(id.clone());
    }

    pub fn pop_front(&mut self) -> Option<SongId> {
        self.ids.pop_front()
    }

    /// Drops every occurrence of `id`, returning how many were removed.
    pub fn remove(&mut self, id: &SongId) -> usize {
        let before = self.ids.len();
        self.ids.retain(|queued| queued != id);
        before - self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn to_vec(&self) -> Vec<SongId> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> SongId {
        SongId::new(value)
    }

    #[test]
    fn playlist_ids_never_collide() {
        let mut playlists = Playlists::default();
        let first = playlists.create("a", 100);
        let second = playlists.create("b", 100);
        let third = playlists.create("c", 100);

        assert_eq!(first.as_str(), "100");
        assert_eq!(second.as_str(), "100-1");
        assert_eq!(third.as_str(), "100-2");
        assert_eq!(playlists.get(&second).map(|p| p.name.as_str()), Some("b"));
        assert_eq!(playlists.get(&first).map(|p| p.created_at), Some(100));
    }

    #[test]
    fn playlists_keep_duplicates_and_ignore_unknown_ids() {
        let mut playlists = Playlists::default();
        let mix = playlists.create("mix", 1);
        let unknown = PlaylistId::new("nope");

        assert!(playlists.add_song(&mix, &id("s1")));
        assert!(playlists.add_song(&mix, &id("s1")));
        assert!(playlists.add_song(&mix, &id("s2")));
        assert!(!playlists.add_song(&unknown, &id("s1")));
        assert_eq!(playlists.get(&mix).map(|p| p.songs.len()), Some(3));

        assert!(playlists.remove_song(&mix, &id("s1")));
        assert_eq!(playlists.get(&mix).map(|p| p.songs.clone()), Some(vec![id("s2")]));
        assert!(!playlists.remove_song(&unknown, &id("s2")));

        assert!(playlists.delete(&mix));
        assert!(!playlists.delete(&mix));
        assert!(playlists.is_empty());
    }

    #[test]
    fn favorite_toggle_is_its_own_inverse() {
        let mut favorites = Favorites::from_vec(vec![id("a"), id("a"), id("b")]);
        assert_eq!(favorites.as_slice(), &[id("a"), id("b")]);

        assert!(favorites.toggle(&id("c")));
        assert!(favorites.contains(&id("c")));
        assert!(!favorites.toggle(&id("c")));
        assert!(!favorites.contains(&id("c")));
        assert_eq!(favorites.as_slice(), &[id("a"), id("b")]);
    }

    #[test]
    fn queue_is_fifo_and_removal_drops_all_copies() {
        let mut queue = Queue::default();
        queue.push(&id("a"));
        queue.push(&id("b"));
        queue.push(&id("a"));

        assert_eq!(queue.remove(&id("a")), 2);
        assert_eq!(queue.to_vec(), vec![id("b")]);
        queue.push(&id("c"));
        assert_eq!(queue.pop_front(), Some(id("b")));
        assert_eq!(queue.front(), Some(&id("c")));

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_front(), None);
    }
}
