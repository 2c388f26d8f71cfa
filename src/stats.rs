use crate::model::Song;
use std::time::{SystemTime, UNIX_EPOCH};

pub const RECENT_PLAYS_LIMIT: usize = 20;

pub fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// Songs that have been played, most recent first, capped at
/// `RECENT_PLAYS_LIMIT`. Never-played songs are left out.
pub fn recent_plays(songs: &[Song]) -> Vec<&Song> {
    let mut played: Vec<&Song> = songs
        .iter()
        .filter(|song| song.last_played.is_some())
        .collect();
    played.sort_by(|a, b| b.last_played.cmp(&a.last_played));
    played.truncate(RECENT_PLAYS_LIMIT);
    played
}

/// First `limit` distinct artists in catalog order.
pub fn top_artists(songs: &[Song], limit: usize) -> Vec<&str> {
    let mut artists: Vec<&str> = Vec::new();
    for song in songs {
        if artists.len() == limit {
            break;
        }
        if !artists.contains(&song.artist.as_str()) {
            artists.push(song.artist.as_str());
        }
    }
    artists
}

/// `m:ss` rendering of a position or duration in seconds.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("0:00");
    }

    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
