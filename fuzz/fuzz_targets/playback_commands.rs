#![no_main]

use libfuzzer_sys::fuzz_target;
use harmony::audio::NullPlaybackHandle;
use harmony::core::HarmonyCore;
use harmony::model::{PersistedState, UploadFile};
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    let mut core =
        HarmonyCore::from_persisted(PersistedState::default(), Box::new(NullPlaybackHandle::new()));
    let len = (data.len() % 8).max(1);
    let batch: Vec<UploadFile> = (0..len)
        .map(|idx| UploadFile {
            name: format!("track_{idx}.mp3"),
            media_type: String::from("audio/mpeg"),
            size: idx as u64,
            last_modified: 0,
            source: PathBuf::from(format!("track_{idx}.mp3")),
        })
        .collect();
    core.add_songs(&batch);
    let playlist = core.create_playlist("fuzz");

    for pair in data.chunks(2) {
        let op = pair[0];
        let pick = pair.get(1).copied().unwrap_or(0) as usize;
        let id = core
            .songs()
            .get(pick % core.songs().len().max(1))
            .map(|song| song.id.clone());

        match (op % 10, id) {
            (0, Some(id)) => {
                core.play_song(&id);
            }
            (1, _) => {
                core.play_next();
            }
            (2, _) => {
                core.play_previous();
            }
            (3, _) => {
                core.toggle_play();
            }
            (4, _) => {
                core.seek(f64::from(pick as u8) - 16.0);
            }
            (5, _) => {
                core.toggle_shuffle();
            }
            (6, Some(id)) => core.add_to_queue(&id),
            (7, Some(id)) => {
                core.remove_song(&id);
            }
            (8, Some(id)) => {
                core.toggle_favorite(&id);
                core.add_to_playlist(&playlist, &id);
            }
            _ => core.tick(),
        }

        if let Some(current) = core.current_song() {
            assert!(current.play_count >= 1);
        }
        assert!(core.current_time() >= 0.0);
        assert!(core.songs().len() <= len);
    }
});
