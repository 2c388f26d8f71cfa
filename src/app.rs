use crate::audio::NullPlaybackHandle;
use crate::catalog::MetadataEdit;
use crate::config;
use crate::core::HarmonyCore;
use crate::library;
use crate::model::{PlaylistId, SongId};
use crate::stats;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const HOME_ARTIST_COUNT: usize = 6;

const HELP: &str = "Commands: import <dir> | list | albums | artists | search <text> | recent | \
play <n> | next | prev | pause | seek <secs> | shuffle | now | remove <n> | \
tag <n> <title|artist|album> <value> | fav <n> | favs | queue [add|rm <n> | clear] | \
playlists | playlist <new <name>|add <p> <n>|rm <p> <n>|del <p>|show <p>> | save | quit";

#[derive(Debug, Default)]
pub struct AppStartupOptions {
    pub config_dir: Option<PathBuf>,
    pub imports: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let root = match options.config_dir {
        Some(dir) => dir,
        None => config::config_root()?,
    };
    let state_path = config::state_path_in(&root);
    let state = config::load_state_or_default(&state_path);
    let mut core = HarmonyCore::from_persisted(state, Box::new(NullPlaybackHandle::new()));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !options.imports.is_empty() {
        core.add_songs(&library::scan_many(&options.imports));
    }
    report(&mut core, &mut out)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        core.tick();
        let flow = run_command(&mut core, &line, &mut out)?;
        if let Err(err) = persist_if_requested(&mut core, &state_path) {
            tracing::warn!("failed to save state: {err:#}");
            writeln!(out, "save error: {err:#}")?;
        }
        if flow == Flow::Quit {
            break;
        }
    }

    core.save_to(&state_path)
}

fn persist_if_requested(core: &mut HarmonyCore, path: &Path) -> Result<()> {
    if !core.take_persist_request() {
        return Ok(());
    }
    core.save_to(path)
}

pub fn run_command<W: Write>(core: &mut HarmonyCore, raw: &str, out: &mut W) -> Result<Flow> {
    let input = raw.trim();
    if input.is_empty() {
        return Ok(Flow::Continue);
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => writeln!(out, "{HELP}")?,
        "quit" | "exit" => return Ok(Flow::Quit),
        "import" => {
            if rest.is_empty() {
                set_status(core, "Usage: import <dir>");
            } else {
                core.add_songs(&library::scan_folder(Path::new(rest)));
            }
            report(core, out)?;
        }
        "list" => {
            for (idx, song) in core.songs().iter().enumerate() {
                let marker = if core.is_favorite(&song.id) { "*" } else { " " };
                writeln!(
                    out,
                    "{marker}{:>3}. {} - {} [{}] plays: {}",
                    idx + 1,
                    song.title,
                    song.artist,
                    stats::format_clock(song.duration),
                    song.play_count
                )?;
            }
        }
        "albums" => {
            for album in core.albums() {
                writeln!(
                    out,
                    "{} - {} ({} songs)",
                    album.name,
                    album.artist,
                    album.songs.len()
                )?;
            }
        }
        "artists" => {
            let top = stats::top_artists(core.songs(), HOME_ARTIST_COUNT);
            writeln!(out, "Popular: {}", top.join(", "))?;
            for artist in core.artists() {
                writeln!(out, "{} ({} songs)", artist.name, artist.songs.len())?;
            }
        }
        "search" => {
            for song in core.search(rest) {
                writeln!(out, "{} - {}", song.title, song.artist)?;
            }
        }
        "recent" => {
            for song in core.recent_plays() {
                writeln!(out, "{} - {}", song.title, song.artist)?;
            }
        }
        "play" => {
            match song_at(core, rest) {
                Some(id) => {
                    core.play_song(&id);
                }
                None => set_status(core, "Usage: play <n>"),
            }
            report(core, out)?;
        }
        "next" => {
            core.play_next();
            report(core, out)?;
        }
        "prev" => {
            core.play_previous();
            report(core, out)?;
        }
        "pause" => {
            core.toggle_play();
            report(core, out)?;
        }
        "seek" => {
            match rest.parse::<f64>() {
                Ok(seconds) => {
                    if core.seek(seconds) {
                        let position = stats::format_clock(core.current_time());
                        set_status(core, &format!("Position {position}"));
                    } else {
                        set_status(core, "Nothing is playing");
                    }
                }
                Err(_) => set_status(core, "Usage: seek <secs>"),
            }
            report(core, out)?;
        }
        "shuffle" => {
            core.toggle_shuffle();
            report(core, out)?;
        }
        "now" => match core.current_song() {
            Some(song) => writeln!(
                out,
                "{} {} - {} {}/{}{}",
                if core.is_playing() { ">" } else { "||" },
                song.title,
                song.artist,
                stats::format_clock(core.current_time()),
                stats::format_clock(core.duration()),
                if core.shuffle() { " (shuffle)" } else { "" }
            )?,
            None => writeln!(out, "Nothing is playing")?,
        },
        "remove" => {
            match song_at(core, rest) {
                Some(id) => {
                    core.remove_song(&id);
                }
                None => set_status(core, "Usage: remove <n>"),
            }
            report(core, out)?;
        }
        "tag" => {
            run_tag_command(core, rest);
            report(core, out)?;
        }
        "fav" => {
            match song_at(core, rest) {
                Some(id) => {
                    core.toggle_favorite(&id);
                }
                None => set_status(core, "Usage: fav <n>"),
            }
            report(core, out)?;
        }
        "favs" => {
            for song in core.favorite_songs() {
                writeln!(out, "{} - {}", song.title, song.artist)?;
            }
        }
        "queue" => run_queue_command(core, rest, out)?,
        "playlists" => {
            for (idx, playlist) in core.playlists().iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}. {} ({} songs)",
                    idx + 1,
                    playlist.name,
                    playlist.songs.len()
                )?;
            }
        }
        "playlist" => run_playlist_command(core, rest, out)?,
        "save" => {
            core.request_save();
            set_status(core, "State saved");
            report(core, out)?;
        }
        _ => {
            set_status(core, "Unknown command. Use help");
            report(core, out)?;
        }
    }

    Ok(Flow::Continue)
}

fn run_tag_command(core: &mut HarmonyCore, rest: &str) {
    let mut split = rest.splitn(3, char::is_whitespace);
    let target = split.next().unwrap_or_default();
    let field = split.next().unwrap_or_default();
    let value = split.next().unwrap_or("").trim();

    let Some(id) = song_at(core, target) else {
        set_status(core, "Usage: tag <n> <title|artist|album> <value>");
        return;
    };

    let edit = match field {
        "title" => MetadataEdit {
            title: Some(value.to_string()),
            ..MetadataEdit::default()
        },
        "artist" => MetadataEdit {
            artist: Some(value.to_string()),
            ..MetadataEdit::default()
        },
        "album" => MetadataEdit {
            album: Some(value.to_string()),
            ..MetadataEdit::default()
        },
        _ => {
            set_status(core, "Usage: tag <n> <title|artist|album> <value>");
            return;
        }
    };
    core.edit_metadata(&id, &edit);
}

fn run_queue_command<W: Write>(core: &mut HarmonyCore, rest: &str, out: &mut W) -> Result<()> {
    let mut split = rest.splitn(2, char::is_whitespace);
    let action = split.next().unwrap_or_default();
    let arg = split.next().unwrap_or("").trim();

    match action {
        "" => {
            for song in core.queue_songs() {
                writeln!(out, "{} - {}", song.title, song.artist)?;
            }
            return Ok(());
        }
        "add" => match song_at(core, arg) {
            Some(id) => core.add_to_queue(&id),
            None => set_status(core, "Usage: queue add <n>"),
        },
        "rm" => match song_at(core, arg) {
            Some(id) => core.remove_from_queue(&id),
            None => set_status(core, "Usage: queue rm <n>"),
        },
        "clear" => core.clear_queue(),
        _ => set_status(core, "Usage: queue [add|rm <n> | clear]"),
    }
    report(core, out)
}

fn run_playlist_command<W: Write>(
    core: &mut HarmonyCore,
    rest: &str,
    out: &mut W,
) -> Result<()> {
    let mut split = rest.splitn(2, char::is_whitespace);
    let action = split.next().unwrap_or_default();
    let args = split.next().unwrap_or("").trim();

    if action == "new" {
        if args.is_empty() {
            set_status(core, "Usage: playlist new <name>");
        } else {
            core.create_playlist(args);
        }
        return report(core, out);
    }

    let mut arg_split = args.splitn(2, char::is_whitespace);
    let Some(playlist) = playlist_at(core, arg_split.next().unwrap_or_default()) else {
        set_status(core, "Usage: playlist <new|add|rm|del|show> <p> [n]");
        return report(core, out);
    };
    let song = song_at(core, arg_split.next().unwrap_or("").trim());

    match (action, song) {
        ("show", _) => {
            for song in core.playlist_songs(&playlist) {
                writeln!(out, "{} - {}", song.title, song.artist)?;
            }
            return Ok(());
        }
        ("del", _) => {
            core.delete_playlist(&playlist);
        }
        ("add", Some(song)) => {
            core.add_to_playlist(&playlist, &song);
        }
        ("rm", Some(song)) => {
            core.remove_from_playlist(&playlist, &song);
        }
        _ => set_status(core, "Usage: playlist <new|add|rm|del|show> <p> [n]"),
    }
    report(core, out)
}

/// Resolves a 1-based position in the song list.
fn song_at(core: &HarmonyCore, arg: &str) -> Option<SongId> {
    let position: usize = arg.trim().parse().ok()?;
    core.songs()
        .get(position.checked_sub(1)?)
        .map(|song| song.id.clone())
}

fn playlist_at(core: &HarmonyCore, arg: &str) -> Option<PlaylistId> {
    let position: usize = arg.trim().parse().ok()?;
    core.playlists()
        .get(position.checked_sub(1)?)
        .map(|playlist| playlist.id.clone())
}

fn set_status(core: &mut HarmonyCore, message: &str) {
    core.status = message.to_string();
    core.dirty = true;
}

fn report<W: Write>(core: &mut HarmonyCore, out: &mut W) -> Result<()> {
    if core.dirty {
        writeln!(out, "{}", core.status)?;
        core.dirty = false;
    }
    Ok(())
}
