//! Console transport controls
//!
//! Reads one command per line from stdin and drives the adapter, the store
//! and the scheduler. Every line also counts as a user interaction for the
//! backend host, which unblocks a pending autoplay retry.

use crate::error::{AppError, Result};
use hybrid_core::{Track, TrackCatalog, TrackType};
use hybrid_playback::{Interaction, PlaybackAdapter, PlaybackScheduler, PlayerStore};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  play | pause | stop            transport
  next | prev                    change track
  seek <seconds>                 jump within the track
  vol <0-1>                      set the volume
  loop                           toggle loop mode
  schedule on|off                switch the scheduler
  check                          run a schedule check now
  status                         show the player state
  list                           show the playlist
  add <type> <src> [title]       add a track (mp3, youtube, drive, dropbox, local)
  rm <id>                        move a track to the trash
  clear                          move every track to the trash
  trash                          show the trash
  restore <id>                   bring a track back from the trash
  purge <id>                     delete a trashed track for good
  empty [old]                    empty the trash (old: only after 30 days)
  scan                           pick up files in the server's music folder
  quit";

/// One console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek(f64),
    Volume(f64),
    ToggleLoop,
    Schedule(bool),
    Check,
    Status,
    List,
    Add {
        track_type: TrackType,
        src: String,
        title: Option<String>,
    },
    Remove(String),
    Clear,
    Trash,
    Restore(String),
    Purge(String),
    EmptyTrash { older_than_30_days: bool },
    Scan,
    Help,
    Quit,
}

fn number(arg: Option<&str>, what: &str) -> Result<f64> {
    let arg = arg.ok_or_else(|| AppError::Command(format!("{what} needs a number")))?;
    arg.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::Command(format!("not a number: {arg}")))
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(AppError::Command("empty line".to_string()));
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "seek" => Self::Seek(number(words.next(), "seek")?),
            "vol" | "volume" => Self::Volume(number(words.next(), "vol")?),
            "loop" => Self::ToggleLoop,
            "schedule" => match words.next() {
                Some("on") => Self::Schedule(true),
                Some("off") => Self::Schedule(false),
                _ => return Err(AppError::Command("usage: schedule on|off".to_string())),
            },
            "check" => Self::Check,
            "status" => Self::Status,
            "list" | "ls" => Self::List,
            "add" => {
                let usage = || AppError::Command("usage: add <type> <src> [title]".to_string());
                let track_type = words.next().ok_or_else(usage)?;
                let track_type = TrackType::from_str(track_type).ok_or_else(|| {
                    AppError::Command(format!("unknown track type: {track_type}"))
                })?;
                let src = words.next().ok_or_else(usage)?.to_string();
                let title = words.collect::<Vec<_>>().join(" ");
                Self::Add {
                    track_type,
                    src,
                    title: (!title.is_empty()).then_some(title),
                }
            }
            "rm" | "remove" => match words.next() {
                Some(id) => Self::Remove(id.to_string()),
                None => return Err(AppError::Command("usage: rm <id>".to_string())),
            },
            "clear" => Self::Clear,
            "trash" => Self::Trash,
            "restore" => match words.next() {
                Some(id) => Self::Restore(id.to_string()),
                None => return Err(AppError::Command("usage: restore <id>".to_string())),
            },
            "purge" => match words.next() {
                Some(id) => Self::Purge(id.to_string()),
                None => return Err(AppError::Command("usage: purge <id>".to_string())),
            },
            "empty" => match words.next() {
                None => Self::EmptyTrash {
                    older_than_30_days: false,
                },
                Some("old") => Self::EmptyTrash {
                    older_than_30_days: true,
                },
                Some(_) => return Err(AppError::Command("usage: empty [old]".to_string())),
            },
            "scan" => Self::Scan,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(AppError::Command(format!("unknown command: {other}"))),
        };

        Ok(command)
    }
}

/// Human-readable `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Executes console commands against the running player
pub struct Console {
    adapter: PlaybackAdapter,
    scheduler: PlaybackScheduler,
    catalog: Arc<dyn TrackCatalog>,
    interactions: Box<dyn Fn(Interaction) + Send + Sync>,
}

impl Console {
    pub fn new(
        adapter: PlaybackAdapter,
        scheduler: PlaybackScheduler,
        catalog: Arc<dyn TrackCatalog>,
        interactions: impl Fn(Interaction) + Send + Sync + 'static,
    ) -> Self {
        Self {
            adapter,
            scheduler,
            catalog,
            interactions: Box::new(interactions),
        }
    }

    fn store(&self) -> &PlayerStore {
        self.adapter.store()
    }

    /// Load and play `track`, starting at `resume` seconds
    async fn play_current(&self, track: Option<Track>, resume: f64) -> Result<String> {
        let Some(track) = track else {
            return Ok("no track".to_string());
        };
        self.adapter.load_track(&track).await?;
        self.adapter.play().await?;
        if resume > 0.0 {
            self.adapter.seek(resume).await?;
        }
        Ok(format!("playing {}", track.title))
    }

    /// Run one command and return the text to show
    pub async fn execute(&self, command: Command) -> Result<String> {
        let store = self.store();

        match command {
            Command::Play => {
                if self.adapter.active_kind().await.is_some() {
                    self.adapter.play().await?;
                    return Ok("playing".to_string());
                }
                let (track, resume) = store.read(|s| (s.current_track.clone(), s.current_time));
                match track {
                    Some(track) => self.play_current(Some(track), resume).await,
                    None => self.play_current(store.play_track_at_index(0), 0.0).await,
                }
            }
            Command::Pause => {
                self.adapter.pause().await?;
                Ok("paused".to_string())
            }
            Command::Stop => {
                self.adapter.stop().await?;
                Ok("stopped".to_string())
            }
            Command::Next => {
                let track = store.next_track();
                self.play_current(track, 0.0).await
            }
            Command::Previous => {
                let track = store.previous_track();
                self.play_current(track, 0.0).await
            }
            Command::Seek(position) => {
                self.adapter.seek(position).await?;
                Ok(format!("at {}", format_time(store.read(|s| s.current_time))))
            }
            Command::Volume(volume) => {
                self.adapter.set_volume(volume).await?;
                Ok(format!("volume {:.0}%", store.read(|s| s.volume) * 100.0))
            }
            Command::ToggleLoop => {
                let enabled = store.toggle_loop_mode();
                Ok(format!("loop {}", if enabled { "on" } else { "off" }))
            }
            Command::Schedule(enabled) => {
                store.set_scheduler_enabled(enabled);
                Ok(format!("scheduler {}", if enabled { "on" } else { "off" }))
            }
            Command::Check => Ok(self.scheduler.check_now().await.to_string()),
            Command::Status => Ok(self.status()),
            Command::List => Ok(self.list()),
            Command::Add {
                track_type,
                src,
                title,
            } => {
                let title = title.unwrap_or_else(|| src.clone());
                let track = Track::new(title, String::new(), track_type, src);
                let created = store.add_track(self.catalog.as_ref(), &track).await?;
                Ok(format!("added {} ({})", created.title, created.id))
            }
            Command::Remove(id) => {
                if store.remove_track(self.catalog.as_ref(), &id).await? {
                    Ok(format!("removed {id}"))
                } else {
                    Ok(format!("no track with id {id}"))
                }
            }
            Command::Clear => {
                let count = store.clear_playlist(self.catalog.as_ref()).await?;
                self.adapter.cleanup().await;
                Ok(format!("moved {count} tracks to the trash"))
            }
            Command::Trash => {
                store.load_trash(self.catalog.as_ref()).await?;
                Ok(self.trash())
            }
            Command::Restore(id) => {
                store.restore_track(self.catalog.as_ref(), &id).await?;
                Ok(format!("restored {id}"))
            }
            Command::Purge(id) => {
                store
                    .delete_track_permanently(self.catalog.as_ref(), &id)
                    .await?;
                Ok(format!("deleted {id} for good"))
            }
            Command::EmptyTrash { older_than_30_days } => {
                let purged = store
                    .empty_trash(self.catalog.as_ref(), older_than_30_days)
                    .await?;
                Ok(format!("purged {purged} tracks"))
            }
            Command::Scan => {
                let report = store.scan_local_folder(self.catalog.as_ref()).await?;
                if report.message.is_empty() {
                    Ok(format!("added {} tracks", report.added))
                } else {
                    Ok(report.message)
                }
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok("bye".to_string()),
        }
    }

    fn status(&self) -> String {
        let state = self.store().snapshot();
        let mut out = String::new();

        match &state.current_track {
            Some(track) => {
                let _ = writeln!(
                    out,
                    "{} {} [{}]",
                    if state.is_playing { "playing" } else { "paused" },
                    track.title,
                    track.track_type
                );
            }
            None => out.push_str("no track selected\n"),
        }
        if state.is_loading {
            out.push_str("loading\n");
        }
        let _ = writeln!(
            out,
            "{} / {} ({:.0}%)",
            format_time(state.current_time),
            format_time(state.duration),
            state.progress()
        );
        let _ = writeln!(
            out,
            "volume {:.0}%  loop {}  scheduler {}",
            state.volume * 100.0,
            if state.loop_mode { "on" } else { "off" },
            if state.scheduler_enabled { "on" } else { "off" }
        );
        let schedule = &state.schedule_config;
        let _ = write!(
            out,
            "weekdays {}-{}  weekends {}-{}  (inside now: {})",
            schedule.weekdays.start,
            schedule.weekdays.end,
            schedule.weekends.start,
            schedule.weekends.end,
            self.scheduler.should_be_playing_now()
        );
        out
    }

    fn list(&self) -> String {
        let state = self.store().snapshot();
        if state.playlist.is_empty() {
            return "playlist is empty".to_string();
        }

        let mut out = String::new();
        for (index, track) in state.playlist.iter().enumerate() {
            let marker = if state.current_index == Some(index) { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{marker} {index:>3}  {:<8} {}  ({})",
                track.track_type.as_str(),
                track.title,
                track.id
            );
        }
        out.trim_end().to_string()
    }

    fn trash(&self) -> String {
        let trash = self.store().read(|s| s.trash.clone());
        if trash.is_empty() {
            return "trash is empty".to_string();
        }

        let mut out = String::new();
        for track in &trash {
            let _ = writeln!(out, "  {:<8} {}  ({})", track.track_type.as_str(), track.title, track.id);
        }
        out.trim_end().to_string()
    }

    /// Read commands from `input` until `quit` or end of input
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            (self.interactions)(Interaction::KeyPress);

            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    println!("{e} (type `help`)");
                    continue;
                }
            };
            debug!(?command, "Console command");

            let quit = command == Command::Quit;
            match self.execute(command).await {
                Ok(reply) => println!("{reply}"),
                Err(e) => {
                    warn!(error = %e, "Command failed");
                    println!("error: {e}");
                }
            }
            if quit {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_commands() {
        assert_eq!("play".parse::<Command>().unwrap(), Command::Play);
        assert_eq!("  PAUSE ".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("prev".parse::<Command>().unwrap(), Command::Previous);
        assert_eq!("seek 42.5".parse::<Command>().unwrap(), Command::Seek(42.5));
        assert_eq!("vol 0.3".parse::<Command>().unwrap(), Command::Volume(0.3));
        assert_eq!("schedule on".parse::<Command>().unwrap(), Command::Schedule(true));
        assert_eq!("schedule off".parse::<Command>().unwrap(), Command::Schedule(false));
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn parses_add_with_multi_word_title() {
        let command = "add dropbox https://www.dropbox.com/s/x/mix.mp3?dl=0 Morning Mix"
            .parse::<Command>()
            .unwrap();
        assert_eq!(
            command,
            Command::Add {
                track_type: TrackType::Dropbox,
                src: "https://www.dropbox.com/s/x/mix.mp3?dl=0".into(),
                title: Some("Morning Mix".into()),
            }
        );

        let command = "add mp3 https://cdn.example.com/a.mp3".parse::<Command>().unwrap();
        assert!(matches!(command, Command::Add { title: None, .. }));
    }

    #[test]
    fn parses_trash_commands() {
        assert_eq!("clear".parse::<Command>().unwrap(), Command::Clear);
        assert_eq!("restore t1".parse::<Command>().unwrap(), Command::Restore("t1".into()));
        assert_eq!("purge t1".parse::<Command>().unwrap(), Command::Purge("t1".into()));
        assert_eq!(
            "empty".parse::<Command>().unwrap(),
            Command::EmptyTrash {
                older_than_30_days: false
            }
        );
        assert_eq!(
            "empty old".parse::<Command>().unwrap(),
            Command::EmptyTrash {
                older_than_30_days: true
            }
        );
        assert_eq!("scan".parse::<Command>().unwrap(), Command::Scan);
    }

    #[test]
    fn rejects_bad_input() {
        for line in [
            "", "dance", "seek", "seek soon", "vol NaN", "schedule maybe", "add vinyl x", "add mp3", "rm",
            "restore", "purge", "empty all",
        ] {
            assert!(line.parse::<Command>().is_err(), "{line:?} should not parse");
        }
    }

    #[test]
    fn formats_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
