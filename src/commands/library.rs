//! Interactive recording library.
//!
//! Lists the recordings on the studio server and plays them back inside the
//! terminal. Media arrives over async fetches; the loop feeds completions
//! into the playback controller and redraws badges every frame.

use crate::config;
use crate::error::RemoteError;
use crate::playback::{
    CpalAudioOutput, PlayOutcome, PlaybackController, PlaybackNote, LOAD_TIMEOUT,
};
use crate::remote::{RecordingInfo, StudioClient};
use crate::ui::{LibraryCommand, LibraryScreen, RowView};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};

const STATUS_TTL: Duration = Duration::from_secs(4);

/// Completions from background server requests.
enum NetMsg {
    Listing(Result<Vec<RecordingInfo>, RemoteError>),
    Media {
        filename: String,
        attempt: u64,
        result: Result<Vec<u8>, RemoteError>,
    },
    Deleted {
        filename: String,
        result: Result<(), RemoteError>,
    },
}

/// Runs the interactive library loop.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If the initial listing request fails
/// - If the terminal cannot be initialized
pub async fn handle_library() -> Result<(), anyhow::Error> {
    tracing::info!("=== recbooth library started ===");

    let config_data = config::RecboothConfig::load()?;
    let client = StudioClient::new(
        &config_data.server.url,
        Duration::from_secs(config_data.server.request_timeout_secs),
    )?;

    // First listing happens before the alternate screen so connection
    // problems print as plain text.
    let mut recordings = client.list().await?;
    tracing::info!("Listed {} recordings from {}", recordings.len(), client.base_url());

    if recordings.is_empty() {
        println!("No recordings on {} yet.", client.base_url());
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<NetMsg>();
    let mut controller = PlaybackController::new(Box::new(CpalAudioOutput));
    controller.set_known(recordings.iter().map(|r| r.filename.clone()));

    let interrupted = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, std::sync::atomic::Ordering::Relaxed);
        })
        .map_err(|e| anyhow::anyhow!("Failed to register Ctrl+C handler: {e}"))?;
    }

    let mut screen = LibraryScreen::new()?;
    let mut status: Option<(String, Instant)> = Some((
        format!("{} recordings on {}", recordings.len(), client.base_url()),
        Instant::now(),
    ));

    loop {
        if interrupted.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::info!("Received Ctrl+C: leaving library");
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            match msg {
                NetMsg::Listing(Ok(rows)) => {
                    controller.set_known(rows.iter().map(|r| r.filename.clone()));
                    recordings = rows;
                    set_status(&mut status, format!("{} recordings", recordings.len()));
                }
                NetMsg::Listing(Err(e)) => {
                    tracing::warn!("Refresh failed: {e}");
                    set_status(&mut status, format!("Refresh failed: {e}"));
                }
                NetMsg::Media {
                    filename,
                    attempt,
                    result,
                } => match result {
                    Ok(bytes) => controller.media_ready(&filename, attempt, bytes),
                    Err(e) => controller.media_failed(&filename, attempt, &e.to_string()),
                },
                NetMsg::Deleted { filename, result } => match result {
                    Ok(()) => {
                        tracing::info!("Deleted {filename}");
                        set_status(&mut status, format!("Deleted {filename}"));
                        spawn_refresh(client.clone(), tx.clone());
                    }
                    Err(e) => {
                        tracing::warn!("Delete of {filename} failed: {e}");
                        set_status(&mut status, format!("Delete failed: {e}"));
                    }
                },
            }
        }

        controller.tick(Instant::now());

        for note in controller.take_notes() {
            match &note {
                PlaybackNote::Failed { filename, detail } => {
                    tracing::warn!("Playback of {filename} failed: {detail}");
                }
                PlaybackNote::TimedOut(filename) => {
                    tracing::warn!("Load of {filename} timed out");
                }
                PlaybackNote::Playing(filename) => {
                    tracing::info!("Playing {filename}");
                }
                _ => {}
            }
            set_status(&mut status, describe_note(&note));
        }

        if let Some((_, set_at)) = status {
            if set_at.elapsed() >= STATUS_TTL {
                status = None;
            }
        }

        let rows: Vec<RowView> = recordings
            .iter()
            .map(|info| RowView {
                filename: info.filename.clone(),
                detail: format!(
                    "{:>6.1} MB  {:>5}  {}",
                    info.size_mb,
                    info.duration_display(),
                    info.created_display()
                ),
                state: controller.state_of(&info.filename),
            })
            .collect();

        screen.draw(&rows, status.as_ref().map(|(text, _)| text.as_str()))?;

        match screen.poll_input()? {
            Some(LibraryCommand::Quit) => break,
            Some(LibraryCommand::Play) => {
                if let Some(filename) = selected_filename(&screen, &recordings) {
                    match controller.play(&filename, Instant::now()) {
                        Ok(PlayOutcome::FetchStarted { attempt }) => {
                            spawn_fetch(client.clone(), tx.clone(), filename, attempt);
                        }
                        Ok(PlayOutcome::Paused) => {
                            set_status(&mut status, format!("Paused {filename}"));
                        }
                        Ok(PlayOutcome::Resumed) => {
                            set_status(&mut status, format!("Playing {filename}"));
                        }
                        Ok(PlayOutcome::AlreadyLoading) => {
                            set_status(&mut status, format!("{filename} is still loading"));
                        }
                        Err(e) => {
                            tracing::warn!("Play rejected: {e}");
                            set_status(&mut status, e.to_string());
                        }
                    }
                }
            }
            Some(LibraryCommand::Stop) => {
                if let Some(filename) = selected_filename(&screen, &recordings) {
                    match controller.stop(&filename) {
                        Ok(()) => set_status(&mut status, format!("Stopped {filename}")),
                        Err(e) => set_status(&mut status, e.to_string()),
                    }
                }
            }
            Some(LibraryCommand::StopAll) => {
                controller.stop_all();
                set_status(&mut status, "Stopped all playback".to_string());
            }
            Some(LibraryCommand::Delete) => {
                if let Some(filename) = selected_filename(&screen, &recordings) {
                    // Tear down any playback or load before the row goes away.
                    if let Err(e) = controller.stop(&filename) {
                        tracing::debug!("Pre-delete stop skipped: {e}");
                    }
                    set_status(&mut status, format!("Deleting {filename}..."));
                    spawn_delete(client.clone(), tx.clone(), filename);
                }
            }
            Some(LibraryCommand::Refresh) => {
                set_status(&mut status, "Refreshing...".to_string());
                spawn_refresh(client.clone(), tx.clone());
            }
            None => {}
        }
    }

    controller.stop_all();
    screen.cleanup()?;
    tracing::info!("=== recbooth library closed ===");
    Ok(())
}

fn selected_filename(screen: &LibraryScreen, recordings: &[RecordingInfo]) -> Option<String> {
    screen
        .selected()
        .and_then(|idx| recordings.get(idx))
        .map(|info| info.filename.clone())
}

fn set_status(status: &mut Option<(String, Instant)>, text: String) {
    *status = Some((text, Instant::now()));
}

fn describe_note(note: &PlaybackNote) -> String {
    match note {
        PlaybackNote::Loading(filename) => format!("Loading {filename}..."),
        PlaybackNote::Playing(filename) => format!("Playing {filename}"),
        PlaybackNote::Finished(filename) => format!("Finished {filename}"),
        PlaybackNote::TimedOut(filename) => format!(
            "{filename} did not load within {}s, gave up",
            LOAD_TIMEOUT.as_secs()
        ),
        PlaybackNote::Failed { filename, detail } => {
            format!("Playback of {filename} failed: {detail}")
        }
    }
}

fn spawn_fetch(client: StudioClient, tx: UnboundedSender<NetMsg>, filename: String, attempt: u64) {
    tokio::spawn(async move {
        let result = client.fetch(&filename).await;
        let _ = tx.send(NetMsg::Media {
            filename,
            attempt,
            result,
        });
    });
}

fn spawn_refresh(client: StudioClient, tx: UnboundedSender<NetMsg>) {
    tokio::spawn(async move {
        let result = client.list().await;
        let _ = tx.send(NetMsg::Listing(result));
    });
}

fn spawn_delete(client: StudioClient, tx: UnboundedSender<NetMsg>, filename: String) {
    tokio::spawn(async move {
        let result = client.delete(&filename).await;
        let _ = tx.send(NetMsg::Deleted { filename, result });
    });
}
