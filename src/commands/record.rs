//! Recording session command.
//!
//! Runs a capture session with live level meters, pause and resume, then
//! uploads the finished take to the studio server. Supports an external
//! finish trigger via SIGUSR1.

use crate::config;
use crate::quality::QualityTier;
use crate::remote::StudioClient;
use crate::session::{CpalCaptureBackend, RecordingController};
use crate::ui::{ErrorScreen, RecordCommand, RecordScreen, RecordView};
use std::time::{Duration, Instant};

/// Runs an interactive recording session and uploads the result.
///
/// `quality` overrides the configured default tier when given. The session
/// loop polls input, cuts chunks and refreshes the meters until the user
/// finishes (Enter or SIGUSR1) or cancels (Escape, 'q', Ctrl+C).
pub async fn handle_record(quality: Option<QualityTier>) -> Result<(), anyhow::Error> {
    tracing::info!("=== recbooth recorder started ===");

    let config_data = match config::RecboothConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/recbooth/recbooth.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    let tier = quality.unwrap_or(config_data.audio.quality);
    let profile = tier.profile();

    tracing::info!(
        "Configuration loaded: device={}, quality={} ({} Hz, {} ch, {}-bit), peak_threshold={}%",
        config_data.audio.device,
        tier,
        profile.sample_rate,
        profile.channels,
        profile.bit_depth,
        config_data.audio.peak_level_threshold
    );

    let mut controller = RecordingController::new(
        Box::new(CpalCaptureBackend),
        config_data.audio.device.clone(),
        Duration::from_millis(config_data.audio.chunk_interval_ms),
        config_data.audio.peak_level_threshold,
    );

    if let Err(e) = controller.start(tier, Instant::now()) {
        tracing::error!("Failed to start session: {e}");
        let error_message =
            format!("Recording Error:\n\n{e}\n\nPlease check your audio configuration and try again.");
        let mut error_screen = ErrorScreen::new()?;
        error_screen.show_error(&error_message)?;
        error_screen.cleanup()?;
        return Err(e.into());
    }

    let fallback_notice = controller.encoding_fallback().map(|f| f.to_string());
    if let Some(ref notice) = fallback_notice {
        tracing::warn!("{notice}");
    }

    let mut screen = RecordScreen::new().map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    let finish_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, finish_flag.clone())
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering session loop. Press 'Enter' to finish or 'Escape'/'q' to cancel.");
    let mut should_upload = false;

    loop {
        let now = Instant::now();

        if finish_flag.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: finishing via external trigger");
            should_upload = true;
            break;
        }

        match screen.handle_input() {
            Ok(RecordCommand::Continue) => {
                controller.tick(now);

                if controller.display_due(now) {
                    tracing::debug!(
                        "Recording: {:.1}s elapsed, {} chunks",
                        controller.elapsed(now).as_secs_f32(),
                        controller.chunk_count()
                    );
                }

                let view = RecordView {
                    state: controller.state(),
                    elapsed: controller.elapsed(now),
                    levels: controller.meter_frame().unwrap_or_default(),
                    peaking: controller.is_peaking(),
                    controls: controller.controls(),
                    status: fallback_notice.as_deref(),
                };
                screen.render(&view)?;
            }
            Ok(RecordCommand::TogglePause) => {
                let controls = controller.controls();
                let result = if controls.can_pause {
                    controller.pause(now)
                } else if controls.can_resume {
                    controller.resume(now)
                } else {
                    Ok(())
                };
                if let Err(e) = result {
                    tracing::warn!("Pause toggle rejected: {e}");
                }

                let view = RecordView {
                    state: controller.state(),
                    elapsed: controller.elapsed(now),
                    levels: controller.meter_frame().unwrap_or_default(),
                    peaking: controller.is_peaking(),
                    controls: controller.controls(),
                    status: fallback_notice.as_deref(),
                };
                screen.render(&view)?;
            }
            Ok(RecordCommand::Finish) => {
                should_upload = true;
                break;
            }
            Ok(RecordCommand::Cancel) => {
                break;
            }
            Err(e) => {
                tracing::error!("Input handling error: {e}");
                return Err(e);
            }
        }
    }

    if !should_upload {
        controller.abort();
        screen.cleanup()?;
        println!("Recording canceled, nothing uploaded.");
        tracing::info!("=== recbooth recorder exited (canceled) ===");
        return Ok(());
    }

    tracing::debug!("Stopping session and encoding upload payload...");
    let finished = controller.stop(Instant::now())?;
    let elapsed = finished.elapsed;

    if finished.payload.is_empty() {
        screen.cleanup()?;
        println!("Recording discarded: no audio was captured.");
        tracing::info!("=== recbooth recorder exited (empty take) ===");
        return Ok(());
    }

    let size_mb = finished.payload.bytes.len() as f64 / 1_048_576.0;
    let client = StudioClient::new(
        &config_data.server.url,
        Duration::from_secs(config_data.server.request_timeout_secs),
    )?;

    let payload = finished.payload;
    let upload_client = client.clone();
    let upload_handle = tokio::spawn(async move { upload_client.upload(&payload).await });

    let mut tick = 0usize;
    loop {
        if let Err(e) = screen.render_busy("Uploading recording...", tick) {
            tracing::warn!("Failed to render upload spinner: {e}");
        }
        tick += 1;

        if upload_handle.is_finished() {
            break;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    match upload_handle.await {
        Ok(Ok(receipt)) => {
            screen.cleanup()?;
            let name = receipt
                .filename
                .unwrap_or_else(|| "recording.wav".to_string());
            let secs = elapsed.as_secs();
            println!("Uploaded {name} ({}:{:02}, {size_mb:.1} MB)", secs / 60, secs % 60);
            if let Some(warning) = receipt.warning {
                println!("Server warning: {warning}");
            }
            tracing::info!("Upload acknowledged as {name}");
            tracing::info!("=== recbooth recorder exited successfully ===");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("Upload failed: {e}");
            screen.cleanup().ok();
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&format!(
                "Upload Error:\n\n{e}\n\nThe recording was not saved on the server."
            ))?;
            error_screen.cleanup()?;
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Upload task failed: {e}");
            screen.cleanup().ok();
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&format!("Upload Error:\n\n{e}"))?;
            error_screen.cleanup()?;
            Err(anyhow::anyhow!("Upload task failed: {e}"))
        }
    }
}
