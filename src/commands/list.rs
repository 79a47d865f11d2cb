//! Plain listing of recordings on the studio server.
//!
//! Non-interactive counterpart to the library: prints one line per
//! recording and exits. Useful for scripts and quick checks.

use crate::config;
use crate::remote::StudioClient;
use std::time::Duration;

/// Prints the recordings on the studio server.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If the listing request fails
pub async fn handle_list() -> Result<(), anyhow::Error> {
    let config_data = config::RecboothConfig::load()?;
    let client = StudioClient::new(
        &config_data.server.url,
        Duration::from_secs(config_data.server.request_timeout_secs),
    )?;

    let recordings = client.list().await?;
    tracing::info!("Listed {} recordings from {}", recordings.len(), client.base_url());

    println!();
    println!(" ┏┓┏┓┏┓ ");
    println!(" ┛ ┗┛┗┛ ");
    println!();

    if recordings.is_empty() {
        println!("No recordings on {} yet.", client.base_url());
        return Ok(());
    }

    println!("{} recordings on {}:", recordings.len(), client.base_url());
    println!();

    let name_width = recordings
        .iter()
        .map(|r| r.filename.len())
        .max()
        .unwrap_or(0);

    for info in &recordings {
        println!(
            "  {:<name_width$}  {:>6.1} MB  {:>5}  {}",
            info.filename,
            info.size_mb,
            info.duration_display(),
            info.created_display()
        );
    }
    println!();

    Ok(())
}
