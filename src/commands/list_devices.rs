//! List available audio input devices.

use crate::quality::QualityTier;
use crate::session::capture::silence_alsa;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

/// Lists all available audio input devices on the system, with the quality
/// tiers each device can capture at.
///
/// # Errors
/// - If the audio host cannot be initialized
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    // Enumerate devices while hiding ALSA's startup chatter
    let (host, device_results) = silence_alsa(|| -> anyhow::Result<_> {
        let host = cpal::default_host();
        let device_iter = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?;

        // Skip devices that cannot even report a name
        let devices: Vec<cpal::Device> = device_iter.filter(|d| d.name().is_ok()).collect();

        Ok((host, devices))
    })?;

    if device_results.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!(" ┏┓┏┓┏┓ ");
    println!(" ┛ ┗┛┗┛ ");
    println!();
    println!("Available audio input devices:");
    println!();

    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    for (index, device) in device_results.iter().enumerate() {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let is_default = default_device.as_ref() == Some(&device_name);

        let default_indicator = if is_default { " [DEFAULT]" } else { "" };

        let config_info = match device.default_input_config() {
            Ok(config) => {
                format!(" ({}Hz, {} channels)", config.sample_rate().0, config.channels())
            }
            Err(_) => " (configuration unavailable)".to_string(),
        };

        let tiers = silence_alsa(|| supported_tiers(device));
        let tier_info = if tiers.is_empty() {
            "none of the standard profiles".to_string()
        } else {
            tiers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        println!("  ID: {}", index);
        println!("    Name: {}{}", device_name, default_indicator);
        println!("    Config:{}", config_info);
        println!("    Quality tiers: {}", tier_info);
        println!();
    }

    Ok(())
}

/// Quality tiers whose sample rate and channel count this device can serve.
fn supported_tiers(device: &cpal::Device) -> Vec<QualityTier> {
    let Ok(configs) = device.supported_input_configs() else {
        return Vec::new();
    };
    let ranges: Vec<_> = configs.collect();

    [QualityTier::High, QualityTier::Medium, QualityTier::Low]
        .into_iter()
        .filter(|tier| {
            let profile = tier.profile();
            ranges.iter().any(|range| {
                range.channels() == profile.channels
                    && range.min_sample_rate().0 <= profile.sample_rate
                    && profile.sample_rate <= range.max_sample_rate().0
            })
        })
        .collect()
}
