//! recbooth entry point.

mod app;
mod commands;
mod config;
mod error;
mod logging;
mod monitor;
mod playback;
mod quality;
mod remote;
mod session;
mod setup;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
