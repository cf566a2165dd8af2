extern crate nalgebra as na;
mod annotation;
mod camera;
mod config;
mod dataset;
mod debug;
mod driver;
mod objects;
mod projector;
mod render;
mod scenes;
mod sweep;
mod types;

use config::RenderingConfig;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "sdg.toml";

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    log::info!("Loading {}...", config_path.display());
    let config = match RenderingConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let now = std::time::SystemTime::now();
    let report = match driver::generate_dataset(&config) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Dataset generation failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = match now.elapsed() {
        Ok(elapsed) => elapsed,
        Err(e) => {
            log::error!("Failed to get elapsed time: {}", e);
            std::time::Duration::from_secs(0)
        }
    };

    log::info!(
        "Done. {} annotation(s) in {}, {} resumed, {} failed. Time: {:?}",
        report.dataset.len(),
        report.dataset.path().display(),
        report.resumed,
        report.failed.len(),
        elapsed
    );
}
