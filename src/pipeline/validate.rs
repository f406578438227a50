// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::utils::log as report;

/// Load and validate the configuration file, then describe every target.
pub fn run_validate(config_path: &Path) -> Result<Config> {
    report::header(&format!("Validating {}", config_path.display()));

    let config = Config::load_validated(config_path).inspect_err(|e| {
        log::error!("Config validation failed: {e}");
    })?;

    report::summary(
        "Crawler",
        &[
            ("user agent", config.crawler.user_agent.clone()),
            ("timeout", format!("{}s", config.crawler.timeout_secs)),
            ("request delay", format!("{}ms", config.crawler.request_delay_ms)),
            ("respect robots.txt", config.crawler.respect_robots.to_string()),
            ("data dir", config.storage.data_dir.display().to_string()),
        ],
    );

    for target_config in &config.targets {
        let target = config.build_target(target_config)?;
        report::summary(
            &target.name,
            &[
                ("enabled", target_config.enabled.to_string()),
                ("url", target.base_url.to_string()),
                ("store", target.store_path.display().to_string()),
                ("columns", target.schema.columns().join(", ")),
                ("max pages", target.max_pages.to_string()),
            ],
        );
    }

    log::info!("Configuration is valid ({} targets)", config.targets.len());
    Ok(config)
}
