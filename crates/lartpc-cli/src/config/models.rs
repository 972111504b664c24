use lartpc::engine::config::ScanConfig;
use std::path::PathBuf;

#[derive(Debug)]
pub struct AppConfig {
    /// The configuration file that was merged, if any.
    pub config_source: Option<PathBuf>,
    pub core_config: ScanConfig,
}
