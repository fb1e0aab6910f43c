pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use crate::utils::logger::LogFormat;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

/// `jaxon` 命令列工具的參數
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "jaxon")]
#[command(about = "Check a Jaxon configuration and list its registrations")]
pub struct CliConfig {
    #[arg(long, short, default_value = "jaxon.toml")]
    pub config: String,

    #[arg(long, help = "List the registered classes and their exported methods")]
    pub list: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, help = "Log output format")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        crate::utils::validation::validate_path("config", &self.config)
    }
}
