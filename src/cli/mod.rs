// CLI module for json2sheet
// Author: json2sheet contributors

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// json2sheet - AI-assisted JSON to Excel backend with Gemini context caching
#[derive(Parser, Debug, Default)]
#[command(name = "json2sheet", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.json2sheet/config.toml)
    #[arg(short, long, env = "JSON2SHEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Disable the content cache
    #[arg(long)]
    pub no_cache: bool,
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let args = Args::parse_from(["json2sheet", "--port", "9001", "--no-cache"]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.cache.enabled);
    }
}
