use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// `EnvFilter` directive, e.g. `info` or `edgent_watchman=debug`.
    pub log_level: String,

    /// Log file name, created inside the app root.
    pub log_file: String,

    #[serde(skip)]
    pub app_root: std::path::PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // 1. Try standard dotenv discovery from current dir
        if dotenvy::dotenv().is_err() {
            // 2. Fallback: the .env inside the resolved app root
            let path = crate::path_utils::get_app_root().join(".env");
            if path.exists() {
                let _ = dotenvy::from_path(&path);
            }
        }

        let builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_file", "edgent.log")?
            .add_source(File::with_name("edgent").required(false))
            .add_source(Environment::with_prefix("EDGENT"));

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.app_root = crate::path_utils::get_app_root();

        Ok(config)
    }

    /// Full path of the log file for long-running modes.
    pub fn log_path(&self) -> std::path::PathBuf {
        self.app_root.join(&self.log_file)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "edgent.log".to_string(),
            app_root: crate::path_utils::get_app_root(),
        }
    }
}
