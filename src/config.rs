use std::env;
use std::path::PathBuf;

pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8087),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_database_path()),
        }
    }
}

/// Platform data directory, or the working directory when none exists.
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("http-workbench")
        .join("workbench.db")
}
