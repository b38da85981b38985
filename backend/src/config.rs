use std::path::PathBuf;

/// Database file created next to the working directory when none is configured.
pub const DEFAULT_DB_PATH: &str = "datos_importados.db";

/// Runtime settings of the importer. Shared with the handlers as `web::Data<AppConfig>`,
/// so the database path reaches the writer as an explicit argument.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl AppConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
