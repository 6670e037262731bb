use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub access: AccessSettings,
    pub bootstrap: BootstrapSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

/// Tuning for access code generation.
#[derive(Debug, Deserialize, Clone)]
pub struct AccessSettings {
    /// Upper bound on codes per generation request.
    pub max_batch_size: u32,
    /// Quantity used when a generation request omits it.
    pub default_quantity: u32,
    pub code_length: usize,
    /// Candidates tried per code before the batch gives up.
    pub max_generation_attempts: u32,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 200,
            default_quantity: 1,
            code_length: 10,
            max_generation_attempts: 32,
        }
    }
}

/// Admin account created at startup when both credentials are set.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapSettings {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("COURSEGATE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "coursegate")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "coursegate")?
            .set_default("access.max_batch_size", 200)?
            .set_default("access.default_quantity", 1)?
            .set_default("access.code_length", 10)?
            .set_default("access.max_generation_attempts", 32)?
            .set_default("bootstrap.admin_email", None::<String>)?
            .set_default("bootstrap.admin_password", None::<String>)?
            .set_default("bootstrap.admin_name", "Administrator")?
            .build()?;

        config.try_deserialize()
    }
}
