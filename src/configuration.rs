use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token and password-hash settings.
///
/// The two token kinds use independent secrets so a leaked access-token
/// secret cannot forge refresh tokens and vice versa. The access TTL must be
/// shorter than the refresh TTL.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub access_token_secret: String,
    pub access_token_expiry: i64, // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_secret: String,
    pub refresh_token_expiry: i64, // seconds (e.g., 864000 for 10 days)
    pub bcrypt_cost: u32,
    pub issuer: String,
}

/// External media-upload collaborator (avatar/cover storage).
#[derive(serde::Deserialize, Clone)]
pub struct MediaSettings {
    pub base_url: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;
    settings.try_deserialize::<Settings>()
}
