//! # configs
//!
//! Layered runtime settings for the forum binary.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. environment variables prefixed `FORUM__`, nested with `__`
//!    (e.g. `FORUM__SERVER__PORT=8080`, `FORUM__AUTH__JWT_SECRET=...`)
//!
//! A `.env` file in the working directory is loaded into the environment
//! before step 4.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use rf_core::guard::ContentPolicy;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "FORUM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. `sqlite://forum.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

/// Admin account created at startup when both fields are set.
#[derive(Debug, Default, Deserialize)]
pub struct BootstrapSettings {
    pub admin_username: Option<String>,
    pub admin_password: Option<SecretString>,
}

impl BootstrapSettings {
    pub fn admin(&self) -> Option<(&str, &SecretString)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(name), Some(password)) => Some((name.as_str(), password)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub forum: ContentPolicy,
    pub log: LogSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

impl Settings {
    /// Loads `.env`, then every layered source.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::layered(Self::environment())
    }

    /// Defaults, both config files, then `env` on top.
    pub fn layered(env: Environment) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(env);
        Self::from_builder(builder)
    }

    /// The `FORUM__` environment source. `forum.prohibited_words` is a
    /// comma-separated list.
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("forum.prohibited_words")
            .try_parsing(true)
    }

    /// Built-in defaults. Everything except the JWT secret has one.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://forum.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.forum = settings.forum.without_blank_words();
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        if self.forum.max_depth == 0 {
            return Err(ConfigError::Invalid("forum.max_depth must be at least 1".into()));
        }
        for (name, bounds) in [
            ("thread_content", self.forum.thread_content),
            ("reply_content", self.forum.reply_content),
            ("title", self.forum.title),
        ] {
            if bounds.min > bounds.max {
                return Err(ConfigError::Invalid(format!(
                    "forum.{name}: min {} exceeds max {}",
                    bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        Settings::from_builder(Settings::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let settings = from_toml("[auth]\njwt_secret = \"s3cret\"").unwrap();
        assert_eq!(settings.server.addr(), "127.0.0.1:3000");
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.auth.token_ttl_hours, 24);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert_eq!(settings.forum, ContentPolicy::default());
        assert!(settings.bootstrap.admin().is_none());
    }

    #[test]
    fn bootstrap_admin_needs_both_fields() {
        let half = from_toml("[auth]\njwt_secret = \"s3cret\"\n[bootstrap]\nadmin_username = \"root\"").unwrap();
        assert!(half.bootstrap.admin().is_none());

        let full = from_toml(
            "[auth]\njwt_secret = \"s3cret\"\n[bootstrap]\nadmin_username = \"root\"\nadmin_password = \"changeme123\"",
        )
        .unwrap();
        let (name, password) = full.bootstrap.admin().unwrap();
        assert_eq!(name, "root");
        assert_eq!(password.expose_secret(), "changeme123");
    }

    #[test]
    fn missing_secret_fails_to_load() {
        assert!(matches!(from_toml(""), Err(ConfigError::Load(_))));
    }

    #[test]
    fn blank_secret_is_invalid() {
        assert!(matches!(
            from_toml("[auth]\njwt_secret = \"  \""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn forum_policy_overrides_are_partial() {
        let settings = from_toml(
            "[auth]\njwt_secret = \"s3cret\"\n\
             [forum]\nmax_depth = 5\nprohibited_words = [\"spam\"]\n\
             [log]\nformat = \"json\"",
        )
        .unwrap();
        assert_eq!(settings.forum.max_depth, 5);
        assert_eq!(settings.forum.prohibited_words, vec!["spam"]);
        assert_eq!(settings.forum.title, ContentPolicy::default().title);
        assert_eq!(settings.log.format, LogFormat::Json);
    }

    fn from_env(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<_, _>>();
        Settings::layered(Settings::environment().source(Some(vars)))
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = from_env(&[
            ("FORUM__AUTH__JWT_SECRET", "from-env"),
            ("FORUM__SERVER__PORT", "8080"),
            ("FORUM__FORUM__MAX_DEPTH", "5"),
            ("FORUM__FORUM__PROHIBITED_WORDS", "spam,scam"),
            ("OTHER__SERVER__PORT", "9999"),
        ])
        .unwrap();
        assert_eq!(settings.auth.jwt_secret.expose_secret(), "from-env");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.forum.max_depth, 5);
        assert_eq!(settings.forum.prohibited_words, vec!["spam", "scam"]);
        assert_eq!(settings.forum.title, ContentPolicy::default().title);
    }

    #[test]
    fn empty_denylist_from_environment_disables_it() {
        let settings = from_env(&[
            ("FORUM__AUTH__JWT_SECRET", "from-env"),
            ("FORUM__FORUM__PROHIBITED_WORDS", ""),
        ])
        .unwrap();
        assert!(settings.forum.prohibited_words.is_empty());

        let spaced = from_env(&[
            ("FORUM__AUTH__JWT_SECRET", "from-env"),
            ("FORUM__FORUM__PROHIBITED_WORDS", "spam, ,scam "),
        ])
        .unwrap();
        assert_eq!(spaced.forum.prohibited_words, vec!["spam", "scam"]);
    }

    #[test]
    fn blank_denylist_entries_in_files_are_dropped() {
        let settings = from_toml(
            "[auth]\njwt_secret = \"s3cret\"\n[forum]\nprohibited_words = [\"\", \" tesla \"]",
        )
        .unwrap();
        assert_eq!(settings.forum.prohibited_words, vec!["tesla"]);
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let err = from_toml(
            "[auth]\njwt_secret = \"s3cret\"\n[forum.title]\nmin = 50\nmax = 10",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("forum.title")));
    }
}
