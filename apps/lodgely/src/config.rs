//! # Configuration
//!
//! Server settings. Every flag falls back to a `LODGELY_*` environment
//! variable and then to a default suitable for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use lodgely_core::password::DEFAULT_COST;

/// Default request body cap for image uploads (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "LODGELY_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// SQLite database file, or `:memory:`.
    #[arg(long, env = "LODGELY_DATABASE", default_value = "lodgely.db")]
    pub database: PathBuf,

    /// Browser origin allowed by CORS; OAuth callbacks redirect here.
    #[arg(
        long,
        env = "LODGELY_CLIENT_ORIGIN",
        default_value = "http://localhost:3000"
    )]
    pub client_origin: String,

    /// Externally visible base URL of this server.
    #[arg(long, env = "LODGELY_PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// Directory for uploaded images, served at `/uploads`.
    #[arg(long, env = "LODGELY_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "LODGELY_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// bcrypt work factor for new password hashes.
    #[arg(long, env = "LODGELY_BCRYPT_COST", default_value_t = DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Global requests per second. 0 disables rate limiting.
    #[arg(long, env = "LODGELY_RATE_LIMIT_PER_SECOND", default_value_t = 0)]
    pub rate_limit_per_second: u32,

    /// Mark session cookies `Secure`.
    #[arg(long, env = "LODGELY_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Resend API key. Without it emails are only logged.
    #[arg(long, env = "LODGELY_RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    #[arg(
        long,
        env = "LODGELY_MAIL_FROM",
        default_value = "Lodgely <no-reply@lodgely.dev>"
    )]
    pub mail_from: String,

    #[arg(long, env = "LODGELY_GITHUB_CLIENT_ID")]
    pub github_client_id: Option<String>,

    #[arg(long, env = "LODGELY_GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub github_client_secret: Option<String>,

    #[arg(long, env = "LODGELY_GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    #[arg(long, env = "LODGELY_GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database: PathBuf::from("lodgely.db"),
            client_origin: "http://localhost:3000".to_string(),
            public_url: "http://localhost:8080".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            bcrypt_cost: DEFAULT_COST,
            rate_limit_per_second: 0,
            secure_cookies: false,
            resend_api_key: None,
            mail_from: "Lodgely <no-reply@lodgely.dev>".to_string(),
            github_client_id: None,
            github_client_secret: None,
            google_client_id: None,
            google_client_secret: None,
        }
    }
}

impl Config {
    /// `public_url` without a trailing slash.
    pub fn public_base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}
