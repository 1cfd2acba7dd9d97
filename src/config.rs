// Configuration loader. Settings come from environment variables (a `.env`
// file in the working directory is loaded by the binary beforehand), and are
// collected into one explicitly passed `Config` value.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 3600;

const REQUIRED_VARS: [&str; 6] = [
    "UPLOAD_URL",
    "PEERTUBE_INSTANCE",
    "CLIENT_ID",
    "CLIENT_SECRET",
    "USERNAME",
    "PASSWORD",
];

/// Everything the client needs to talk to a PeerTube instance.
#[derive(Debug)]
pub struct Config {
    /// Host receiving the binary upload (may differ from the API instance).
    pub upload_url: String,
    pub instance_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    pub verify_ssl: bool,
    /// Root of the course-document tree used to resolve chapter titles.
    pub courses_path: Option<PathBuf>,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. All missing
    /// required variables are reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| lookup(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        // Presence was checked above.
        let required = |name: &str| lookup(name).unwrap_or_default();

        let verify_ssl = lookup("VERIFY_SSL")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(true);

        Ok(Config {
            upload_url: normalize_url(&required("UPLOAD_URL")),
            instance_url: normalize_url(&required("PEERTUBE_INSTANCE")),
            client_id: required("CLIENT_ID"),
            client_secret: SecretString::new(required("CLIENT_SECRET")),
            username: required("USERNAME"),
            password: SecretString::new(required("PASSWORD")),
            verify_ssl,
            courses_path: lookup("PATH_TO_COURSES")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            request_timeout: timeout_var(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            upload_timeout: timeout_var(&lookup, "UPLOAD_TIMEOUT_SECS", DEFAULT_UPLOAD_TIMEOUT_SECS)?,
        })
    }
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn timeout_var<F>(lookup: &F, name: &str, default_secs: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| Error::Config(format!("{} must be a number of seconds, got '{}'", name, raw))),
    }
}
