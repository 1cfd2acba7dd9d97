// Token lifecycle manager: hands out a valid access token, reusing the
// stored one while it is fresh, refreshing it when only the access token
// expired, and logging in again with the password grant otherwise.

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::credentials::{Clock, Credential, SystemClock};
use crate::error::{Error, Result};

/// Client registration and user login used for the password grant.
#[derive(Debug)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
}

/// Payload of `/api/v1/users/token`. Missing expiry fields default to zero,
/// which makes the tokens count as expired on the next request.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    refresh_token_expires_in: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    Password,
    Refresh,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Grant::Password => "password",
            Grant::Refresh => "refresh_token",
        }
    }
}

/// Outcome of a single token exchange that reached the server.
#[derive(Debug)]
enum Exchange {
    Granted(Credential),
    /// Non-2xx status, or a 2xx body without a usable access token.
    Rejected { status: u16, body: String },
}

/// Owns the credential store and is the only component that mutates it.
pub struct TokenManager {
    http: Client,
    token_url: String,
    oauth: OAuthCredentials,
    credential: Credential,
    clock: Box<dyn Clock + Send>,
}

impl TokenManager {
    pub fn new(http: Client, instance_url: &str, oauth: OAuthCredentials) -> Self {
        TokenManager {
            http,
            token_url: format!("{}/api/v1/users/token", instance_url),
            oauth,
            credential: Credential::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Swap the time source. Tests use this to step past expiries.
    pub fn with_clock(mut self, clock: impl Clock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Read-only view of the current credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Force the next `get_valid_token` call to go back to the server.
    pub fn invalidate_access(&mut self) {
        self.credential.expire_access();
    }

    /// Return a valid access token, refreshing or logging in when needed.
    ///
    /// A rejected refresh falls back to the password grant; the rejected
    /// refresh token is dropped first. Transport failures propagate as-is.
    pub fn get_valid_token(&mut self) -> Result<SecretString> {
        let now = self.clock.now();
        if self.credential.is_access_valid(now) {
            if let Some(token) = &self.credential.access_token {
                debug!("reusing cached access token");
                return Ok(SecretString::new(token.expose_secret().clone()));
            }
        }

        if self.credential.is_refresh_valid(now) {
            info!("access token expired, refreshing");
            match self.exchange(Grant::Refresh)? {
                Exchange::Granted(credential) => return Ok(self.install(credential)),
                Exchange::Rejected { status, body } => {
                    warn!("refresh rejected ({}): {}; falling back to login", status, body);
                    self.credential.discard_refresh();
                }
            }
        }

        info!("requesting new tokens for user '{}'", self.oauth.username);
        match self.exchange(Grant::Password)? {
            Exchange::Granted(credential) => Ok(self.install(credential)),
            Exchange::Rejected { status, body } => Err(Error::Auth { status, body }),
        }
    }

    fn install(&mut self, credential: Credential) -> SecretString {
        let token = credential
            .access_token
            .as_ref()
            .map(|t| t.expose_secret().clone())
            .unwrap_or_default();
        self.credential.replace(credential);
        SecretString::new(token)
    }

    fn exchange(&self, grant: Grant) -> Result<Exchange> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.expose_secret().as_str()),
            ("grant_type", grant.as_str()),
        ];
        match grant {
            Grant::Password => {
                form.push(("response_type", "code"));
                form.push(("username", self.oauth.username.as_str()));
                form.push(("password", self.oauth.password.expose_secret().as_str()));
            }
            Grant::Refresh => {
                let refresh = self
                    .credential
                    .refresh_token
                    .as_ref()
                    .map(|t| t.expose_secret().as_str())
                    .unwrap_or_default();
                form.push(("refresh_token", refresh));
            }
        }

        let res = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()?;
        let status = res.status().as_u16();
        let success = res.status().is_success();
        let body = res.text()?;
        // Expiries count from the moment the response arrived.
        let received_at = self.clock.now();
        debug!("{} grant answered {}", grant.as_str(), status);

        if !success {
            return Ok(Exchange::Rejected { status, body });
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(TokenResponse {
                access_token: Some(access),
                refresh_token,
                expires_in,
                refresh_token_expires_in,
            }) if !access.is_empty() => Ok(Exchange::Granted(Credential {
                access_token: Some(SecretString::new(access)),
                refresh_token: refresh_token.map(SecretString::new),
                access_expiry: received_at.saturating_add(expires_in),
                refresh_expiry: received_at.saturating_add(refresh_token_expires_in),
            })),
            _ => Ok(Exchange::Rejected { status, body }),
        }
    }
}
