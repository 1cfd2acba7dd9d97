// Credential store: the OAuth token pair and its expiry timestamps.
// Pure state, no I/O. The current time is always passed in.

use std::time::{SystemTime, UNIX_EPOCH};

use secrecy::{ExposeSecret, SecretString};

/// Source of "now" as unix seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall clock used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Access/refresh token pair. Expiries are absolute unix seconds; 0 means
/// the token was never obtained.
#[derive(Debug, Default)]
pub struct Credential {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub access_expiry: u64,
    pub refresh_expiry: u64,
}

impl Credential {
    pub fn is_access_valid(&self, now: u64) -> bool {
        is_live(self.access_token.as_ref(), self.access_expiry, now)
    }

    pub fn is_refresh_valid(&self, now: u64) -> bool {
        is_live(self.refresh_token.as_ref(), self.refresh_expiry, now)
    }

    /// Overwrite every field at once. Credentials are never merged.
    pub fn replace(&mut self, new: Credential) {
        *self = new;
    }

    /// Forget the refresh token so a rejected one is not presented again.
    pub fn discard_refresh(&mut self) {
        self.refresh_token = None;
        self.refresh_expiry = 0;
    }

    /// Mark the access token as expired, e.g. after the provider refused it.
    pub fn expire_access(&mut self) {
        self.access_expiry = 0;
    }
}

fn is_live(token: Option<&SecretString>, expiry: u64, now: u64) -> bool {
    token.is_some_and(|t| !t.expose_secret().is_empty()) && now < expiry
}
