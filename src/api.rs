// API client module: a small blocking HTTP client that talks to a PeerTube
// instance. Every authenticated call goes through the token manager, so the
// bearer token attached to a request is always one that has not expired.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result, ResponseBody};
use crate::token::{OAuthCredentials, TokenManager};

/// Privacy level sent with every upload (1 = public).
pub const UPLOAD_PRIVACY: u8 = 1;
pub const VIDEO_MIME: &str = "video/mp4";

/// Numeric id of a video channel owned by the authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One video to send. When `channel_id` is `None` the account's first
/// channel is used.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub channel_id: Option<ChannelId>,
}

/// What the provider said about an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    /// 200/201 with the parsed response body.
    Uploaded(Value),
    /// A video with the same title already exists in the channel.
    AlreadyPresent,
    /// Any other status, with the body kept verbatim for diagnostics.
    Rejected { status: u16, body: ResponseBody },
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, UploadResult::Rejected { .. })
    }

    /// UUID of the created video, when the provider returned one.
    pub fn video_uuid(&self) -> Option<&str> {
        match self {
            UploadResult::Uploaded(body) => body.pointer("/video/uuid").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Public watch page of the created video on `instance_url`.
    pub fn watch_url(&self, instance_url: &str) -> Option<String> {
        self.video_uuid()
            .map(|uuid| format!("{}/videos/watch/{}", instance_url, uuid))
    }
}

#[derive(Deserialize)]
struct UserProfile {
    #[serde(rename = "videoChannels", default)]
    video_channels: Option<Vec<ChannelEntry>>,
}

#[derive(Deserialize)]
struct ChannelEntry {
    id: Option<ChannelId>,
}

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    data: Vec<VideoEntry>,
}

#[derive(Deserialize)]
struct VideoEntry {
    #[serde(default)]
    name: String,
}

/// PeerTube client holding the HTTP client, both base URLs and the token
/// manager that owns the OAuth credential.
pub struct PeerTubeClient {
    http: Client,
    instance_url: String,
    upload_url: String,
    upload_timeout: std::time::Duration,
    skip_existing: bool,
    tokens: TokenManager,
}

impl PeerTubeClient {
    /// Build a client from the loaded configuration. The configuration is
    /// consumed: the secrets move into the token manager.
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;
        if !config.verify_ssl {
            warn!("TLS certificate verification is disabled");
        }
        let oauth = OAuthCredentials {
            client_id: config.client_id,
            client_secret: config.client_secret,
            username: config.username,
            password: config.password,
        };
        let tokens = TokenManager::new(http.clone(), &config.instance_url, oauth);
        Ok(PeerTubeClient {
            http,
            instance_url: config.instance_url,
            upload_url: config.upload_url,
            upload_timeout: config.upload_timeout,
            skip_existing: false,
            tokens,
        })
    }

    /// Enable the duplicate check: a video whose title matches
    /// case-insensitively in the target channel is not uploaded again.
    pub fn skip_existing(mut self, enabled: bool) -> Self {
        self.skip_existing = enabled;
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Fetch the id of the account's first video channel.
    pub fn resolve_channel_id(&mut self) -> Result<ChannelId> {
        let token = self.tokens.get_valid_token()?;
        let url = format!("{}/api/v1/users/me", self.instance_url);
        let res = self
            .http
            .get(&url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json")
            .send()?;
        let res = ensure_success(res, "users/me")?;
        let status = res.status().as_u16();
        let raw = res.text()?;
        let profile: UserProfile = serde_json::from_str(&raw).map_err(|_| Error::Application {
            endpoint: "users/me",
            status,
            body: ResponseBody::parse(&raw),
        })?;
        // A missing, null or empty channel list all mean "no channel".
        let channel = profile
            .video_channels
            .as_deref()
            .and_then(|list| list.first())
            .and_then(|c| c.id)
            .ok_or(Error::Resolution)?;
        debug!("resolved channel id {}", channel);
        Ok(channel)
    }

    /// Look for a video in `channel` whose name matches `title`
    /// case-insensitively. A failing search is logged and counts as "no".
    pub fn video_exists(&mut self, title: &str, channel: ChannelId) -> Result<bool> {
        let token = self.tokens.get_valid_token()?;
        let url = format!("{}/api/v1/videos", self.instance_url);
        let channel_param = channel.to_string();
        let res = self
            .http
            .get(&url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json")
            .query(&[("search", title), ("channelId", channel_param.as_str())])
            .send()?;
        if !res.status().is_success() {
            warn!("existence check for '{}' returned {}", title, res.status());
            return Ok(false);
        }
        let list: VideoList = match res.json() {
            Ok(list) => list,
            Err(e) => {
                warn!("existence check for '{}' returned an unreadable body: {}", title, e);
                return Ok(false);
            }
        };
        let wanted = title.to_lowercase();
        Ok(list.data.iter().any(|v| v.name.to_lowercase() == wanted))
    }

    /// Upload one video file.
    ///
    /// The file is checked before any network activity. A 401 answer means
    /// the bearer token went stale between validation and use; the access
    /// token is then invalidated and the transfer retried once.
    pub fn upload(&mut self, req: &UploadRequest) -> Result<UploadResult> {
        if !req.file_path.is_file() {
            return Err(Error::NotFound(req.file_path.clone()));
        }

        self.tokens.get_valid_token()?;
        let channel = match req.channel_id {
            Some(id) => id,
            None => self.resolve_channel_id()?,
        };

        if self.skip_existing && self.video_exists(&req.title, channel)? {
            info!("'{}' already exists in channel {}", req.title, channel);
            return Ok(UploadResult::AlreadyPresent);
        }

        let res = self.send_video(req, channel)?;
        let res = if res.status() == StatusCode::UNAUTHORIZED {
            warn!("upload of '{}' was refused with 401, retrying with a new token", req.title);
            self.tokens.invalidate_access();
            self.send_video(req, channel)?
        } else {
            res
        };

        let status = res.status();
        let raw = res.text()?;
        info!("upload of '{}' answered {}", req.title, status);
        let body = ResponseBody::parse(&raw);
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let value = match body {
                ResponseBody::Json(v) => v,
                ResponseBody::Text(t) => Value::String(t),
            };
            Ok(UploadResult::Uploaded(value))
        } else {
            Ok(UploadResult::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// One multipart POST to the upload host. The file handle lives inside
    /// the form and is closed when the request finishes or fails.
    fn send_video(&mut self, req: &UploadRequest, channel: ChannelId) -> Result<Response> {
        let token = self.tokens.get_valid_token()?;
        let url = format!("{}/api/v1/videos/upload", self.upload_url);

        let file = File::open(&req.file_path)?;
        let len = file.metadata()?.len();
        let part = multipart::Part::reader_with_length(file, len)
            .file_name(file_name(&req.file_path))
            .mime_str(VIDEO_MIME)?;
        let form = multipart::Form::new()
            .text("name", req.title.clone())
            .text("description", req.description.clone())
            .text("privacy", UPLOAD_PRIVACY.to_string())
            .text("channelId", channel.to_string())
            .part("videofile", part);

        debug!("sending {} ({} bytes) to {}", req.file_path.display(), len, url);
        let res = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()?;
        Ok(res)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("video.mp4")
        .to_string()
}

fn ensure_success(res: Response, endpoint: &'static str) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let raw = res.text().unwrap_or_default();
    Err(Error::Application {
        endpoint,
        status,
        body: ResponseBody::parse(&raw),
    })
}
