// Library root
// -----------
// This crate exposes the library surface used by the `peertube-upload`
// binary (`main.rs`).
//
// Module responsibilities:
// - `config`: Loads settings from the environment.
// - `credentials` / `token`: OAuth credential store and the token
//   lifecycle (reuse, refresh, password login).
// - `api`: PeerTube HTTP calls: channel lookup, duplicate check, upload.
// - `finder`, `metadata`, `course`: Pick video files and derive titles,
//   optionally from course markdown documents.
// - `ui`: Runs a batch of uploads and prints progress.
pub mod api;
pub mod config;
pub mod course;
pub mod credentials;
pub mod error;
pub mod finder;
pub mod metadata;
pub mod token;
pub mod ui;

pub use api::{ChannelId, PeerTubeClient, UploadRequest, UploadResult};
pub use config::Config;
pub use error::{Error, ResponseBody, Result};
pub use token::TokenManager;
