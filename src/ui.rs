// UI layer: runs a batch of uploads one file at a time and prints progress
// lines plus a final summary. A failure on one file is reported and the
// loop moves on to the next one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;

use crate::api::{ChannelId, UploadRequest, UploadResult};
use crate::course::CourseLibrary;
use crate::error::Result;
use crate::metadata::VideoMetadata;

/// Anything that can take an upload request. `PeerTubeClient` is the real
/// implementation; tests plug in a scripted one.
pub trait Uploader {
    fn upload(&mut self, req: &UploadRequest) -> Result<UploadResult>;

    /// Base URL used to print watch links for finished uploads.
    fn instance_url(&self) -> &str;
}

impl Uploader for crate::api::PeerTubeClient {
    fn upload(&mut self, req: &UploadRequest) -> Result<UploadResult> {
        crate::api::PeerTubeClient::upload(self, req)
    }

    fn instance_url(&self) -> &str {
        crate::api::PeerTubeClient::instance_url(self)
    }
}

/// Cooperative stop signal checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Knobs for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub channel_id: Option<ChannelId>,
    pub courses: Option<CourseLibrary>,
    /// Trip the cancel flag after the first failed file.
    pub fail_fast: bool,
}

/// Counts printed at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files never attempted because the run was cancelled.
    pub not_attempted: usize,
}

/// Upload every file in order. Returns once all files were attempted or
/// the cancel flag was raised.
pub fn run_batch<U: Uploader>(
    uploader: &mut U,
    files: &[PathBuf],
    opts: &BatchOptions,
    cancel: &CancelFlag,
) -> BatchSummary {
    let total = files.len();
    let mut summary = BatchSummary::default();

    for (idx, path) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.not_attempted = total - idx;
            println!("{}", format!("Stopping: {} file(s) left untouched.", summary.not_attempted).yellow());
            break;
        }
        let n = idx + 1;
        let meta = VideoMetadata::resolve(path, opts.courses.as_ref());
        println!("[{}/{}] Uploading '{}'...", n, total, meta.title);

        let req = UploadRequest {
            file_path: path.clone(),
            title: meta.title.clone(),
            description: meta.description,
            channel_id: opts.channel_id,
        };

        // indicatif's spinner keeps ticking while the blocking transfer runs.
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("sending {}", path.display()));
        spinner.enable_steady_tick(Duration::from_millis(120));
        let outcome = uploader.upload(&req);
        spinner.finish_and_clear();

        match outcome {
            Ok(result @ UploadResult::Uploaded(_)) => {
                summary.uploaded += 1;
                let link = result
                    .watch_url(uploader.instance_url())
                    .unwrap_or_else(|| "ok".to_string());
                println!("[{}/{}] {} {}", n, total, "Upload successful:".green(), link);
            }
            Ok(UploadResult::AlreadyPresent) => {
                summary.skipped += 1;
                println!("[{}/{}] {} '{}' already exists", n, total, "Skipped:".yellow(), meta.title);
            }
            Ok(UploadResult::Rejected { status, body }) => {
                summary.failed += 1;
                error!("upload of {} rejected: {} {}", path.display(), status, body);
                eprintln!("[{}/{}] {} HTTP {} {}", n, total, "Upload failed:".red(), status, body);
            }
            Err(e) => {
                summary.failed += 1;
                error!("upload of {} failed: {}", path.display(), e);
                eprintln!("[{}/{}] {} {}", n, total, "Upload failed:".red(), e);
            }
        }

        if opts.fail_fast && summary.failed > 0 {
            cancel.cancel();
        }
    }

    summary
}

/// Final line printed after a run.
pub fn print_summary(summary: &BatchSummary) {
    println!(
        "Upload process completed: {} uploaded, {} skipped, {} failed.",
        summary.uploaded, summary.skipped, summary.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ResponseBody};
    use std::collections::VecDeque;

    /// Replays canned outcomes and records the requests it saw.
    struct Scripted {
        outcomes: VecDeque<Result<UploadResult>>,
        seen: Vec<UploadRequest>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<UploadResult>>) -> Self {
            Scripted {
                outcomes: outcomes.into(),
                seen: Vec::new(),
            }
        }
    }

    impl Uploader for Scripted {
        fn upload(&mut self, req: &UploadRequest) -> Result<UploadResult> {
            self.seen.push(req.clone());
            self.outcomes.pop_front().unwrap_or(Ok(UploadResult::AlreadyPresent))
        }

        fn instance_url(&self) -> &str {
            "https://tube.example"
        }
    }

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/videos/{}", n))).collect()
    }

    #[test]
    fn failure_does_not_stop_the_batch() {
        let mut up = Scripted::new(vec![
            Err(Error::NotFound(PathBuf::from("/videos/a.mp4"))),
            Ok(UploadResult::Rejected {
                status: 422,
                body: ResponseBody::Text("bad".into()),
            }),
            Ok(UploadResult::Uploaded(serde_json::json!({"video": {"uuid": "x"}}))),
        ]);
        let summary = run_batch(
            &mut up,
            &files(&["a.mp4", "b.mp4", "c.mp4"]),
            &BatchOptions::default(),
            &CancelFlag::default(),
        );
        assert_eq!(
            summary,
            BatchSummary {
                uploaded: 1,
                skipped: 0,
                failed: 2,
                not_attempted: 0
            }
        );
        assert_eq!(up.seen.len(), 3);
    }

    #[test]
    fn requests_carry_title_and_channel() {
        let mut up = Scripted::new(vec![Ok(UploadResult::AlreadyPresent)]);
        let opts = BatchOptions {
            channel_id: Some(ChannelId(9)),
            ..Default::default()
        };
        let summary = run_batch(&mut up, &files(&["My Talk.mp4"]), &opts, &CancelFlag::default());
        assert_eq!(summary.skipped, 1);
        assert_eq!(up.seen[0].title, "My Talk");
        assert_eq!(up.seen[0].channel_id, Some(ChannelId(9)));
    }

    #[test]
    fn cancelled_flag_stops_before_next_file() {
        let mut up = Scripted::new(vec![]);
        let cancel = CancelFlag::default();
        cancel.cancel();
        let summary = run_batch(&mut up, &files(&["a.mp4", "b.mp4"]), &BatchOptions::default(), &cancel);
        assert!(up.seen.is_empty());
        assert_eq!(summary.not_attempted, 2);
    }

    #[test]
    fn fail_fast_cancels_after_first_failure() {
        let mut up = Scripted::new(vec![Err(Error::Resolution)]);
        let opts = BatchOptions {
            fail_fast: true,
            ..Default::default()
        };
        let cancel = CancelFlag::default();
        let summary = run_batch(&mut up, &files(&["a.mp4", "b.mp4", "c.mp4"]), &opts, &cancel);
        assert!(cancel.is_cancelled());
        assert_eq!(up.seen.len(), 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_attempted, 2);
    }
}
