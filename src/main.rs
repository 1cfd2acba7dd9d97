// Entrypoint for the CLI application.
// - Keeps `main` small: load configuration, find the videos, hand them to
//   the batch runner in `ui`.
// - Exit code 1 is reserved for configuration problems; individual upload
//   failures are reported per file and do not change the exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::info;

use peertube_uploader::api::{ChannelId, PeerTubeClient};
use peertube_uploader::config::Config;
use peertube_uploader::course::CourseLibrary;
use peertube_uploader::finder::find_mp4_files;
use peertube_uploader::ui::{print_summary, run_batch, BatchOptions, CancelFlag};

/// Upload all .mp4 files in a folder (and subfolders) to PeerTube.
#[derive(Parser)]
#[command(name = "peertube-upload", version, about)]
struct Cli {
    /// Path to the folder to scan for .mp4 files
    path: PathBuf,

    /// Upload into this channel instead of the account's first one
    #[arg(long)]
    channel_id: Option<u64>,

    /// Skip videos whose title already exists in the channel
    #[arg(long)]
    skip_existing: bool,

    /// Stop after the first failed upload
    #[arg(long)]
    fail_fast: bool,
}

fn main() -> ExitCode {
    // A missing .env file is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let courses = config.courses_path.clone().map(CourseLibrary::new);
    if let Some(lib) = &courses {
        info!("resolving chapter titles from {}", lib.root().display());
    }

    let files = find_mp4_files(&cli.path)
        .with_context(|| format!("failed to scan '{}'", cli.path.display()))?;
    let total = files.len();
    if total == 0 {
        println!("No .mp4 files found in '{}'.", cli.path.display());
        return Ok(());
    }
    println!("Found {} .mp4 file(s) in '{}'. Starting upload...", total, cli.path.display());

    let mut client = PeerTubeClient::new(config)
        .context("failed to build HTTP client")?
        .skip_existing(cli.skip_existing);

    let opts = BatchOptions {
        channel_id: cli.channel_id.map(ChannelId),
        courses,
        fail_fast: cli.fail_fast,
    };
    let summary = run_batch(&mut client, &files, &opts, &CancelFlag::default());
    print_summary(&summary);
    Ok(())
}
