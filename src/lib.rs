pub mod converter;
pub mod dataset;
pub mod downloader;
pub mod label_map;
pub mod parser;

use clap::Parser;
use converter::{convert, ConvertError, ConvertOptions, ConvertSummary};
use downloader::Downloader;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Convert a Labelbox bounding-box NDJSON export into a YOLO dataset.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Labelbox project whose labels are exported
    pub project_id: String,

    /// NDJSON export, one data row per line
    pub lbbox_annotation_json_path: PathBuf,

    /// JSON object mapping class name to class id
    pub label_map_path: PathBuf,

    /// Output root, receives images/ and labels/
    pub dataset_dir: PathBuf,

    /// Drop objects whose class is missing from the label map instead of failing
    #[arg(long)]
    pub skip_unknown_label: bool,

    /// Number of image downloads kept in flight
    #[arg(
        long,
        env = "LBBOX2YOLO_CONCURRENCY",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,

    /// HTTP timeout per image, in seconds (no limit when omitted)
    #[arg(long, env = "LBBOX2YOLO_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl From<Args> for ConvertOptions {
    fn from(args: Args) -> Self {
        let mut options = ConvertOptions::new(
            args.project_id,
            args.lbbox_annotation_json_path,
            args.label_map_path,
            args.dataset_dir,
        );
        options.skip_unknown_label = args.skip_unknown_label;
        options.concurrency = usize::from(args.concurrency);
        options.timeout = args.timeout.map(Duration::from_secs);
        options
    }
}

async fn convert_with_downloader(
    options: &ConvertOptions,
) -> Result<ConvertSummary, ConvertError> {
    let downloader = Downloader::new(options.concurrency, options.timeout)?;
    convert(options, &downloader).await
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = ConvertOptions::from(Args::parse());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(convert_with_downloader(&options)) {
        Ok(summary) => {
            info!(
                "Converted {} records into {} ({} objects)",
                summary.records,
                options.dataset_dir.display(),
                summary.lines_written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            sentry::capture_error(&e);
            ExitCode::FAILURE
        }
    }
}
