//! pixport: run an export job against the local filesystem.
//!
//! Reads one job message (the JSON a producing node would send to the
//! browser), decodes its items, and delivers them the way the browser
//! extension would, with directories standing in for the download
//! folder and the folder picker.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin pixport -- [OPTIONS] <MESSAGE>
//! ```
//!
//! `<MESSAGE>` is a path to the JSON file, or `-` for stdin.  Flags are
//! OR-ed into the message's own `options`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod host;

use std::cell::RefCell;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use futures::executor::block_on;
use pixport_core::{
    DispatchConfig, DispatchReport, Dispatcher, ExportExtension, InboundMessage, JobStatus,
};
use tracing_subscriber::EnvFilter;

use crate::host::FsHost;

/// Deliver the images in a pixport job message to the local filesystem.
#[derive(Parser, Debug)]
#[command(name = "pixport", version)]
struct Cli {
    /// Path to the job message JSON, or `-` for stdin.
    message: PathBuf,

    /// Directory that receives downloads.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Save every item into this directory (enables folder save).
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Bundle every item into one ZIP.
    #[arg(long)]
    zip: bool,

    /// Name of the ZIP (`.zip` is appended when missing).
    #[arg(long)]
    zip_filename: Option<String>,

    /// Copy the first item to the clipboard (always unavailable here).
    #[arg(long)]
    clipboard: bool,

    /// Write the first item to the temp directory for viewing.
    #[arg(long)]
    preview: bool,

    /// Print a JSON summary of the decoded items to stdout.
    #[arg(long)]
    developer_emit: bool,

    /// Full dispatcher config as a JSON string.
    ///
    /// Omitted fields take their defaults.  The JSON must be a valid
    /// `DispatchConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`DispatchConfig`] from CLI arguments.
fn config_from_cli(cli: &Cli) -> Result<DispatchConfig, String> {
    cli.config_json.as_ref().map_or_else(
        || Ok(DispatchConfig::default()),
        |json| serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}")),
    )
}

/// OR the CLI destination flags into `message`'s options.
fn apply_flags(cli: &Cli, message: &mut InboundMessage) {
    let mut options = message.options();
    options.save_to_folder |= cli.folder.is_some();
    options.batch_zip |= cli.zip;
    options.clipboard |= cli.clipboard;
    options.open_in_new_tab |= cli.preview;
    options.developer_emit |= cli.developer_emit;
    if let Some(name) = &cli.zip_filename {
        options.zip_filename = Some(name.clone());
    }
    message.options = Some(options);
}

fn read_message(path: &Path) -> Result<InboundMessage, String> {
    let json = if path.as_os_str() == "-" {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .map_err(|e| format!("Error reading stdin: {e}"))?;
        json
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?
    };
    InboundMessage::from_json(&json).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

/// A job with nothing to do, or one where some destination delivered,
/// counts as success.
fn exit_code(report: &DispatchReport) -> ExitCode {
    let nothing_to_do =
        report.rejected.is_none() && report.skipped.is_empty() && report.destinations.is_empty();
    if nothing_to_do || report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_status(status: &JobStatus) {
    match status {
        JobStatus::Idle => {}
        JobStatus::Downloading { progress, text, .. } => {
            eprintln!("{:>3.0}% {text}", progress * 100.0);
        }
        other => eprintln!("{}", other.text()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let mut message = match read_message(&cli.message) {
        Ok(message) => message,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    apply_flags(&cli, &mut message);

    let host = FsHost::new(cli.out_dir.clone(), cli.folder.clone());
    let dispatcher = Rc::new(Dispatcher::new(host, config));
    dispatcher.status().subscribe(print_status);

    let report = Rc::new(RefCell::new(None));
    let mut extension = ExportExtension::new("pixport.export");
    let runner = Rc::clone(&dispatcher);
    let sink = Rc::clone(&report);
    extension.on_job_received(move |message| {
        *sink.borrow_mut() = Some(block_on(runner.handle_message(message)));
    });
    extension.receive(&message);

    let Some(report) = report.take() else {
        eprintln!("Job was not handled");
        return ExitCode::FAILURE;
    };
    for skipped in &report.skipped {
        eprintln!("Skipped {}: {}", skipped.label, skipped.error);
    }
    exit_code(&report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pixport").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_are_ored_into_message_options() {
        let cli = parse(&["--zip", "--folder", "out", "--zip-filename", "batch", "job.json"]);
        let mut message =
            InboundMessage::from_json(r#"{"files": [], "options": {"clipboard": true}}"#).unwrap();

        apply_flags(&cli, &mut message);

        let options = message.options();
        assert!(options.batch_zip);
        assert!(options.save_to_folder);
        assert!(options.clipboard);
        assert!(!options.open_in_new_tab);
        assert_eq!(options.zip_filename.as_deref(), Some("batch"));
    }

    #[test]
    fn ui_options_survive_flag_merge() {
        let cli = parse(&["--preview", "job.json"]);
        let mut message =
            InboundMessage::from_json(r#"{"ui": {"options": {"batch_zip": true}}}"#).unwrap();

        apply_flags(&cli, &mut message);

        let options = message.options();
        assert!(options.batch_zip);
        assert!(options.open_in_new_tab);
    }

    #[test]
    fn config_json_overrides_defaults() {
        let cli = parse(&["--config-json", r#"{"max_name_len": 32}"#, "job.json"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.max_name_len, 32);
        assert_eq!(config.default_zip_filename, "ComfyUI_Images.zip");
    }

    #[test]
    fn bad_config_json_is_an_error() {
        let cli = parse(&["--config-json", "{", "job.json"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn empty_job_exits_successfully() {
        assert_eq!(exit_code(&DispatchReport::default()), ExitCode::SUCCESS);
        let rejected = DispatchReport {
            rejected: Some("boom".into()),
            ..DispatchReport::default()
        };
        assert_eq!(exit_code(&rejected), ExitCode::FAILURE);
    }

    #[test]
    fn end_to_end_zip_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(
            &job,
            r#"{"files": [{"data_url": "data:image/png;base64,YQ==", "filename": "a.png"}]}"#,
        )
        .unwrap();
        let out = dir.path().join("out");
        let cli = parse(&[
            "--zip",
            "--out-dir",
            out.to_str().unwrap(),
            job.to_str().unwrap(),
        ]);

        let mut message = read_message(&cli.message).unwrap();
        apply_flags(&cli, &mut message);
        let dispatcher = Dispatcher::new(
            FsHost::new(cli.out_dir.clone(), None),
            config_from_cli(&cli).unwrap(),
        );
        let report = block_on(dispatcher.handle_message(&message));

        assert!(report.is_success());
        assert!(out.join("ComfyUI_Images.zip").exists());
        assert!(!out.join("a.png").exists());
    }
}
