//! Argument parsing and dispatch (spec.md §6 External interfaces: CLI).
//!
//! `ddm` with no arguments enters the interactive menu; `-v`/`-h` print
//! version/usage; `-d`/`--download` runs one download; `-t`/`--test` runs
//! the built-in self-test fixture. Positional `output_name`/`output_dir`
//! are only meaningful alongside `-d`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use ddm_core::{config, download, DownloadOptions, DownloadOutcome};

use crate::display::TerminalProgress;
use crate::{menu, selftest};

#[derive(Parser, Debug)]
#[command(
    name = "ddm",
    about = "Segmented HTTP/HTTPS download manager",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    pub version: bool,

    /// URL to download.
    #[arg(short = 'd', long = "download", value_name = "URL")]
    pub url: Option<String>,

    /// Output file name (defaults to a name derived from the response).
    pub output_name: Option<String>,

    /// Output directory (defaults to the current directory).
    pub output_dir: Option<String>,

    /// Use the multi-segment parallel engine, optionally with a thread
    /// count in [1, 16] (defaults to the configured thread count).
    #[arg(short = 'm', long = "multithread", value_name = "N", num_args = 0..=1, default_missing_value = "0")]
    pub multithread: Option<usize>,

    /// Run the built-in self-test fixture.
    #[arg(short = 't', long = "test")]
    pub test: bool,
}

/// Parses `argv`, dispatches, and returns the process exit code (spec.md
/// §6: 0 success, negative mirrors `DownloadError::exit_code`).
pub fn run_from_args() -> i32 {
    let cli = Cli::parse();

    if cli.version {
        println!("ddm {}", env!("CARGO_PKG_VERSION"));
        return 0;
    }

    let cfg = config::load_or_init();
    tracing::debug!(?cfg, "loaded config");

    if cli.test {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        return if selftest::run_self_test(&cwd, &cfg) { 0 } else { -8 };
    }

    match cli.url {
        Some(url) => run_download(&url, &cli.output_name, &cli.output_dir, cli.multithread, &cfg),
        None => menu::run_interactive(&cfg),
    }
}

fn run_download(
    url: &str,
    output_name: &Option<String>,
    output_dir: &Option<String>,
    multithread: Option<usize>,
    cfg: &ddm_core::DdmConfig,
) -> i32 {
    let dir = match output_dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let options = DownloadOptions {
        multithread: multithread.is_some(),
        threads: multithread.and_then(|n| if n == 0 { None } else { Some(n) }),
        observer: Some(Arc::new(TerminalProgress::new())),
        ..Default::default()
    };

    match download(url, output_name.as_deref(), &dir, cfg, options) {
        Ok(DownloadOutcome::Completed(report)) => {
            println!(
                "{} {} ({} bytes, {} segment(s))",
                "saved:".green().bold(),
                report.final_path.display(),
                report.bytes_written,
                report.segments_used
            );
            0
        }
        Ok(DownloadOutcome::Stopped) => {
            println!("{}", "download stopped".yellow());
            0
        }
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{} {} (exit {code})", "ddm error:".red().bold(), e);
            code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn no_args_requests_interactive_menu() {
        let cli = parse(&["ddm"]);
        assert!(cli.url.is_none());
        assert!(!cli.test);
        assert!(!cli.version);
    }

    #[test]
    fn version_flag_short_and_long() {
        assert!(parse(&["ddm", "-v"]).version);
        assert!(parse(&["ddm", "--version"]).version);
    }

    #[test]
    fn test_flag_short_and_long() {
        assert!(parse(&["ddm", "-t"]).test);
        assert!(parse(&["ddm", "--test"]).test);
    }

    #[test]
    fn download_with_positional_name_and_dir() {
        let cli = parse(&["ddm", "-d", "http://h/f", "out.bin", "/tmp"]);
        assert_eq!(cli.url.as_deref(), Some("http://h/f"));
        assert_eq!(cli.output_name.as_deref(), Some("out.bin"));
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp"));
    }

    #[test]
    fn multithread_without_count_defaults_to_config() {
        let cli = parse(&["ddm", "-d", "http://h/f", "-m"]);
        assert_eq!(cli.multithread, Some(0));
    }

    #[test]
    fn multithread_with_explicit_count() {
        let cli = parse(&["ddm", "-d", "http://h/f", "-m", "8"]);
        assert_eq!(cli.multithread, Some(8));
    }

    #[test]
    fn multithread_absent_when_flag_not_given() {
        let cli = parse(&["ddm", "-d", "http://h/f"]);
        assert_eq!(cli.multithread, None);
    }

    #[test]
    fn run_download_writes_file_and_returns_zero() {
        use std::io::{Read, Write as _};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut discard = [0u8; 4096];
            let _ = sock.read(&mut discard);
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello")
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let cfg = ddm_core::DdmConfig::default();
        let code = run_download(
            &format!("http://127.0.0.1:{port}/f"),
            &Some("out.bin".to_string()),
            &Some(dir.path().display().to_string()),
            None,
            &cfg,
        );
        assert_eq!(code, 0);
        assert_eq!(std::fs::read(dir.path().join("out.bin")).unwrap(), b"hello");
    }

    #[test]
    fn run_download_maps_error_to_negative_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ddm_core::DdmConfig::default();
        let code = run_download(
            "http://bad-.example/f",
            &Some("out.bin".to_string()),
            &Some(dir.path().display().to_string()),
            None,
            &cfg,
        );
        assert_eq!(code, -1);
    }
}
