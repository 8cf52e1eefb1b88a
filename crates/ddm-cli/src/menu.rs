//! Interactive prompt entered when `ddm` is invoked with no arguments
//! (spec.md §6: "no args: prints a banner and enters interactive prompt").
//! A thin collaborator over [`ddm_core::download`] — the menu only collects
//! input and renders output, exactly what spec.md §1 carves out of the core.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use ddm_core::{download, DdmConfig, DownloadOptions, DownloadOutcome};

use crate::display::TerminalProgress;

const BANNER: &str = r#"
 ____  ____  __  __
|  _ \|  _ \|  \/  |
| | | | | | | |\/| |
| |_| | |_| | |  | |
|____/|____/|_|  |_|  segmented HTTP/HTTPS downloader
"#;

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Runs the interactive menu loop until the user chooses to quit. Returns
/// the exit code of the last download attempted (0 if none was).
pub fn run_interactive(cfg: &DdmConfig) -> i32 {
    println!("{}", BANNER.cyan());
    let mut last_exit_code = 0;

    loop {
        println!();
        println!("1) Download a file");
        println!("2) Run self-test");
        println!("3) Quit");
        let choice = match prompt("Choose an option: ") {
            Ok(c) => c,
            Err(_) => break,
        };

        match choice.as_str() {
            "1" => last_exit_code = run_download_prompt(cfg),
            "2" => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                let ok = crate::selftest::run_self_test(&cwd, cfg);
                last_exit_code = if ok { 0 } else { -8 };
            }
            "3" | "q" | "quit" | "exit" => break,
            other => println!("{}", format!("unrecognized option: {other}").yellow()),
        }
    }

    last_exit_code
}

fn run_download_prompt(cfg: &DdmConfig) -> i32 {
    let url = match prompt("URL: ") {
        Ok(u) if !u.is_empty() => u,
        _ => {
            println!("{}", "no URL entered".yellow());
            return 0;
        }
    };
    let output_name = prompt("Output name (blank to derive from the URL): ").unwrap_or_default();
    let output_dir = prompt("Output directory (blank for current directory): ").unwrap_or_default();
    let multithread = prompt("Use multi-segment download? [y/N]: ")
        .map(|s| s.eq_ignore_ascii_case("y"))
        .unwrap_or(false);

    let dir = if output_dir.is_empty() {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        PathBuf::from(output_dir)
    };
    let name = if output_name.is_empty() {
        None
    } else {
        Some(output_name.as_str())
    };

    let options = DownloadOptions {
        multithread,
        observer: Some(Arc::new(TerminalProgress::new())),
        ..Default::default()
    };

    match download(&url, name, &dir, cfg, options) {
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
            println!("{} {} (exit {code})", "error:".red().bold(), e);
            code
        }
    }
}
