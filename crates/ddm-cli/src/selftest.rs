//! Built-in self-test fixture (`-t`/`--test`), spec.md §6: "runs the
//! built-in URL list". A thin collaborator over [`ddm_core::download`] —
//! no core behavior lives here, just a fixed set of URLs exercised in
//! sequence and a pass/fail summary.

use std::path::Path;

use colored::Colorize;
use ddm_core::{download, DdmConfig, DownloadOptions};

/// Fixed URLs exercised by `-t`/`--test`, mirroring the original program's
/// hardcoded self-test list: one small plain HTTP resource, one HTTPS
/// resource, and one large resource expected to take the multi-segment
/// path.
const SELF_TEST_URLS: &[&str] = &[
    "http://ftp.debian.org/debian/README",
    "https://deb.debian.org/debian/dists/stable/Release",
    "http://ftp.debian.org/debian/ls-lR.gz",
];

/// Runs every URL in [`SELF_TEST_URLS`] against `output_dir`, printing a
/// pass/fail line per URL and a final summary. Returns `true` when every
/// attempt succeeded.
pub fn run_self_test(output_dir: &Path, cfg: &DdmConfig) -> bool {
    println!("{}", "Running built-in self-test fixture:".bold());
    let mut failures = 0usize;

    for url in SELF_TEST_URLS {
        print!("  {url} ... ");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        let options = DownloadOptions {
            multithread: true,
            ..Default::default()
        };
        match download(url, None, output_dir, cfg, options) {
            Ok(_) => println!("{}", "ok".green()),
            Err(e) => {
                println!("{} ({e})", "FAILED".red());
                failures += 1;
            }
        }
    }

    if failures == 0 {
        println!("{}", "self-test: all downloads succeeded".green().bold());
        true
    } else {
        println!(
            "{}",
            format!("self-test: {failures} of {} downloads failed", SELF_TEST_URLS.len())
                .red()
                .bold()
        );
        false
    }
}
