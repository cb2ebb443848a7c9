#![cfg(not(tarpaulin_include))]

use dashkit::markdown;
use log::error;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("md2html")
}

/// Converts a markdown document into a standalone HTML page
///
/// Usage: `md2html <input.md> [output.html]`. Without an output path the
/// page is written next to the input with an `.html` extension.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <input.md> [output.html]", program_name(&args));
        return ExitCode::from(2);
    }

    let src = Path::new(&args[1]);
    let dst = match args.get(2) {
        Some(path) => PathBuf::from(path),
        None => src.with_extension("html"),
    };
    if src == dst {
        eprintln!("Error: output would overwrite the input");
        return ExitCode::from(2);
    }

    match markdown::export_file(src, &dst) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}: {}", src.display(), e);
            ExitCode::FAILURE
        }
    }
}
