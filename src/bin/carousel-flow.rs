//! Lay out one slide from a JSON request and print the result as JSON.
//!
//! Usage:
//!   cargo run --features cli -- [OPTIONS] [REQUEST_JSON]
//!
//! Reads the request from stdin when no path is given.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use carousel_flow::{LayoutConfig, LayoutEngine, LayoutRequest};

fn print_usage() {
    eprintln!("Usage: carousel-flow [OPTIONS] [REQUEST_JSON]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <FILE>   Layout tunables as JSON (missing keys use defaults)");
    eprintln!("  --pretty          Pretty-print the result");
    eprintln!("  --check           Exit with status 2 when the result is truncated");
    eprintln!("  --help, -h        Show this message");
}

struct Options {
    request: Option<PathBuf>,
    config: Option<PathBuf>,
    pretty: bool,
    check: bool,
}

fn parse_args() -> Result<Option<Options>, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut opts = Options {
        request: None,
        config: None,
        pretty: false,
        check: false,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.get(i).ok_or("--config expects a file")?;
                opts.config = Some(PathBuf::from(path));
            }
            "--pretty" => opts.pretty = true,
            "--check" => opts.check = true,
            "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => return Err(format!("Unknown option: {}", other)),
            other => {
                if opts.request.is_some() {
                    return Err("only one request file may be given".to_string());
                }
                opts.request = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }
    Ok(Some(opts))
}

fn read_input(path: Option<&PathBuf>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(buf)
        }
    }
}

fn run(opts: &Options) -> Result<bool, String> {
    let cfg = match &opts.config {
        Some(path) => {
            let raw = read_input(Some(path))?;
            serde_json::from_str::<LayoutConfig>(&raw)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        }
        None => LayoutConfig::default(),
    };
    let raw = read_input(opts.request.as_ref())?;
    let request: LayoutRequest =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid request: {}", e))?;

    let result = LayoutEngine::new(cfg)
        .layout(&request)
        .map_err(|e| e.to_string())?;
    let json = if opts.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(result.truncated)
}

fn main() -> ExitCode {
    let opts = match parse_args() {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    match run(&opts) {
        Ok(true) if opts.check => {
            eprintln!("text truncated");
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{}", msg);
            ExitCode::FAILURE
        }
    }
}
