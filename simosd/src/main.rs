//! # SimOS Host Daemon
//!
//! Main entry point for the simulated OS host.

use cli_console::StdoutTerminal;
use log::LevelFilter;
use services_settings::persistence;
use simosd::{HostRuntime, HostRuntimeConfig};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

/// Options that only matter to the binary
struct Options {
    runtime: HostRuntimeConfig,
    log_level: LevelFilter,
    verbose: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("simosd");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    services_logger::init(options.log_level, options.verbose);

    let mut runtime = HostRuntime::new(options.runtime, StdoutTerminal::new()).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    if let Err(e) = runtime.run() {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        runtime: HostRuntimeConfig::default(),
        log_level: LevelFilter::Info,
        verbose: false,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).ok_or("Missing value for --config")?;
                let overrides = persistence::load_from_path(Path::new(path))
                    .map_err(|e| format!("Failed to load config {}: {}", path, e))?;
                overrides.apply_to(&mut options.runtime.settings);
            }
            "--script" | "-s" => {
                i += 1;
                let path = args.get(i).ok_or("Missing value for --script")?;
                let script_text = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read script file: {}", e))?;
                options.runtime.script = Some(script_text);
            }
            "--max-steps" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --max-steps")?;
                options.runtime.max_steps = value
                    .parse()
                    .map_err(|_| format!("Invalid max-steps value: {}", value))?;
            }
            "--log-level" => {
                i += 1;
                let value = args.get(i).ok_or("Missing value for --log-level")?;
                options.log_level = services_logger::parse_level_filter(value)
                    .ok_or_else(|| format!("Invalid log level: {}", value))?;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--help" | "-h" => {
                print_usage(args.first().map(String::as_str).unwrap_or("simosd"));
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      Settings overrides (JSON)");
    eprintln!("  -s, --script <FILE>      Key script to run instead of reading stdin");
    eprintln!("  --max-steps <N>          Maximum steps to run (0 = unlimited)");
    eprintln!("  --log-level <LEVEL>      off, error, warn, info (default), debug, trace");
    eprintln!("  -v, --verbose            Echo log records to stderr");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --script demos/jobs.keys", program);
    eprintln!("  {} --config settings.json --log-level debug -v", program);
}
