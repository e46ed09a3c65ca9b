//! Command-line front end for the churn scoring gateway.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use churn_scorer::config::{self, ServeConfig};
use churn_scorer::gateway::{Gateway, GatewayResponse, Method};
use churn_scorer::logging;
use churn_scorer::server::ModelServer;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every handled request succeeded.
fn run() -> Result<bool, String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = match &options.config_path {
        Some(path) => {
            let mut config = config::load_from_path(path).map_err(|err| err.to_string())?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => config::load_or_default().unwrap_or_else(|err| {
            eprintln!("Using default config: {err}");
            ServeConfig::default()
        }),
    };
    if let Some(model) = &options.model_path {
        config.model_path = model.clone();
    }
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let gateway = Gateway::new(Arc::new(ModelServer::new(config.model_path.clone())));
    let responses = match options.command {
        Command::Info => vec![gateway.handle(Method::Get, "/", b"")],
        Command::Health => vec![gateway.handle(Method::Get, "/health", b"")],
        Command::Predict { input, lines } => {
            let payload = read_input(input.as_ref())?;
            if lines {
                predict_lines(&gateway, &payload)
            } else {
                vec![gateway.handle(Method::Post, "/predict", payload.as_bytes())]
            }
        }
    };

    let mut all_ok = true;
    for response in &responses {
        all_ok &= response.status == 200;
        let line = serde_json::to_string(response).map_err(|err| err.to_string())?;
        println!("{line}");
    }
    Ok(all_ok)
}

/// Score each non-empty line concurrently, keeping output in input order.
fn predict_lines(gateway: &Gateway, payload: &str) -> Vec<GatewayResponse> {
    let requests: Vec<&str> = payload.lines().filter(|line| !line.trim().is_empty()).collect();
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, requests.len().max(1));
    let chunk_size = requests.len().div_ceil(workers).max(1);
    std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|line| gateway.handle(Method::Post, "/predict", line.as_bytes()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(responses) => responses,
                Err(_) => vec![GatewayResponse {
                    status: 500,
                    body: serde_json::json!({ "detail": "worker panicked" }),
                }],
            })
            .collect()
    })
}

fn read_input(input: Option<&PathBuf>) -> Result<String, String> {
    match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            Ok(buffer)
        }
    }
}

#[derive(Debug)]
enum Command {
    Info,
    Health,
    Predict { input: Option<PathBuf>, lines: bool },
}

#[derive(Debug)]
struct CliOptions {
    config_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut model_path = None;
    let mut command_name: Option<String> = None;
    let mut input = None;
    let mut lines = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--lines" => {
                lines = true;
            }
            name @ ("predict" | "health" | "info") if command_name.is_none() => {
                command_name = Some(name.to_string());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let command = match command_name.as_deref() {
        Some("predict") => Command::Predict { input, lines },
        Some("health") => Command::Health,
        Some("info") => Command::Info,
        _ => return Err(help_text()),
    };
    Ok(CliOptions {
        config_path,
        model_path,
        command,
    })
}

fn help_text() -> String {
    [
        "churn-scorer",
        "",
        "Scores customer churn requests against the configured model artifact.",
        "",
        "Usage:",
        "  churn-scorer [options] predict [--input <file>|-] [--lines]",
        "  churn-scorer [options] health",
        "  churn-scorer [options] info",
        "",
        "Options:",
        "  --config <file>   Config file (default: <config dir>/.churn_scorer/config.toml).",
        "  --model <file>    Model artifact path, overriding config and CHURN_MODEL_PATH.",
        "  --input <file>    Request JSON to score (default: stdin).",
        "  --lines           Treat the input as JSON lines, one request per line.",
        "",
        "Each response is printed as {\"status\": <code>, \"body\": <json>}.",
        "Exit code is 2 when any request did not return status 200.",
    ]
    .join("\n")
}
