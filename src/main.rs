//! HTTP Call Mock - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use http_call_mock::{
    register_stub, wait_until_ready, CallParser, DirectorySource, InMemoryMockServer,
    MockSettings, Placeholders,
};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "http-call-mock",
    about = "Validate HTTP call definitions and show the stub rules built from them",
    version
)]
struct Args {
    /// Call definitions to load (paths relative to the calls directory, or globs)
    #[arg(required = true)]
    sources: Vec<String>,

    /// Path to settings file
    #[arg(short, long, default_value = "mock-calls.yaml")]
    config: PathBuf,

    /// Calls directory (overrides the settings file)
    #[arg(short = 'd', long)]
    calls_dir: Option<PathBuf>,

    /// Placeholder value, NAME=VALUE (VALUE is read as JSON when it parses)
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,

    /// Print the stub rules registered for every call as YAML
    #[arg(long)]
    print_stubs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn is_glob(source: &str) -> bool {
    source.contains(['*', '?', '[', '{'])
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load settings
    let mut settings = if args.config.exists() {
        info!(path = ?args.config, "Loading settings");
        MockSettings::from_file(&args.config)?
    } else {
        MockSettings::default()
    };
    if let Some(dir) = args.calls_dir {
        settings.calls_dir = dir;
    }

    let mut placeholders: Placeholders = settings.placeholders.clone();
    placeholders.extend(args.params);

    let source = DirectorySource::new(&settings.calls_dir);
    let mut source_ids = Vec::new();
    for pattern in &args.sources {
        if is_glob(pattern) {
            let matched = source.resolve_glob(pattern)?;
            if matched.is_empty() {
                anyhow::bail!("No call definitions match {:?} in {:?}", pattern, source.root());
            }
            source_ids.extend(matched);
        } else {
            source_ids.push(pattern.clone());
        }
    }

    let parser = CallParser::new(source);
    let server = InMemoryMockServer::new(settings.server.clone());
    if args.print_stubs {
        wait_until_ready(&server, settings.startup.policy()).await?;
    }

    let mut failures = 0usize;
    for source_id in &source_ids {
        let outcome = match parser.parse(source_id, &placeholders) {
            Ok(call) if args.print_stubs => register_stub(&server, source_id, &call).await,
            Ok(call) => {
                println!(
                    "{}: {} {} -> {}",
                    source_id,
                    call.request_method,
                    call.request_path,
                    call.response_status
                );
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            error!(source_id = %source_id, error = %e, "Invalid call definition");
            failures += 1;
        }
    }

    if args.print_stubs {
        print!("{}", serde_yaml::to_string(&server.stubs().await)?);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} call definitions failed", failures, source_ids.len());
    }
    Ok(())
}
