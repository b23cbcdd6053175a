use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use korra::cli::{Cli, Command};
use korra::config::{parse_duration, parse_header, parse_local_addr, ConfigError, SessionsConfig};
use korra::engine::EngineConfig;
use korra::fleet::{self, FleetError};
use korra::script::{SessionScript, Target};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Operator diagnostics go to stderr; stdout belongs to the aggregate
    // session log.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "korra=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sessions {
            dir,
            cert,
            headers,
            keepalive,
            laddr,
            log,
            pretend,
            redirects,
            status,
            timeout,
        } => {
            let mut header_map = reqwest::header::HeaderMap::new();
            for spec in &headers {
                let (name, value) = parse_header(spec)?;
                header_map.append(name, value);
            }
            let timeout = parse_duration(&timeout)
                .map_err(|e| ConfigError::parse("timeout", &timeout, e))?;
            let local_addr = laddr.as_deref().map(parse_local_addr).transpose()?;

            let engine = EngineConfig {
                timeout,
                redirects,
                local_addr,
                root_cert: cert,
                insecure: true,
                keepalive,
            };
            let config = SessionsConfig::new(dir)
                .with_log(log)
                .with_status_interval(status)
                .with_pretend(pretend)
                .with_headers(header_map)
                .with_engine(engine);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(fleet::run(config))?;
            Ok(())
        }
        Command::Validate { file, verbose } => {
            let failures = validate(&file, verbose)?;
            if failures > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Check one script file or every script in a directory, printing
/// per-action diagnostics. Returns the number of failing actions.
fn validate(path: &Path, verbose: bool) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let scripts: Vec<PathBuf> = if path.is_dir() {
        match fleet::discover_scripts(path) {
            Ok(scripts) => scripts,
            Err(FleetError::NoScripts(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        }
    } else {
        vec![path.to_path_buf()]
    };

    let mut total_failures = 0;
    for script_path in scripts {
        let (messages, failures) = check_script(&script_path, verbose);
        total_failures += failures;
        let status = if failures > 0 {
            format!("FAIL {}", failures)
        } else {
            "OK".to_string()
        };
        println!("===== FILE {} {}", script_path.display(), status);
        for message in messages {
            println!("{}", message);
        }
    }
    Ok(total_failures)
}

fn check_script(path: &Path, verbose: bool) -> (Vec<String>, usize) {
    let script = match SessionScript::check_file(path) {
        Ok(script) => script,
        Err(e) => return (vec![e.to_string()], 1),
    };

    let mut messages = Vec::new();
    let mut failures = 0;
    for action in script.actions() {
        if let Some(error) = &action.error {
            failures += 1;
            if verbose {
                messages.push(format!("{}: INVALID {}", action.line, error.reason));
            } else {
                messages.push(error.to_string());
            }
        } else if verbose {
            if let Some(target) = &action.target {
                messages.push(format!("{}: {}", action.line, describe(target)));
            }
        }
    }
    (messages, failures)
}

fn describe(target: &Target) -> String {
    match target {
        Target::Comment(text) => format!("INFO => {}", text),
        Target::Pause(millis) => format!("PAUSE for {} ms", millis),
        Target::Request(request) => {
            let polling = if request.poller.active {
                format!("YES, {}", request.poller)
            } else {
                "NO".to_string()
            };
            format!(
                "{} {} [Headers: {}] [Body? {}] [Polling? {}]",
                request.method,
                request.url,
                request.headers.len(),
                request.body_path.is_some(),
                polling
            )
        }
    }
}
