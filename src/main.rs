use anyhow::Result;
use std::env;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use sp_console::config::CoreConfig;
use sp_console::core_command::{CoreCollaborators, CoreCommand};
use sp_console::credits::TomlCreditsFile;
use sp_console::docs::ExternalDocBuilder;
use sp_console::host::{tokenize, QueuedConsole, SystemClock};
use sp_console::logging::{init_tracing, LogSink, StdoutSink, TracingSink};
use sp_console::plugins::{DirectoryLoader, FactoryLoader};

/// Parse command line arguments for --config <path>
fn parse_config_path() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}

/// Console output goes to stdout unless --trace-output routes it through tracing
fn output_sink() -> Arc<dyn LogSink> {
    if env::args().any(|arg| arg == "--trace-output") {
        Arc::new(TracingSink)
    } else {
        Arc::new(StdoutSink)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = init_tracing("info") {
        eprintln!("{:#}", e);
    }

    let config = match parse_config_path() {
        Some(path) => {
            info!("Loading config from {:?}", path);
            CoreConfig::load(&path)?
        }
        None => CoreConfig::default(),
    };

    let console = QueuedConsole::new();
    let collaborators = CoreCollaborators {
        sink: output_sink(),
        clock: Arc::new(SystemClock::new()),
        console: Box::new(console.clone()),
        plugin_loader: Box::new(DirectoryLoader::new(
            config.paths.plugins_dir.clone(),
            FactoryLoader::new(),
        )),
        auth_loader: Box::new(DirectoryLoader::new(
            config.paths.auth_dir.clone(),
            FactoryLoader::new(),
        )),
        credits: Box::new(TomlCreditsFile::new(config.paths.credits_file.clone())),
        docs: Box::new(ExternalDocBuilder::from_config(&config)),
    };

    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let mut core = CoreCommand::new(config, collaborators);
    info!("Console ready, type \"{}\" for a list of commands", core.name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if run_host_line(&mut core, &line).is_break() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Failed to read console line: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => {
                core.tick();
                let stop = console
                    .drain()
                    .iter()
                    .any(|queued| run_host_line(&mut core, queued).is_break());
                if stop {
                    break;
                }
            }
        }
    }

    core.shutdown();
    info!("Console stopped");
    Ok(())
}

/// Execute one host console line: the core command, `echo` or `quit`.
fn run_host_line(core: &mut CoreCommand, line: &str) -> ControlFlow<()> {
    if core.execute_line(line).is_some() {
        return ControlFlow::Continue(());
    }

    let tokens = tokenize(line);
    match tokens.first().map(String::as_str) {
        None => {}
        Some("quit") | Some("exit") => return ControlFlow::Break(()),
        Some("echo") => println!("{}", tokens[1..].join(" ")),
        Some(other) => warn!("Unknown command: {}", other),
    }
    ControlFlow::Continue(())
}
