use dotenvy::dotenv;
use std::{path::PathBuf, sync::Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

fn init_env_layer() -> tracing_subscriber::EnvFilter {
    match dotenv() {
        Ok(path) => eprintln!(".env read successfully from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Could not load .env file: {e}"),
    };

    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Log to stderr, keeping stdout free for command output.
pub fn init_tracing_to_stdout() {
    let env_layer = init_env_layer();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_layer)
        .with(stdout_layer)
        .try_init()
    {
        eprintln!("Failed to init tracing: {}", e);
    }
}

pub fn init_tracing_to_file(log_dir: PathBuf) {
    let env_layer = init_env_layer();

    let file_log_layer = {
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create log dir: {}", e);
            init_tracing_to_stdout(); // fallback to stdout tracing
            return;
        }
        let file = match std::fs::File::create(log_dir.join("captioner.log")) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Failed to create log file: {}", e);
                init_tracing_to_stdout(); // fallback to stdout tracing
                return;
            }
        };
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(env_layer)
        .with(file_log_layer)
        .try_init()
    {
        eprintln!("Failed to init tracing: {}", e);
    }
}
