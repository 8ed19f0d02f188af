mod commands;
mod ctx;
mod progress;
mod settings;

use anyhow::bail;
use clap::{Parser, Subcommand};
use commands::CaptionArgs;
use ctx::default::Store;
use settings::Settings;
use std::{env, path::PathBuf};

/// Caption image datasets with a vision model, one `.txt` file per image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write logs to this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the images of a directory with their captions
    List { dir: PathBuf },
    /// Print the caption of one image
    Show { image: PathBuf },
    /// Replace the caption of one image
    Edit { image: PathBuf, text: String },
    /// Generate captions for the images of a directory
    Caption {
        dir: PathBuf,
        /// Only caption these file names
        #[arg(long, num_args = 1..)]
        only: Vec<String>,
        /// Text put before every generated caption
        #[arg(long)]
        prepend: Option<String>,
        /// Text put after every generated caption
        #[arg(long)]
        append: Option<String>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Read or change persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print one setting, or all of them
    Get { key: Option<String> },
    /// Set a setting, an empty value removes it
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.log_dir {
        Some(log_dir) => analytics_tracing::init_tracing_to_file(log_dir.clone()),
        None => analytics_tracing::init_tracing_to_stdout(),
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = local_data_root()?;
    let mut store = Store::open(data_dir.join("settings.json"))?;
    tracing::debug!("settings loaded from {}", data_dir.display());

    match cli.command {
        Command::List { dir } => commands::list(&dir).await,
        Command::Show { image } => commands::show(&image).await,
        Command::Edit { image, text } => {
            let caption = commands::edit(&image, &text).await?;
            println!("{}", caption);
            Ok(())
        }
        Command::Caption {
            dir,
            only,
            prepend,
            append,
            yes,
        } => {
            let settings = Settings::from_store(&store, env::var("OPENAI_API_KEY").ok());
            let args = CaptionArgs {
                dir: &dir,
                only: &only,
                prepend,
                append,
                yes,
            };
            commands::caption(&settings, args).await
        }
        Command::Config { command } => match command {
            ConfigCommand::Get { key } => commands::config_get(&store, key.as_deref()),
            ConfigCommand::Set { key, value } => commands::config_set(&mut store, &key, &value),
        },
    }
}

fn local_data_root() -> anyhow::Result<PathBuf> {
    if let Ok(path) = env::var("CAPTIONER_DATA_DIR") {
        return Ok(PathBuf::from(path));
    }
    match dirs::config_dir() {
        Some(dir) => Ok(dir.join("captioner")),
        None => bail!("'$CAPTIONER_DATA_DIR' is not set and no config directory was found"),
    }
}
