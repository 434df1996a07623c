use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vivica::voice::console::{ConsoleInput, ConsoleOutput};
use vivica::{App, CompletionClient, SettingsStore, Timings};

/// Vivica - voice assistant session core
#[derive(Parser)]
#[command(name = "vivica", version, about)]
struct Cli {
    /// Settings file path (defaults to the platform config directory)
    #[arg(long, env = "VIVICA_SETTINGS")]
    settings: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one query and print the reply
    Ask {
        /// The query text
        text: String,
    },
    /// Print the effective settings and their source path
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,vivica=info",
        1 => "info,vivica=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = match &cli.settings {
        Some(path) => SettingsStore::at(path.clone()),
        None => SettingsStore::open_default()?,
    };
    let settings = store.load()?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { text } => ask(&settings, &text).await,
            Command::ShowConfig => show_config(&store),
        };
    }

    tracing::info!(
        model = %settings.model,
        credential = settings.has_credential(),
        "starting vivica"
    );

    let (app, handle) = App::new(
        settings,
        Some(store),
        CompletionClient::new(),
        Timings::default(),
        |events| Box::new(ConsoleInput::new(events)),
        |events| Box::new(ConsoleOutput::new(events)),
    );

    // Ctrl-C stops the event loop cleanly.
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    // Mirror the status line to the console.
    let mut status = handle.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let line = status.borrow_and_update().clone();
            if !line.is_empty() {
                println!("[{line}]");
            }
        }
    });

    // The console host has no settings form; acknowledge the surface and
    // close it again so the session resumes.
    let surface_handle = handle.clone();
    let mut surface = handle.settings_surface();
    tokio::spawn(async move {
        while surface.changed().await.is_ok() {
            let open = *surface.borrow_and_update();
            if open {
                println!("(settings requested - set VIVICA_API_KEY or edit the settings file)");
                surface_handle.toggle_settings();
            }
        }
    });

    println!("vivica ready - type a line to talk, Ctrl-C to quit");
    app.run().await;

    Ok(())
}

/// Send one query and print the reply
async fn ask(settings: &vivica::Settings, text: &str) -> anyhow::Result<()> {
    let client = CompletionClient::new();
    let reply = client.submit(text, settings).await?;
    println!("{reply}");
    Ok(())
}

/// Print the effective settings and their source path
fn show_config(store: &SettingsStore) -> anyhow::Result<()> {
    let settings = store.load()?;

    println!("settings file: {}", store.path().display());
    println!("model:         {}", settings.model);
    println!(
        "api key:       {}",
        if settings.has_credential() {
            "configured"
        } else {
            "missing"
        }
    );
    println!("system prompt: {}", settings.system_prompt);

    Ok(())
}
