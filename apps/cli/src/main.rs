use anyhow::{Context, Result};
use camrelay_core::{AppConfig, Command};
use camrelay_obs::ObsController;
use camrelay_session::{run_receiver_session, run_relay_session, send_command, SessionEvent};
use camrelay_transport::make_ws_listener;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Recording name used until the operator sends SetName
const DEFAULT_RECORDING_NAME: &str = "Recording";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Also write daily-rolling log files into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server in front of a local OBS instance
    Serve {
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
        /// Override the relay bind address from the config (host:port)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Send one command to a running relay (e.g. `send Start`)
    Send {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8765)]
        port: u16,
        /// Command words, joined verbatim (SetName <name> | Start | Stop |
        /// SendFilePrevious <host> <port> | Kill)
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Receive recording files shipped by a relay
    Receive {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 5123)]
        port: u16,
        #[arg(short, long, default_value = "./received")]
        output: PathBuf,
    },
    /// One-shot local recording, for smoke-testing an OBS setup
    Record {
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
        #[arg(short, long, default_value = DEFAULT_RECORDING_NAME)]
        name: String,
        /// Seconds to record before stopping
        #[arg(short, long, default_value_t = 5)]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Serve { config, bind } => run_serve(&config, bind).await,
        Commands::Send { host, port, command } => run_send(&host, port, &command).await,
        Commands::Receive { host, port, output } => run_receive(&host, port, output).await,
        Commands::Record { config, name, duration } => run_record(&config, &name, duration).await,
    }
}

fn init_tracing(log_dir: Option<&Path>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "camrelay=info,camrelay_session=info,camrelay_obs=info,camrelay_transport=info".into());

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "camrelay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Ok(None)
        }
    }
}

async fn run_serve(config_path: &Path, bind: Option<String>) -> Result<()> {
    let config = AppConfig::load(config_path)?;

    let mut controller = ObsController::connect(&config.obs_connection)
        .await
        .context("OBS not reachable; check the connection and try again")?;
    controller.set_buffer_folder(&config.paths.buffer_folder).await?;
    controller
        .set_save_location(&config.paths.save_folder, DEFAULT_RECORDING_NAME)
        .await?;

    let bind_addr = bind.unwrap_or_else(|| config.relay_addr());
    let listener = make_ws_listener(bind_addr.as_str()).await?;
    let controller = Arc::new(Mutex::new(controller));

    let (tx, mut rx) = mpsc::channel(100);
    tokio::spawn(async move {
        if let Err(e) = run_relay_session(listener, controller, tx.clone()).await {
            let _ = tx.send(SessionEvent::Error(e.to_string())).await;
        }
    });

    drain_events(&mut rx).await;
    Ok(())
}

async fn run_send(host: &str, port: u16, words: &[String]) -> Result<()> {
    let line = words.join(" ");
    let command =
        Command::parse(&line).map_err(|e| anyhow::anyhow!("Invalid command {:?}: {}", line, e))?;

    let (tx, mut rx) = mpsc::channel(16);
    send_command(host, port, &command, &tx).await?;
    drop(tx);

    drain_events(&mut rx).await;
    Ok(())
}

async fn run_receive(host: &str, port: u16, output: PathBuf) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind receiver to {}:{}", host, port))?;

    let (tx, mut rx) = mpsc::channel(100);
    tokio::spawn(async move {
        if let Err(e) = run_receiver_session(listener, output, tx.clone()).await {
            let _ = tx.send(SessionEvent::Error(e.to_string())).await;
        }
    });

    drain_events(&mut rx).await;
    Ok(())
}

async fn run_record(config_path: &Path, name: &str, duration: u64) -> Result<()> {
    let config = AppConfig::load(config_path)?;

    let mut controller = ObsController::connect(&config.obs_connection)
        .await
        .context("OBS not reachable; check the connection and try again")?;
    controller.set_buffer_folder(&config.paths.buffer_folder).await?;
    let session = controller
        .set_save_location(&config.paths.save_folder, name)
        .await?;

    controller.start_recording().await?;
    info!("Recording for {} second(s)...", duration);
    tokio::time::sleep(Duration::from_secs(duration)).await;
    controller.stop_recording().await?;

    info!("Take saved under {}", session.display());
    controller.disconnect().await?;
    Ok(())
}

async fn drain_events(rx: &mut mpsc::Receiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            // Log events already went through the tracing subscriber
            SessionEvent::Log { .. } => {}
            SessionEvent::Listening(addr) => info!("Listening on {}", addr),
            SessionEvent::Connected(addr) => info!("Connected: {}", addr),
            SessionEvent::Dispatched(command) => debug!("Dispatched: {}", command),
            SessionEvent::FileReceived(path) => info!("Received {}", path),
            SessionEvent::Disconnected => info!("Disconnected"),
            SessionEvent::ShuttingDown => info!("Shutting down"),
            SessionEvent::Error(message) => error!("{}", message),
        }
    }
}
