use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "freq")]
#[command(about = "Frequency agent CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file (default: FREQ_CONFIG_PATH or ~/.freq/config.json)
    Init {
        /// Config file path
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Poll the frequency for pending messages and answer them with the echo
    /// handler until interrupted.
    Poll {
        /// Config file path (default: FREQ_CONFIG_PATH or ~/.freq/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Poll interval in milliseconds (default from config or 2000)
        #[arg(long, value_name = "MS")]
        interval: Option<u64>,
    },

    /// Run the agent-to-agent HTTP server (health, /a2a ingestion, descriptor).
    Serve {
        /// Config file path (default: FREQ_CONFIG_PATH or ~/.freq/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Port (default from config or 8790)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send a message on the frequency (broadcast, or targeted with --target).
    Send {
        /// Config file path (default: FREQ_CONFIG_PATH or ~/.freq/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Target agent id (omit to broadcast)
        #[arg(long, value_name = "AGENT")]
        target: Option<String>,

        /// Message content
        content: String,
    },

    /// Talk to another agent and wait for its reply.
    Talk {
        /// Config file path (default: FREQ_CONFIG_PATH or ~/.freq/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Target agent id
        target: String,

        /// Message content
        content: String,

        /// Reply timeout in seconds, enforced by the platform (default 30)
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Fire and forget: do not wait for a reply
        #[arg(long)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("freq {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Poll { config, interval }) => {
            if let Err(e) = run_poll(config, interval).await {
                log::error!("poll failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            target,
            content,
        }) => {
            if let Err(e) = run_send(config, target, content).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Talk {
            config,
            target,
            content,
            timeout,
            no_wait,
        }) => {
            if let Err(e) = run_talk(config, target, content, timeout, no_wait).await {
                log::error!("talk failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    lib::config::write_default_config(&path)?;
    println!("initialized configuration at {}", path.display());
    Ok(())
}

fn load_identity(config_path: Option<PathBuf>) -> anyhow::Result<(lib::config::Config, lib::config::Identity)> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let identity = lib::config::Identity::from_config(&config)?;
    Ok((config, identity))
}

async fn run_poll(config_path: Option<PathBuf>, interval_ms: Option<u64>) -> anyhow::Result<()> {
    let (config, identity) = load_identity(config_path)?;
    let interval = Duration::from_millis(interval_ms.unwrap_or(config.poll.interval_ms));
    let agent = lib::agent::Agent::new(identity);
    agent.clone().run(interval).await;
    tokio::signal::ctrl_c().await?;
    log::info!("interrupt received, stopping poll loop");
    agent.stop();
    agent.join().await;
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, identity) = load_identity(config_path)?;
    let port = port.unwrap_or(config.server.port);
    let handlers = lib::handler::HandlerSlot::new();
    lib::server::serve(&config.server.bind, port, identity, handlers).await
}

async fn run_send(
    config_path: Option<PathBuf>,
    target: Option<String>,
    content: String,
) -> anyhow::Result<()> {
    let (_config, identity) = load_identity(config_path)?;
    let client = lib::client::FrequencyClient::new(identity);
    if client.send_message(&content, target.as_deref()).await {
        println!("sent");
        Ok(())
    } else {
        anyhow::bail!("message was not accepted by the platform")
    }
}

async fn run_talk(
    config_path: Option<PathBuf>,
    target: String,
    content: String,
    timeout: u64,
    no_wait: bool,
) -> anyhow::Result<()> {
    let (_config, identity) = load_identity(config_path)?;
    let client = lib::client::FrequencyClient::new(identity);
    match client.talk_to_agent(&target, &content, !no_wait, timeout).await {
        Some(reply) => println!("{}", reply),
        None => println!("(no reply)"),
    }
    Ok(())
}
