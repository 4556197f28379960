//! `nodesh`: talk to a running node daemon over its control socket.
//!
//! Run without arguments for an interactive `> ` prompt; type `exit` to leave.
//! Use `-c <command>` (repeatable) to run commands and exit.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use nodesh::{
    Config, ReadMode, Shell, Unframe, DEFAULT_BUFFER_SIZE, DEFAULT_EXIT_COMMAND, DEFAULT_PROMPT,
    DEFAULT_SKIP_LINES, DEFAULT_SOCKET_PATH,
};
use tokio::io::{stdin, stdout, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = "Interactive node control socket client")]
struct Cli {
    /// Path of the daemon's control socket.
    #[arg(short, long, env = "NODESH_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Largest number of bytes read from the socket at once.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Number of leading reply lines treated as headers.
    #[arg(long, default_value_t = DEFAULT_SKIP_LINES, conflicts_with = "split_headers")]
    skip: usize,

    /// Split headers from body at the first blank line instead of skipping a fixed count.
    #[arg(long)]
    split_headers: bool,

    /// Keep reading until the advertised Content-Length has arrived.
    #[arg(long)]
    read_full: bool,

    /// Command to run instead of prompting. May be given more than once.
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    commands: Vec<String>,

    /// Do not print the connection banner.
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            socket_path: self.socket.clone(),
            prompt: DEFAULT_PROMPT.to_string(),
            buffer_size: self.buffer_size,
            unframe: if self.split_headers {
                Unframe::HeaderSplit
            } else {
                Unframe::FixedOffset(self.skip)
            },
            read: if self.read_full {
                ReadMode::Full
            } else {
                ReadMode::Single
            },
            exit_command: DEFAULT_EXIT_COMMAND.to_string(),
        }
    }
}

fn setup_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("nodesh=debug")
        } else {
            EnvFilter::new("nodesh=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config();
    if !cli.quiet {
        println!("Connecting to server, {}", config.socket_path.display());
    }
    let mut shell = Shell::connect(config).await?;
    let mut output = stdout();
    if cli.commands.is_empty() {
        shell
            .run(BufReader::new(stdin()), &mut output)
            .await
            .context("session aborted")?;
    } else {
        shell
            .run_commands(&cli.commands, &mut output)
            .await
            .context("session aborted")?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
