//! The read-eval-print loop driving one session with the daemon.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::{Client, Config, Exchange, Request, Response, error::*};

/// Lifecycle of a shell. There is no way back from `Terminated`; a new shell needs a new
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    Terminated,
}

/// An interactive session over a single connection.
pub struct Shell<E: Exchange = Client> {
    /// The connection to the daemon.
    exchange: E,
    config: Config,
    state: State,
}

impl Shell<Client> {
    /// Validates the configuration and connects to its socket path.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let client =
            Client::connect_unix(&config.socket_path, config.buffer_size, config.read).await?;
        Ok(Self::new(client, config))
    }
}

impl<E: Exchange> Shell<E> {
    /// Creates a shell over an established exchange.
    pub fn new(exchange: E, config: Config) -> Self {
        Self {
            exchange,
            config,
            state: State::Connected,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends one command and returns the unframed reply.
    pub async fn execute(&mut self, command: &str) -> Result<Response> {
        let reply = self.exchange.exchange(&Request::new(command)).await?;
        Response::decode(&reply, self.config.unframe)
    }

    /// Prompts for commands on `input` and prints replies to `output` until the exit command
    /// or end of input. Any error terminates the session.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.repl(input, output).await;
        self.state = State::Terminated;
        result
    }

    /// Runs a fixed list of commands without prompting. The exit command stops early.
    pub async fn run_commands<I, W>(&mut self, commands: I, output: &mut W) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        W: AsyncWrite + Unpin,
    {
        let mut result = Ok(());
        for command in commands {
            if self.state == State::Terminated {
                break;
            }
            result = self.step(command.as_ref(), output).await;
            if result.is_err() {
                break;
            }
        }
        self.state = State::Terminated;
        result
    }

    async fn repl<R, W>(&mut self, mut input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        while self.state == State::Connected {
            output.write_all(self.config.prompt.as_bytes()).await?;
            output.flush().await?;

            line.clear();
            if input.read_line(&mut line).await? == 0 {
                debug!("end of input");
                break;
            }
            let command = line.strip_suffix('\n').unwrap_or(&line);
            let command = command.strip_suffix('\r').unwrap_or(command);
            self.step(command, output).await?;
        }
        Ok(())
    }

    /// Handles one line of input: either the exit command or a round trip to the daemon.
    async fn step<W>(&mut self, command: &str, output: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if command == self.config.exit_command {
            debug!("exit command received");
            self.state = State::Terminated;
            return Ok(());
        }
        let response = self.execute(command).await?;
        for line in response.lines() {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;
        Ok(())
    }
}
