//! Session settings for a shell.

use std::path::PathBuf;

use crate::{ReadMode, Unframe, DEFAULT_BUFFER_SIZE, error::*};

/// Where the node daemon exposes its control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/opt/cellframe-node/var/run/node_cli";
pub const DEFAULT_PROMPT: &str = "> ";
/// Input that ends the session.
pub const DEFAULT_EXIT_COMMAND: &str = "exit";

/// Everything a [`Shell`](crate::Shell) needs to know about its session. The default value
/// reproduces the stock client: fixed socket path, `> ` prompt, one 4096 byte read per reply,
/// first four lines dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub socket_path: PathBuf,
    pub prompt: String,
    /// Upper bound of a single receive from the socket.
    pub buffer_size: usize,
    pub unframe: Unframe,
    pub read: ReadMode,
    pub exit_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            prompt: DEFAULT_PROMPT.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            unframe: Unframe::default(),
            read: ReadMode::default(),
            exit_command: DEFAULT_EXIT_COMMAND.to_string(),
        }
    }
}

impl Config {
    /// Default settings pointed at another socket.
    pub fn with_socket(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ShellError::Config(
                "buffer size must be greater than zero".into(),
            ));
        }
        if self.exit_command.is_empty() {
            return Err(ShellError::Config("exit command must not be empty".into()));
        }
        Ok(())
    }
}
