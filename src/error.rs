use std::{io, path::PathBuf, string::FromUtf8Error};
use thiserror::Error;

/// Errors that can occur while talking to the node daemon.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The control socket could not be reached: the path is missing, is not a socket, or nobody
    /// is listening on it.
    #[error("failed to connect to {}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the request envelope to the socket failed, usually because the daemon closed the
    /// connection.
    #[error("failed to send request")]
    Write {
        #[source]
        source: io::Error,
    },

    /// Reading the reply from the socket failed.
    #[error("failed to receive response")]
    Read {
        #[source]
        source: io::Error,
    },

    /// The reply was not valid UTF-8.
    #[error("response is not valid UTF-8")]
    Decode(#[from] FromUtf8Error),

    /// Reading commands from the user or writing output to the terminal failed.
    #[error("terminal I/O error")]
    Input(#[from] io::Error),

    /// An option value was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;
