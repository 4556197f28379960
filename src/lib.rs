//! Interactive client for a node daemon's Unix control socket.
//!
//! Each command typed by the user is wrapped in a small pseudo-HTTP `POST /connect` envelope,
//! written to the daemon's control socket, and the reply body is printed line by line.
//!
//! To run a session:
//! 1. Build a `Config` (the default points at the stock socket path)
//! 2. Call `Shell::connect(config)`
//! 3. Call `shell.run(input, output)` with a buffered reader and a writer
//!
//! Uses `tokio` for socket and terminal I/O. The loop is strictly sequential: one request is in
//! flight at a time and nothing runs concurrently with it.

mod config;
mod envelope;
mod error;
mod shell;
mod transport;

pub use config::*;
pub use envelope::{Request, Response, Unframe, DEFAULT_SKIP_LINES};
pub use error::*;
pub use shell::*;
pub use transport::*;
