//! Connects the current process's own stdin/stdout into the `AsyncRead`/
//! `AsyncWrite` halves a [`crate::agent::AgentSideConnection`] or
//! [`crate::client::ClientSideConnection`] expects, for binaries launched as
//! a subprocess by their peer (the common shape for an agent spawned by an
//! editor, or a client spawning an agent binary).

use tokio::io::{Stdin, Stdout};

/// Returns `(incoming, outgoing)`: this process's stdin as the read half,
/// stdout as the write half.
pub fn process_stdio() -> (Stdin, Stdout) {
    (tokio::io::stdin(), tokio::io::stdout())
}
