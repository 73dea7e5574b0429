//! Unix implementation: `/dev/ptmx` allocation via rustix, async I/O through
//! tokio's `AsyncFd`, and a child started in its own session with the slave
//! as its controlling terminal.

mod child;
mod pty;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{UnixPtyMaster, open_slave};

use crate::config::PtyConfig;
use crate::error::Result;
use crate::traits::PtySystem;

/// Unix pty factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPtySystem;

impl PtySystem for UnixPtySystem {
    type Master = UnixPtyMaster;
    type Child = UnixPtyChild;

    async fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> Result<(Self::Master, Self::Child)>
    where
        S: AsRef<OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<OsStr>,
    {
        let (mut master, slave_path) = UnixPtyMaster::open()?;
        master.set_window_size(config.window_size)?;

        // Terminal modes must be in place before the child can write.
        master.set_echo(config.echo)?;

        let slave_fd = open_slave(&slave_path)?;
        let child = spawn_child(slave_fd, program.as_ref(), args, config)?;

        tracing::debug!(
            program = %program.as_ref().to_string_lossy(),
            pid = child.pid(),
            slave = %slave_path,
            echo = config.echo,
            "spawned child on pty"
        );

        Ok((master, child))
    }
}

/// The pty system for the current platform.
pub type NativePtySystem = UnixPtySystem;
