//! Process level plumbing: backgrounding and termination signals.

use std::sync::OnceLock;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{fork, setsid, ForkResult};

use crate::monitor::Shutdown;
use crate::{Error, Result};

const TERMINATION_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

static SHUTDOWN: OnceLock<Shutdown> = OnceLock::new();

extern "C" fn handle_signal(signal: nix::libc::c_int) {
    if let Some(shutdown) = SHUTDOWN.get() {
        shutdown.request(signal);
    }
}

/// Routes SIGINT, SIGTERM and SIGHUP to `shutdown` instead of killing the process, so the loop
/// can return and the device gets torn down. Only the first token installed is ever signalled.
pub fn install_signal_handlers(shutdown: &Shutdown) -> Result<()> {
    // an already installed token stays in place
    let _ = SHUTDOWN.set(shutdown.clone());

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in TERMINATION_SIGNALS {
        // SAFETY: the handler only performs an atomic store
        unsafe { sigaction(signal, &action) }.map_err(Error::Signal)?;
    }
    Ok(())
}

/// Detaches from the controlling terminal by forking twice with a new session in between. The
/// intermediate processes exit with status 0; only the grandchild returns. Must be called while
/// the process is still single threaded, i.e. before libusb is initialized.
pub fn daemonize() -> Result<()> {
    fork_and_exit_parent()?;
    setsid().map_err(Error::Daemonize)?;
    fork_and_exit_parent()?;
    umask(Mode::from_bits_truncate(0o022));
    Ok(())
}

fn fork_and_exit_parent() -> Result<()> {
    // SAFETY: no other threads exist yet
    match unsafe { fork() }.map_err(Error::Daemonize)? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => Ok(()),
    }
}
