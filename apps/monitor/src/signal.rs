//! Interrupt handling.
//!
//! The first SIGINT/SIGTERM asks the run to stop after the current probe and
//! write its report. A second one exits immediately with status 130 and no
//! report.

use std::io;

use pingwatch::CancelHandle;
use tokio::signal::ctrl_c;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Exit status for an interrupted process (128 + SIGINT)
pub const FORCED_EXIT_CODE: i32 = 130;

pub fn install(cancel: CancelHandle) -> io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            let received = tokio::select! {
                result = ctrl_c() => result,
                _ = terminate.recv() => Ok(()),
            };
            #[cfg(not(unix))]
            let received = ctrl_c().await;

            if let Err(e) = received {
                error!("Failed to listen for interrupts: {e}");
                return;
            }

            if cancel.cancel() {
                warn!("Interrupt received, finishing up and writing the report (interrupt again to exit now)");
            } else {
                eprintln!("Second interrupt, exiting immediately without writing a report");
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    }))
}
