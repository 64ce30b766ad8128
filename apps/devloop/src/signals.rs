//! Routes termination signals into the orchestrator's queue.
//!
//! SIGINT and SIGTERM behave identically: both enqueue `Event::Shutdown`.

use crate::error::Result;
use crate::orchestrator::Event;
use std::sync::mpsc::Sender;

#[cfg(unix)]
pub fn forward_signals(tx: Sender<Event>) -> Result<()> {
    use crate::error::Error;
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::debug;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| Error::Signal(format!("failed to register signal listeners: {}", e)))?;
    std::thread::Builder::new()
        .name("devloop-signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                debug!(signal, "termination signal received");
                if tx.send(Event::Shutdown).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| Error::Signal(format!("failed to start signal listener thread: {}", e)))?;
    Ok(())
}

#[cfg(not(unix))]
pub fn forward_signals(_tx: Sender<Event>) -> Result<()> {
    tracing::warn!("signal forwarding is not supported on this platform; Ctrl-C exits directly");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_sigterm_becomes_shutdown() {
        let (tx, rx) = mpsc::channel();
        forward_signals(tx).unwrap();
        signal_hook::low_level::raise(signal_hook::consts::signal::SIGTERM).unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Event::Shutdown
        );
    }
}
