//! Process-wide run state.
//!
//! Two flags:
//! - `PREVIEWING`: Is a preview loop running that can shut down gracefully?
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender};

/// A preview loop owns the watch process and must stop it before exiting
static PREVIEWING: AtomicBool = AtomicBool::new(false);

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the preview loop
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a preview loop is registered:
/// - Before `register_preview()`: exit immediately, nothing to clean up
/// - After `register_preview()`: notify the loop, which stops the compiler
/// - Second Ctrl+C during a graceful shutdown: exit immediately
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let repeated = SHUTDOWN.swap(true, Ordering::SeqCst);

        if !PREVIEWING.load(Ordering::SeqCst) || repeated {
            std::process::exit(130);
        }

        crate::log!("preview"; "shutting down...");
        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.send(());
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register a preview loop for graceful shutdown
///
/// Returns the receiver the loop polls for the shutdown signal. Only the
/// first registration takes effect.
pub fn register_preview() -> Receiver<()> {
    let (tx, rx) = crossbeam::channel::bounded(1);
    if SHUTDOWN_TX.set(tx).is_err() {
        crate::debug!("preview"; "shutdown channel already registered");
    }
    PREVIEWING.store(true, Ordering::SeqCst);
    rx
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_preview() {
        let _rx = register_preview();
        assert!(PREVIEWING.load(Ordering::SeqCst));
        assert!(!is_shutdown());
    }
}
