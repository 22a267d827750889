//! Diagnostic message channel.
//!
//! Script failures and other recoverable problems are reported here instead
//! of aborting the frame. [`DiagnosticBridge`] is the default sink: every
//! report is logged and queued on a `crossbeam-channel` so the host (editor
//! console, CLI, tests) can drain and display them later.

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;

/// Fire-and-forget message sink.
pub trait DiagnosticSink {
    fn report(&self, message: &str);
}

#[derive(Resource, Debug, Clone)]
pub struct DiagnosticBridge {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl Default for DiagnosticBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticBridge {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Sender that other threads or subsystems can report through.
    pub fn sender(&self) -> Sender<String> {
        self.tx.clone()
    }

    /// Takes every queued message without blocking.
    pub fn drain(&self) -> Vec<String> {
        self.rx.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl DiagnosticSink for DiagnosticBridge {
    fn report(&self, message: &str) {
        warn!("{}", message);
        // Receiver lives in self, so the send can't fail.
        let _ = self.tx.send(message.to_string());
    }
}
