//! Diagnostics channel for non-fatal failures.
//!
//! Dropped payloads, normalized configuration values, and runtime fallbacks
//! are reported here instead of interrupting rendering. The surrounding
//! system decides how to present them.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;

/// Which part of the taxonomy a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Malformed documents, invalid enum values, duplicate prefixes.
    Config,
    /// Malformed inbound messages, bad vectors, unknown clear ids.
    Payload,
    /// Surface resize races, persisted cache failures.
    Runtime,
}

/// A single diagnostic record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Bounded, never-blocking diagnostics queue.
///
/// When full, the oldest record is discarded to make room.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    tx: Sender<Diagnostic>,
    rx: Receiver<Diagnostic>,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Log and enqueue a diagnostic.
    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("[DIAG] {:?}: {}", kind, message);

        let mut record = Diagnostic {
            kind,
            message,
            at: Utc::now(),
        };
        loop {
            match self.tx.try_send(record) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.rx.try_recv();
                    record = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<Diagnostic> {
        self.rx.try_iter().collect()
    }

    /// Receiving end for the surrounding system.
    pub fn receiver(&self) -> Receiver<Diagnostic> {
        self.rx.clone()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_drain() {
        let diagnostics = Diagnostics::new(8);
        diagnostics.report(DiagnosticKind::Payload, "bad message");
        diagnostics.report(DiagnosticKind::Config, "bad anchor");

        let drained = diagnostics.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, DiagnosticKind::Payload);
        assert_eq!(drained[1].message, "bad anchor");
        assert!(diagnostics.drain().is_empty());
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let diagnostics = Diagnostics::new(2);
        diagnostics.report(DiagnosticKind::Runtime, "one");
        diagnostics.report(DiagnosticKind::Runtime, "two");
        diagnostics.report(DiagnosticKind::Runtime, "three");

        let messages: Vec<String> = diagnostics.drain().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["two".to_string(), "three".to_string()]);
    }
}
