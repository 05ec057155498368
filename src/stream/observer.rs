use log::{ debug, warn };

use crate::error::DecodeAnomaly;
use crate::models::chat::Conversation;

/// Recovered, non-fatal events raised while assembling an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A record could not be parsed and was skipped.
    RecordDropped {
        record: String,
        reason: String,
    },
    /// A well-formed record of a type this client ignores.
    UnknownRecordType {
        kind: String,
    },
    Decode(DecodeAnomaly),
}

/// Receives every published snapshot of the conversation plus diagnostics.
pub trait StreamObserver {
    fn on_update(&mut self, _conversation: &Conversation) {}

    fn on_diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

impl<T: StreamObserver + ?Sized> StreamObserver for &mut T {
    fn on_update(&mut self, conversation: &Conversation) {
        (**self).on_update(conversation)
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        (**self).on_diagnostic(diagnostic)
    }
}

/// Writes diagnostics to the `log` facade and ignores updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StreamObserver for LogObserver {
    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::RecordDropped { record, reason } => {
                warn!("Dropping unparseable stream record ({}): {}", reason, record);
            }
            Diagnostic::UnknownRecordType { kind } => {
                debug!("Ignoring stream record of unknown type '{}'", kind);
            }
            Diagnostic::Decode(anomaly) => {
                warn!("Answer stream decode anomaly: {}", anomaly);
            }
        }
    }
}

/// Tallies what happened during one or more answers.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticCounter {
    pub updates: usize,
    pub dropped_records: usize,
    pub unknown_records: usize,
    pub decode_anomalies: usize,
    pub events: Vec<Diagnostic>,
}

impl StreamObserver for DiagnosticCounter {
    fn on_update(&mut self, _conversation: &Conversation) {
        self.updates += 1;
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::RecordDropped { .. } => {
                self.dropped_records += 1;
            }
            Diagnostic::UnknownRecordType { .. } => {
                self.unknown_records += 1;
            }
            Diagnostic::Decode(_) => {
                self.decode_anomalies += 1;
            }
        }
        self.events.push(diagnostic.clone());
    }
}
