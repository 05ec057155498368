use bytes::Bytes;
use futures::{ Stream, StreamExt };
use log::{ debug, error, warn };

use super::decoder::Utf8StreamDecoder;
use super::framer::RecordFramer;
use super::observer::{ Diagnostic, StreamObserver };
use crate::error::TransportError;
use crate::models::chat::{ Conversation, Message, SourceRef };
use crate::models::stream::StreamRecord;

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Whether this answer already owns a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Unclaimed,
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Streaming {
        slot: Slot,
    },
    Finalized {
        outcome: Outcome,
    },
}

/// Builds one assistant answer out of interleaved metadata and chunk records.
///
/// Content only ever grows; the last metadata record wins for sources. Every
/// applied record republishes the answer as the conversation's last message.
#[derive(Debug)]
pub struct AnswerAssembler {
    state: AssemblerState,
    content: String,
    sources: Option<Vec<SourceRef>>,
    records_applied: usize,
}

impl Default for AnswerAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Idle,
            content: String::new(),
            sources: None,
            records_applied: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sources(&self) -> Option<&[SourceRef]> {
        self.sources.as_deref()
    }

    pub fn records_applied(&self) -> usize {
        self.records_applied
    }

    pub fn slot_claimed(&self) -> bool {
        matches!(self.state, AssemblerState::Streaming { slot: Slot::Claimed })
    }

    pub fn begin(&mut self) {
        if self.state == AssemblerState::Idle {
            self.state = AssemblerState::Streaming { slot: Slot::Unclaimed };
        }
    }

    pub fn snapshot(&self) -> Message {
        Message::assistant(self.content.clone(), self.sources.clone())
    }

    /// Parses and applies one framed record. Unparseable records are
    /// reported to the observer and skipped.
    pub fn apply_line<O: StreamObserver + ?Sized>(
        &mut self,
        line: &str,
        conversation: &mut Conversation,
        observer: &mut O
    ) {
        match StreamRecord::parse(line) {
            Ok(record) => self.apply(record, conversation, observer),
            Err(e) => {
                observer.on_diagnostic(
                    &(Diagnostic::RecordDropped {
                        record: line.to_string(),
                        reason: e.to_string(),
                    })
                );
            }
        }
    }

    pub fn apply<O: StreamObserver + ?Sized>(
        &mut self,
        record: StreamRecord,
        conversation: &mut Conversation,
        observer: &mut O
    ) {
        match self.state {
            AssemblerState::Idle => self.begin(),
            AssemblerState::Streaming { .. } => {}
            AssemblerState::Finalized { .. } => {
                warn!("Ignoring stream record received after the answer was finalized");
                return;
            }
        }

        match record {
            StreamRecord::Metadata { sources } => {
                self.sources = Some(sources);
            }
            StreamRecord::Chunk { content } => {
                self.content.push_str(&content);
            }
            StreamRecord::Unknown { kind } => {
                observer.on_diagnostic(&(Diagnostic::UnknownRecordType { kind }));
                return;
            }
        }
        self.records_applied += 1;
        self.publish(conversation, observer);
    }

    fn publish<O: StreamObserver + ?Sized>(
        &mut self,
        conversation: &mut Conversation,
        observer: &mut O
    ) {
        let message = self.snapshot();
        match self.state {
            AssemblerState::Streaming { slot: Slot::Unclaimed } => {
                conversation.push(message);
                self.state = AssemblerState::Streaming { slot: Slot::Claimed };
            }
            _ => conversation.replace_last(message),
        }
        observer.on_update(conversation);
    }

    /// Ends the answer normally. Returns the final message if one was
    /// published.
    pub fn finish(&mut self) -> Option<Message> {
        let claimed = self.slot_claimed();
        self.state = AssemblerState::Finalized { outcome: Outcome::Completed };
        if claimed {
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// Ends the answer on a transport fault. Anything already streamed stays
    /// in the conversation and the apology is appended after it.
    pub fn fail<O: StreamObserver + ?Sized>(
        &mut self,
        conversation: &mut Conversation,
        observer: &mut O
    ) {
        if matches!(self.state, AssemblerState::Finalized { .. }) {
            return;
        }
        conversation.push(Message::assistant(APOLOGY, None));
        self.state = AssemblerState::Finalized { outcome: Outcome::Failed };
        observer.on_update(conversation);
    }
}

/// Reads an answer body to exhaustion, decoding, framing and applying each
/// record as it arrives.
///
/// On a read error the apology is published and the error is returned; the
/// unterminated tail of the buffer is discarded in that case.
pub async fn drive<S, O>(
    mut body: S,
    conversation: &mut Conversation,
    observer: &mut O
) -> Result<Option<Message>, TransportError>
    where S: Stream<Item = Result<Bytes, TransportError>> + Unpin, O: StreamObserver + ?Sized
{
    let mut assembler = AnswerAssembler::new();
    let mut decoder = Utf8StreamDecoder::new();
    let mut framer = RecordFramer::new();
    assembler.begin();

    while let Some(read) = body.next().await {
        let buf = match read {
            Ok(buf) => buf,
            Err(e) => {
                error!("Answer stream failed after {} record(s): {}", assembler.records_applied(), e);
                assembler.fail(conversation, observer);
                return Err(e);
            }
        };

        let text = decoder.decode(&buf);
        for anomaly in decoder.drain_anomalies() {
            observer.on_diagnostic(&Diagnostic::Decode(anomaly));
        }
        for line in framer.push(&text) {
            assembler.apply_line(&line, conversation, observer);
        }
    }

    let text = decoder.finish();
    for anomaly in decoder.drain_anomalies() {
        observer.on_diagnostic(&Diagnostic::Decode(anomaly));
    }
    for line in framer.push(&text) {
        assembler.apply_line(&line, conversation, observer);
    }
    if let Some(line) = framer.finish() {
        assembler.apply_line(&line, conversation, observer);
    }

    debug!("Answer stream finished with {} record(s) applied", assembler.records_applied());
    Ok(assembler.finish())
}
