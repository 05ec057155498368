pub mod assembler;
pub mod decoder;
pub mod framer;
pub mod observer;

pub use assembler::{ drive, AnswerAssembler, AssemblerState, APOLOGY };
pub use observer::{ Diagnostic, DiagnosticCounter, LogObserver, StreamObserver };
