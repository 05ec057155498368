pub mod chat;
pub mod pdf;
pub mod stream;
