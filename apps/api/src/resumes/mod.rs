//! Resume intake: text extraction, parsing, ATS scoring, storage.

pub mod ats;
pub mod extract;
pub mod handlers;
pub mod parser;
pub mod store;
