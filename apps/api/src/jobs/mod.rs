//! Job postings and the Match Scoring Service.

pub mod handlers;
pub mod matching;
pub mod store;
