pub mod activity;
pub mod job;
pub mod resume;
