pub mod activity;
pub mod handlers;
pub mod stats;
