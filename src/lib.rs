pub mod cli;
pub mod client;
pub mod export;
pub mod job;
pub mod model;
pub mod render;
pub mod submission;
