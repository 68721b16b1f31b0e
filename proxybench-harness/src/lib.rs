pub mod prompts;
pub mod report;
pub mod runner;
pub mod sample_log;
pub mod stats;
