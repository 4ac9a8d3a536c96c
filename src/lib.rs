pub mod batch;
pub mod config;
pub mod predict;
pub mod report;
