pub mod applicability;
pub mod artifact;
pub mod error;
pub mod host;
pub mod installer;
pub mod orchestrator;
pub mod render;
pub mod report;
pub mod service;
