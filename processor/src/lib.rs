pub mod chance;
pub mod config;
pub mod processor;
pub mod server;
pub mod transaction;

pub use config::ProcessorConfig;
pub use processor::Processor;
