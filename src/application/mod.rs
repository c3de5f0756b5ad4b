pub mod batcher;
pub mod log_writer;
pub mod scheduler;
pub mod snapshot;
pub mod transmitter;
