pub mod clock;
pub mod compaction;
pub mod errors;
pub mod event;
pub mod log_record;
pub mod ports;
