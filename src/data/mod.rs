pub mod batch_writer;
pub mod bi5_decoder;
pub mod gap_planner;
pub mod tick_buffer;
pub mod time_filter;

pub use batch_writer::BatchWriter;
pub use bi5_decoder::{decode, PriceScale};
pub use gap_planner::GapPlanner;
pub use tick_buffer::TickBatchBuffer;
pub use time_filter::filter_to_window;
