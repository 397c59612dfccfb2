pub mod clock;
pub mod logging;
pub mod memory;
pub mod shutdown;
pub mod time;

pub use clock::{Clock, SystemClock};
pub use logging::init_logging;
pub use memory::resident_memory_mb;
pub use shutdown::{spawn_signal_listener, ShutdownSignal};
pub use time::*;
