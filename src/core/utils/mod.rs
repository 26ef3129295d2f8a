pub mod utils;

pub use utils::{cputime, format_duration, realtime};
