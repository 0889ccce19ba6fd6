pub mod timeframes;

pub use timeframes::{clock_to_epoch, parse_clock_range, parse_utc_offset, TimeframeSet};
