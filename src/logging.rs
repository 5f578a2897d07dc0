//! Log-level plumbing.
//!
//! The CLI carries the historical 0..=5 noise dial; it maps onto tracing
//! level filters. 0 keeps errors only, 1 is the operator default, 3 and up
//! turn on per-worker chatter.

use tracing_subscriber::filter::LevelFilter;

pub fn init(loglevel: u8) {
    tracing_subscriber::fmt()
        .with_max_level(filter_for(loglevel))
        .with_target(false)
        .init();
}

pub fn filter_for(loglevel: u8) -> LevelFilter {
    match loglevel {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping_saturates() {
        assert_eq!(filter_for(0), LevelFilter::ERROR);
        assert_eq!(filter_for(1), LevelFilter::INFO);
        assert_eq!(filter_for(5), LevelFilter::TRACE);
        assert_eq!(filter_for(250), LevelFilter::TRACE);
    }
}
