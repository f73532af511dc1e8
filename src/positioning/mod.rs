pub mod aggregator;
pub mod tracker;
