pub mod availability;
pub mod date_selector;
pub mod listing;
pub mod probe;
pub mod rank;
pub mod report;
pub mod search_criteria;
