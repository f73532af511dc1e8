pub mod client;
pub mod cursor;
pub mod search;
