pub mod calendar_provider;
pub mod page_fetcher;
