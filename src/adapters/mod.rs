pub mod graphql;
pub mod rate_limiter;
pub mod shared;
