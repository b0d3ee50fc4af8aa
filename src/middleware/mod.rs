pub mod rate_limit;

pub use rate_limit::{public_rate_limit, RateLimiter};
