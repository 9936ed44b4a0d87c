//! Redis-backed implementations of the provider traits.

mod rate_limiter_redis;
mod session_redis;
mod token_redis;

pub use rate_limiter_redis::RedisRateLimiter;
pub use session_redis::RedisSessionStore;
pub use token_redis::RedisTokenStore;
