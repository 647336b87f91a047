pub mod rate_limit;
pub mod tasks;
pub mod time;
