pub mod creative;
pub mod pacer;
