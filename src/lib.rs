pub mod env;
pub mod headers;
pub mod hosts;
pub mod proxy;
pub mod server;
pub mod sign;
