pub mod http;
pub mod number;
pub mod retry;
