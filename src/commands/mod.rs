pub mod fibonacci_cmd;
pub mod signal_cmd;
pub mod theme_cmd;
