pub mod fibonacci;
pub mod indicator_series;
pub mod market_turnover;
pub mod paste_parser;
pub mod providers;
pub mod signal_evaluator;
pub mod theme_analysis;
pub mod theme_heat;
pub mod theme_registry;
pub mod tick_size;
pub mod twse_history;
