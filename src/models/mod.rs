pub mod fibonacci;
pub mod indicator;
pub mod market;
pub mod price;
pub mod settings;
pub mod signal;
pub mod theme;
