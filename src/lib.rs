pub mod api;
pub mod chart;
pub mod console;
pub mod core;
pub mod data;
pub mod pipeline;
