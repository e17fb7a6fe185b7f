// src/ui/widgets/mod.rs

pub mod footer;
pub mod input;
pub mod log_view;
pub mod results;
pub mod summary;
