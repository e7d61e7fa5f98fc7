pub mod app;
pub mod extract;
