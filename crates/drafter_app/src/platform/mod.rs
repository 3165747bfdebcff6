mod app;
mod config;
mod editor;
mod logging;

pub use app::run;
