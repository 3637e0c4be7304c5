pub mod app;
pub mod attributes;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod find;
pub mod output;
pub mod runtime;
pub mod source;

pub use app::run;
