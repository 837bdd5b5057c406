pub mod args;
pub mod exec;
