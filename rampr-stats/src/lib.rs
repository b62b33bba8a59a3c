pub mod app;
pub mod cli;

mod collect;
mod latex;
mod stats;
