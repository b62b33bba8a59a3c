//! [`rampr_core::LoadGenerator`] implementation that shells out to
//! [hey](https://github.com/rakyll/hey).

mod error;
mod generator;
mod parse;
mod runner;
mod tool;

pub use error::{Error, Result};
pub use generator::{HeyGenerator, HeyOutput};
pub use tool::{HEY_COMMAND, HeyTool};
