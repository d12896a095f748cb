//! Library side of the `mirador` command line tool.

pub mod build;
pub mod logging;
