//! Library side of the `chartdata` command.

pub mod logging;
pub mod pipeline;
