pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, OutputFormatArg, RunArgs, ServeArgs};
pub use output::{OutputFormat, OutputFormatter};
