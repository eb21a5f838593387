mod parser;
mod registry;

pub use parser::{parse_command, SessionCommand};
pub use registry::SESSION_HELP_COMMANDS;
