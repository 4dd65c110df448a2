pub mod args;
pub mod process;
pub mod status;

pub use args::{Cli, CliCommand, ProcessCliArgs, StatusCliArgs};
pub use process::handle_process_command;
pub use status::{handle_status_command, print_report};
