pub mod command;
pub mod command_log;
pub mod host;
pub mod paths;
pub mod progress;

pub use command::{CommandError, Executor, ShellExecutor};
pub use progress::create_spinner;
