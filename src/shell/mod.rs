//! External command execution and platform checks.

pub mod command;
pub mod invocation;
pub mod platform;
pub mod scripted;

pub use command::{
    execute, execute_streaming, CommandOptions, CommandResult, CommandRunner,
    OutputCallback, OutputLine, SystemRunner,
};
pub use invocation::Invocation;
pub use platform::{is_ci, is_elevated};
pub use scripted::{CallLog, RecordedCall, ScriptedRunner};
