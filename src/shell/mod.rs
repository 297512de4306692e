pub mod builtins;
pub mod execute_command;
pub mod job_control;
pub mod shell;

pub use self::shell::{Shell, ShellConfig};
