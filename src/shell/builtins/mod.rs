//! Msh builtins
//!
//! This module includes the implementations of common shell builtin
//! commands. Where possible the commands conform to their standard Bash
//! counterparts.

use std::iter;

use docopt::Docopt;
use failure::Fail;
use serde;

use self::prelude::*;

use self::dirs::Cd;
use self::exit::Exit;
use self::history::History;
use self::jobs::{Bg, Fg, Jobs};
use self::kill::Kill;

pub mod prelude {
    pub use std::io::Write;

    pub use failure::ResultExt;

    pub use super::{parse_args, parse_job_id};
    pub use crate::errors::{Error, ErrorKind, Result};
    pub use crate::shell::shell::Shell;
}

mod dirs;
mod exit;
mod history;
mod jobs;
mod kill;

const BG_NAME: &str = "bg";
const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const FG_NAME: &str = "fg";
const HISTORY_NAME: &str = "history";
const JOBS_NAME: &str = "jobs";
const KILL_NAME: &str = "kill";
const QUIT_NAME: &str = "quit";

/// Represents an msh builtin command such as cd or jobs.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> String {
        Self::HELP.lines().nth(0).unwrap().to_owned()
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [
        BG_NAME,
        CD_NAME,
        EXIT_NAME,
        FG_NAME,
        HISTORY_NAME,
        JOBS_NAME,
        KILL_NAME,
        QUIT_NAME,
    ]
    .contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run<S1, S2>(shell: &mut Shell, program: S1, args: &[S2], stdout: &mut dyn Write) -> Result<()>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    match program.as_ref() {
        BG_NAME => Bg::run(shell, args, stdout),
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME | QUIT_NAME => Exit::run(shell, args, stdout),
        FG_NAME => Fg::run(shell, args, stdout),
        HISTORY_NAME => History::run(shell, args, stdout),
        JOBS_NAME => Jobs::run(shell, args, stdout),
        KILL_NAME => Kill::run(shell, args, stdout),
        _ => unreachable!(),
    }
}

pub fn parse_args<'a, 'de: 'a, D, S, I>(usage: &str, program: S, args: I) -> Result<D>
where
    D: serde::Deserialize<'de>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Docopt::new(usage)
        .unwrap()
        .argv(iter::once(program).chain(args))
        .deserialize()
        .map_err(|e| e.context(ErrorKind::Docopt).into())
}

/// Parses a job spec of the form `N` or `%N` into a job id.
pub fn parse_job_id(name: &str, arg: &str) -> Result<crate::core::job::JobId> {
    arg.trim_start_matches('%')
        .parse::<u32>()
        .map(crate::core::job::JobId)
        .map_err(|_| {
            Error::builtin_command(format!("{}: {}: arguments must be job IDs", name, arg), 1)
        })
}
