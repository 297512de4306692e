//! Process launcher: turns a parsed pipeline into a chain of child
//! processes sharing one process group.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{ChildStdout, Command, Stdio};

use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, Pid};

use crate::core::parser::Pipeline;
use crate::errors::{Error, Result};

/// The outcome of launching one pipeline. `pid` is the representative
/// process the shell registers and waits on: the last stage that spawned.
#[derive(Clone, Copy, Debug)]
pub struct SpawnedPipeline {
    pub pid: libc::pid_t,
    pub pgid: libc::pid_t,
    pub stage_count: usize,
}

/// Creates one OS process per pipeline stage, wiring stage i's stdout to
/// stage i+1's stdin through an anonymous pipe. Stage 0 inherits the
/// shell's stdin and the last stage inherits the shell's stdout.
///
/// The first child that spawns creates the pipeline's process group; the
/// rest join it, so one group-directed signal reaches every stage. A
/// stage that cannot be located or executed fails on its own: the failure
/// is reported, its siblings are unaffected, and the pipeline's job still
/// completes normally. Only if no stage spawns at all does the launch
/// fail, and no job is registered.
///
/// The caller holds the job table lock across this call and the job
/// registration that follows it; reaping happens through `waitpid` in the
/// job manager, never through the returned `Child` handles.
pub fn spawn_pipeline(pipeline: &Pipeline) -> Result<SpawnedPipeline> {
    let stages = &pipeline.commands;
    let mut pgid: Option<libc::pid_t> = None;
    let mut last_pid: Option<libc::pid_t> = None;
    let mut pipe: Option<ChildStdout> = None;
    let mut stage_count = 0;

    for (index, stage) in stages.iter().enumerate() {
        let is_last = index + 1 == stages.len();

        let mut command = Command::new(stage.program());
        command.args(stage.args());
        match pipe.take() {
            Some(upstream) => {
                command.stdin(upstream);
            }
            // An upstream stage that failed to spawn produces no output.
            None if index > 0 => {
                command.stdin(Stdio::null());
            }
            None => {}
        }
        if !is_last {
            command.stdout(Stdio::piped());
        }

        let join_pgid = pgid;
        unsafe {
            command.pre_exec(move || child_setup(join_pgid));
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    eprintln!("msh: {}: command not found", stage.program());
                } else {
                    eprintln!("msh: {}: {}", stage.program(), e);
                }
                continue;
            }
        };

        let pid = child.id() as libc::pid_t;
        let group = pgid.unwrap_or(pid);
        // Set the group in the parent as well as the child, so a
        // group-directed signal sent right after spawn cannot miss it.
        let temp_result = unistd::setpgid(Pid::from_raw(pid), Pid::from_raw(group));
        log_if_err!(temp_result, "failed to set pgid ({}) for pid ({})", group, pid);

        pgid = Some(group);
        last_pid = Some(pid);
        stage_count += 1;
        pipe = child.stdout.take();
    }

    match (last_pid, pgid) {
        (Some(pid), Some(pgid)) => Ok(SpawnedPipeline {
            pid,
            pgid,
            stage_count,
        }),
        _ => Err(Error::command_not_found(stages[0].program())),
    }
}

/// Runs after fork in the child, before exec: join the pipeline's process
/// group and restore the default dispositions the shell overrides.
fn child_setup(pgid: Option<libc::pid_t>) -> io::Result<()> {
    let pid = unistd::getpid();
    let pgid = pgid.map(Pid::from_raw).unwrap_or(pid);
    unistd::setpgid(pid, pgid).map_err(io_error)?;

    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::SigDfl).map_err(io_error)?;
        signal::signal(Signal::SIGQUIT, SigHandler::SigDfl).map_err(io_error)?;
        signal::signal(Signal::SIGTSTP, SigHandler::SigDfl).map_err(io_error)?;
        signal::signal(Signal::SIGCHLD, SigHandler::SigDfl).map_err(io_error)?;
    }

    Ok(())
}

fn io_error(errno: nix::errno::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno as i32)
}
