use crate::shell::builtins::{self, prelude::*};

pub struct Kill;

impl builtins::BuiltinCommand for Kill {
    const NAME: &'static str = builtins::KILL_NAME;

    const HELP: &'static str = "\
kill: kill [job_spec]
    Terminate a job.

    Send SIGTERM to the process group identified by JOB_SPEC. If JOB_SPEC
    is not present, the highest-numbered job is used. Kill is a shell
    builtin so that job IDs can be used instead of process IDs.

    Exit Status:
    Returns success unless an invalid option is given or an error occurs.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let job_id = match args.first() {
            Some(arg) => Some(parse_job_id(Self::NAME, arg.as_ref())?),
            None => None,
        };
        shell.kill_job(job_id)?;
        Ok(())
    }
}
