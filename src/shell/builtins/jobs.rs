use crate::core::job::JobState;
use crate::shell::builtins::{self, prelude::*};

pub struct Jobs;

#[derive(Debug, Deserialize)]
struct JobsArgs {
    flag_r: bool,
    flag_s: bool,
}

impl builtins::BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
jobs: jobs [options]

Display status of jobs.

Lists the active jobs. Without options, the status of all active jobs is
displayed.

Usage:
    jobs [options]

Options:
    -r      restrict output to running jobs
    -s      restrict output to stopped jobs

Exit Status:
Returns success unless an invalid option is given or an error occurs.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let args: JobsArgs = parse_args(Self::HELP, Self::NAME, args.iter().map(AsRef::as_ref))?;
        debug!("{:?}", args);

        for job in &shell.get_jobs() {
            if args.flag_r && job.state() != JobState::Running {
                continue;
            }
            if args.flag_s && job.state() != JobState::Stopped {
                continue;
            }
            writeln!(stdout, "{}", job).context(ErrorKind::Io)?;
        }

        Ok(())
    }
}

pub struct Fg;

impl builtins::BuiltinCommand for Fg {
    const NAME: &'static str = builtins::FG_NAME;

    const HELP: &'static str = "\
fg: fg [job_spec]
    Move job to the foreground.

    Place the job identified by JOB_SPEC in the foreground, resuming it if
    it is suspended. If JOB_SPEC is not present, the highest-numbered job
    is used.

    Exit Status:
    Status of command placed in foreground or failure if an error occurs.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let job_id = match args.first() {
            Some(arg) => Some(parse_job_id(Self::NAME, arg.as_ref())?),
            None => None,
        };
        shell.put_job_in_foreground(job_id)?;
        Ok(())
    }
}

pub struct Bg;

impl builtins::BuiltinCommand for Bg {
    const NAME: &'static str = builtins::BG_NAME;

    const HELP: &'static str = "\
bg: bg [job_spec]
    Move job to the background.

    Place the job identified by JOB_SPEC in the background, as if it had
    been started with `&'. If JOB_SPEC is not present, the
    highest-numbered job is used.

    Exit Status:
    Returns success unless job control is not enabled or an error occurs.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let job_id = match args.first() {
            Some(arg) => Some(parse_job_id(Self::NAME, arg.as_ref())?),
            None => None,
        };
        shell.put_job_in_background(job_id)?;
        Ok(())
    }
}
