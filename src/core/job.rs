//! The data model for jobs: the shell's lifecycle records for launched
//! pipelines.

use std::fmt;

use nix::libc;

/// Job identifier: a small positive integer, unique among currently live
/// jobs.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct JobId(pub u32);

/// Lifecycle states of a job.
///
/// `Running` is the sole initial state. `Done` is terminal: a done job is
/// only ever removed, never mutated further. Deletion is represented by
/// removal from the job table rather than by a tombstone state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

/// The lifecycle record of one spawned pipeline.
#[derive(Clone, Debug)]
pub struct Job {
    id: JobId,
    /// The representative process: the last stage of the pipeline, which
    /// is also the one the shell waits on.
    pid: libc::pid_t,
    /// The process group shared by every stage of the pipeline.
    pgid: libc::pid_t,
    state: JobState,
    background: bool,
    input: String,
    /// Whether the completion/suspension notice has been printed.
    notified: bool,
}

impl Job {
    pub fn new(id: JobId, pid: libc::pid_t, pgid: libc::pid_t, background: bool, input: &str) -> Job {
        Job {
            id,
            pid,
            pgid,
            state: JobState::Running,
            background,
            input: input.to_string(),
            notified: false,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> libc::pid_t {
        self.pid
    }

    pub fn pgid(&self) -> libc::pid_t {
        self.pgid
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn set_background(&mut self, background: bool) {
        self.background = background;
    }

    /// The command line this job was launched with.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn notified(&self) -> bool {
        self.notified
    }

    pub fn set_notified(&mut self, notified: bool) {
        self.notified = notified;
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Suspended"),
            JobState::Done => write!(f, "Done"),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]  {}  {}", self.id, self.state, self.input)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_running() {
        let job = Job::new(JobId(1), 100, 100, false, "sleep 5");
        assert_eq!(job.state(), JobState::Running);
        assert!(!job.is_background());
        assert!(!job.notified());
    }

    #[test]
    fn display_uses_job_id_and_input() {
        let mut job = Job::new(JobId(2), 100, 100, true, "sleep 5");
        assert_eq!(format!("{}", job), "[2]  Running  sleep 5");
        job.set_state(JobState::Stopped);
        assert_eq!(format!("{}", job), "[2]  Suspended  sleep 5");
    }
}
