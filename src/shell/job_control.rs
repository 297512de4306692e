//! Job control: the job table, the signal-driven reaper, and the
//! synchronous operations the main loop and builtins invoke.
//!
//! The job table is the only state shared between the main loop and the
//! asynchronous reaping path. It lives behind a mutex paired with a
//! condition variable: the C-style "block SIGCHLD, spawn, sigsuspend"
//! discipline becomes "lock the table, spawn and register, wait on the
//! condvar". A notification that races ahead of the wait cannot be lost
//! because the predicate is re-checked under the same lock, and a child
//! status that arrives while the table is locked stays queued in the
//! kernel until `waitpid` collects it.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use failure::ResultExt;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGCHLD, SIGTSTP};
use signal_hook::iterator::Signals;

use crate::core::job::{Job, JobId, JobState};
use crate::core::parser::Pipeline;
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::execute_command;

/// The authoritative record of every outstanding process group the shell
/// has spawned. Only ever touched with the owning mutex held.
#[derive(Debug, Default)]
struct JobTable {
    jobs: Vec<Job>,
    job_count: u32,
    capacity: usize,
    /// The job the main loop is currently blocked on, if any.
    foreground: Option<JobId>,
}

impl JobTable {
    /// Appends a new job and assigns the next job id.
    ///
    /// Exceeding the configured capacity is a fatal resource-exhaustion
    /// condition, not a recoverable error.
    fn add(&mut self, pid: libc::pid_t, pgid: libc::pid_t, background: bool, input: &str) -> JobId {
        assert!(
            self.jobs.len() < self.capacity,
            "job table capacity ({}) exceeded",
            self.capacity
        );
        self.job_count += 1;
        let id = JobId(self.job_count);
        self.jobs.push(Job::new(id, pid, pgid, background, input));
        id
    }

    fn find(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id() == id)
    }

    /// Linear scan by representative process id; the table stays small.
    fn find_by_process(&self, pid: Pid) -> Option<usize> {
        self.jobs.iter().position(|job| job.pid() == pid.as_raw())
    }

    fn get(&self, id: JobId) -> Option<&Job> {
        self.find(id).map(|index| &self.jobs[index])
    }

    /// Removes a job and compacts the id counter: deleting the
    /// highest-numbered job lowers the next id, and an empty table resets
    /// it so the next assigned id is 1. Display ergonomics, not a
    /// correctness requirement.
    fn delete(&mut self, id: JobId) {
        if let Some(index) = self.find(id) {
            self.jobs.remove(index);
        }
        self.compact_counter();
    }

    fn purge_done(&mut self) {
        self.jobs.retain(|job| job.state() != JobState::Done);
        self.compact_counter();
    }

    fn compact_counter(&mut self) {
        self.job_count = self.jobs.iter().map(|job| job.id().0).max().unwrap_or(0);
    }

    fn highest_live(&self) -> Option<JobId> {
        self.jobs.iter().map(Job::id).max()
    }

    /// A consistent point-in-time copy for display purposes.
    fn snapshot(&self) -> Vec<Job> {
        self.jobs.clone()
    }
}

/// State shared between the main loop and the reaper thread.
#[derive(Debug)]
struct SharedState {
    table: Mutex<JobTable>,
    job_transition: Condvar,
}

impl SharedState {
    fn new(capacity: usize) -> SharedState {
        SharedState {
            table: Mutex::new(JobTable {
                capacity,
                ..Default::default()
            }),
            job_transition: Condvar::new(),
        }
    }

    fn lock_table(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().expect("job table mutex poisoned")
    }

    /// SIGCHLD path: reap every child whose status is ready, without
    /// blocking, and fold each status into the table. Finding no ready
    /// child is normal.
    fn reap_children(&self) {
        let mut table = self.lock_table();
        loop {
            let wait_status = wait::waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
            );
            match wait_status {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => mark_process_status(&mut table, &status),
                Err(e) => {
                    warn!("waitpid failed: {}", e);
                    break;
                }
            }
        }
        self.job_transition.notify_all();
    }

    /// SIGTSTP path: the operator asked to suspend the active foreground
    /// job. The foreground wait is satisfied by this transition, not by a
    /// child-status change. Re-delivery while the job is already in the
    /// background is a no-op.
    fn suspend_foreground(&self) {
        let mut table = self.lock_table();
        let index = match table.foreground.and_then(|id| table.find(id)) {
            Some(index) => index,
            None => return,
        };
        if table.jobs[index].is_background() {
            return;
        }

        let pgid = table.jobs[index].pgid();
        if let Err(e) = signal::kill(Pid::from_raw(-pgid), Signal::SIGTSTP) {
            // Report, don't abort the shell.
            error!("failed to stop process group {}: {}", pgid, e);
            eprintln!("msh: failed to stop job: {}", e);
            return;
        }

        let job = &mut table.jobs[index];
        job.set_state(JobState::Stopped);
        job.set_background(true);
        job.set_notified(true);
        println!("\n[{}]  {} suspended  {}", job.id(), job.pid(), job.input());
        self.job_transition.notify_all();
    }
}

/// Applies one reaped wait status to the table. Only the representative
/// (last-stage) pid drives a job transition; earlier stages reap silently.
fn mark_process_status(table: &mut JobTable, wait_status: &WaitStatus) {
    match *wait_status {
        WaitStatus::Exited(pid, status_code) => {
            debug!("{} exited with {}", pid, status_code);
            mark_done(table, pid);
        }
        WaitStatus::Signaled(pid, sig, ..) => {
            debug!("{} terminated by signal {:?}", pid, sig);
            mark_done(table, pid);
        }
        WaitStatus::Stopped(pid, sig) => {
            debug!("{} stopped by signal {:?}", pid, sig);
            if let Some(index) = table.find_by_process(pid) {
                let job = &mut table.jobs[index];
                if job.state() != JobState::Stopped {
                    job.set_state(JobState::Stopped);
                    job.set_background(true);
                    job.set_notified(true);
                    println!("\n[{}]  {} suspended  {}", job.id(), job.pid(), job.input());
                }
            }
        }
        _ => (),
    }
}

fn mark_done(table: &mut JobTable, pid: Pid) {
    match table.find_by_process(pid) {
        Some(index) => {
            let job = &mut table.jobs[index];
            job.set_state(JobState::Done);
            // The main loop may be blocked reading input, so a background
            // completion is announced immediately rather than at the next
            // prompt redraw.
            if job.is_background() && !job.notified() {
                job.set_notified(true);
                println!("\n[{}]  {} done", job.id(), job.pid());
            }
        }
        None => debug!("reaped untracked process {}", pid),
    }
}

/// The job control facade: owns the shared job table and the reaper
/// thread, and exposes the synchronous operations the shell invokes.
pub struct JobManager {
    state: Arc<SharedState>,
}

impl JobManager {
    /// Creates the job table and starts the reaper thread, which owns the
    /// SIGCHLD/SIGTSTP subscriptions for the lifetime of the process.
    pub fn new(job_table_capacity: usize) -> Result<JobManager> {
        let state = Arc::new(SharedState::new(job_table_capacity));

        // Keyboard interrupts are for the foreground job, never the shell
        // itself. Children restore the default dispositions before exec.
        unsafe {
            signal::signal(Signal::SIGINT, SigHandler::SigIgn).context(ErrorKind::Nix)?;
            signal::signal(Signal::SIGQUIT, SigHandler::SigIgn).context(ErrorKind::Nix)?;
        }

        let mut signals = Signals::new(&[SIGCHLD, SIGTSTP]).context(ErrorKind::Io)?;
        let reaper_state = Arc::clone(&state);
        thread::Builder::new()
            .name("reaper".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    match signal {
                        SIGCHLD => reaper_state.reap_children(),
                        SIGTSTP => reaper_state.suspend_foreground(),
                        _ => unreachable!(),
                    }
                }
            })
            .context(ErrorKind::Io)?;

        Ok(JobManager { state })
    }

    /// Spawns the pipeline's processes and registers its job as one
    /// critical section, so the reaper cannot observe a child whose job is
    /// not yet in the table.
    pub fn spawn_job(&mut self, pipeline: &Pipeline) -> Result<JobId> {
        let mut table = self.state.lock_table();
        let spawned = execute_command::spawn_pipeline(pipeline)?;
        let id = table.add(
            spawned.pid,
            spawned.pgid,
            pipeline.background,
            pipeline.input(),
        );
        // Marked here, under the same lock as registration, so a suspend
        // request cannot arrive before the wait begins and find no
        // foreground job to act on.
        if !pipeline.background {
            table.foreground = Some(id);
        }
        debug!(
            "job [{}]: {} of {} stages spawned, pid {} pgid {}",
            id,
            spawned.stage_count,
            pipeline.commands.len(),
            spawned.pid,
            spawned.pgid
        );
        Ok(id)
    }

    /// Prints the `[job_id] pid` announcement for a background launch.
    pub fn announce_job(&self, id: JobId) {
        let table = self.state.lock_table();
        if let Some(job) = table.get(id) {
            println!("[{}]  {}", job.id(), job.pid());
        }
    }

    /// Blocks until the job leaves the running-in-foreground state: either
    /// the reaper marks it done, or the operator suspends it. Never polls.
    ///
    /// A job observed done is deleted; a stopped job stays in the table as
    /// a backgrounded, suspended job.
    pub fn wait_for_job(&mut self, id: JobId) -> Result<JobState> {
        let mut table = self.state.lock_table();
        table.foreground = Some(id);
        loop {
            match table.get(id).map(Job::state) {
                Some(JobState::Running) => {
                    table = self
                        .state
                        .job_transition
                        .wait(table)
                        .expect("job table mutex poisoned");
                }
                _ => break,
            }
        }
        table.foreground = None;

        match table.get(id).map(Job::state) {
            Some(JobState::Stopped) => Ok(JobState::Stopped),
            _ => {
                table.delete(id);
                Ok(JobState::Done)
            }
        }
    }

    /// Resumes a job in the foreground and waits for it.
    ///
    /// Without an explicit id, the highest-numbered live job is used.
    /// Bringing a job to the foreground restores its foreground
    /// classification even if a previous Ctrl-Z reclassified it.
    pub fn put_job_in_foreground(&mut self, job_id: Option<JobId>) -> Result<JobState> {
        let id = {
            let mut table = self.state.lock_table();
            let id = job_id
                .or_else(|| table.highest_live())
                .ok_or_else(|| Error::no_such_job("current"))?;
            let index = match table.find(id) {
                Some(index) if table.jobs[index].state() != JobState::Done => index,
                _ => return Err(Error::no_such_job(format!("{}", id))),
            };

            debug!("putting job [{}] in foreground", id);
            println!("{}", table.jobs[index].input());
            if table.jobs[index].state() == JobState::Stopped {
                let pgid = table.jobs[index].pgid();
                signal::kill(Pid::from_raw(-pgid), Signal::SIGCONT).context(ErrorKind::Nix)?;
                table.jobs[index].set_state(JobState::Running);
            }
            table.jobs[index].set_background(false);
            table.jobs[index].set_notified(false);
            id
        };

        self.wait_for_job(id)
    }

    /// Resumes a stopped job in the background and reports it, without
    /// blocking.
    pub fn put_job_in_background(&mut self, job_id: Option<JobId>) -> Result<()> {
        let mut table = self.state.lock_table();
        let id = job_id
            .or_else(|| table.highest_live())
            .ok_or_else(|| Error::no_such_job("current"))?;
        let index = match table.find(id) {
            Some(index) if table.jobs[index].state() != JobState::Done => index,
            _ => return Err(Error::no_such_job(format!("{}", id))),
        };

        debug!("putting job [{}] in background", id);
        if table.jobs[index].state() == JobState::Stopped {
            let pgid = table.jobs[index].pgid();
            signal::kill(Pid::from_raw(-pgid), Signal::SIGCONT).context(ErrorKind::Nix)?;
            table.jobs[index].set_state(JobState::Running);
            table.jobs[index].set_notified(false);
        }
        table.jobs[index].set_background(true);
        println!("[{}]  {} &", id, table.jobs[index].input());
        Ok(())
    }

    /// Requests termination of the job's whole process group. The reaper
    /// observes the resulting status change and marks the job done; this
    /// only requests.
    ///
    /// Without an explicit id, the highest-numbered live job is used.
    pub fn kill_job(&mut self, job_id: Option<JobId>) -> Result<()> {
        let table = self.state.lock_table();
        let id = job_id
            .or_else(|| table.highest_live())
            .ok_or_else(|| Error::no_such_job("current"))?;
        let job = table
            .get(id)
            .ok_or_else(|| Error::no_such_job(format!("{}", id)))?;
        if job.state() == JobState::Done {
            return Ok(());
        }

        let pgid = job.pgid();
        signal::kill(Pid::from_raw(-pgid), Signal::SIGTERM).context(ErrorKind::Nix)?;
        if job.state() == JobState::Stopped {
            // A stopped group cannot act on SIGTERM until it is continued.
            signal::kill(Pid::from_raw(-pgid), Signal::SIGCONT).context(ErrorKind::Nix)?;
        }
        Ok(())
    }

    /// An ordered point-in-time view of the table for the `jobs` builtin.
    /// Done entries encountered here are displayed for the last time, so
    /// they are dropped from the table on the way out.
    pub fn job_snapshot(&mut self) -> Vec<Job> {
        let mut table = self.state.lock_table();
        let snapshot = table.snapshot();
        table.purge_done();
        snapshot
    }

    /// Silently removes done jobs whose completion has already been
    /// announced. Called once per prompt iteration.
    pub fn purge_completed(&mut self) {
        let mut table = self.state.lock_table();
        table.purge_done();
    }

    pub fn has_jobs(&self) -> bool {
        !self.state.lock_table().jobs.is_empty()
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.state.lock_table();
        writeln!(f, "{} jobs\tjob_count: {}", table.jobs.len(), table.job_count)?;
        for job in &table.jobs {
            writeln!(f, "{:?}", job)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_capacity(capacity: usize) -> JobTable {
        JobTable {
            capacity,
            ..Default::default()
        }
    }

    #[test]
    fn ids_are_assigned_monotonically() {
        let mut table = table_with_capacity(8);
        assert_eq!(table.add(100, 100, false, "a"), JobId(1));
        assert_eq!(table.add(200, 200, true, "b"), JobId(2));
        assert_eq!(table.add(300, 300, false, "c"), JobId(3));
    }

    #[test]
    fn counter_resets_when_table_empties() {
        let mut table = table_with_capacity(8);
        let first = table.add(100, 100, false, "a");
        let second = table.add(200, 200, false, "b");
        table.delete(first);
        // id 2 is still live, so the counter cannot rewind
        assert_eq!(table.add(300, 300, false, "c"), JobId(3));
        table.delete(second);
        table.delete(JobId(3));
        assert_eq!(table.add(400, 400, false, "d"), JobId(1));
    }

    #[test]
    fn deleting_newest_job_compacts_counter() {
        let mut table = table_with_capacity(8);
        let first = table.add(100, 100, false, "a");
        let second = table.add(200, 200, false, "b");
        table.delete(second);
        assert_eq!(table.add(300, 300, false, "c"), JobId(2));
        assert!(table.get(first).is_some());
    }

    #[test]
    fn delete_of_unknown_id_is_noop() {
        let mut table = table_with_capacity(8);
        table.add(100, 100, false, "a");
        table.delete(JobId(42));
        assert_eq!(table.jobs.len(), 1);
    }

    #[test]
    fn find_by_process_matches_representative_pid_only() {
        let mut table = table_with_capacity(8);
        table.add(100, 90, false, "a | b");
        assert!(table.find_by_process(Pid::from_raw(100)).is_some());
        // an intermediate stage pid is not tracked
        assert!(table.find_by_process(Pid::from_raw(90)).is_none());
    }

    #[test]
    fn reaped_exit_marks_job_done() {
        let mut table = table_with_capacity(8);
        let id = table.add(100, 100, false, "a");
        mark_process_status(&mut table, &WaitStatus::Exited(Pid::from_raw(100), 0));
        assert_eq!(table.get(id).map(Job::state), Some(JobState::Done));
    }

    #[test]
    fn reaped_stop_reclassifies_job_as_background() {
        let mut table = table_with_capacity(8);
        let id = table.add(100, 100, false, "a");
        mark_process_status(
            &mut table,
            &WaitStatus::Stopped(Pid::from_raw(100), Signal::SIGTSTP),
        );
        let job = table.get(id).expect("job should stay in the table");
        assert_eq!(job.state(), JobState::Stopped);
        assert!(job.is_background());
    }

    #[test]
    fn untracked_pid_reaps_silently() {
        let mut table = table_with_capacity(8);
        table.add(100, 100, false, "a");
        mark_process_status(&mut table, &WaitStatus::Exited(Pid::from_raw(999), 0));
        assert_eq!(table.jobs.len(), 1);
        assert_eq!(table.jobs[0].state(), JobState::Running);
    }

    #[test]
    fn purge_drops_done_entries_only() {
        let mut table = table_with_capacity(8);
        let first = table.add(100, 100, true, "a");
        let second = table.add(200, 200, true, "b");
        mark_process_status(&mut table, &WaitStatus::Exited(Pid::from_raw(100), 0));
        table.purge_done();
        assert!(table.get(first).is_none());
        assert!(table.get(second).is_some());
    }

    #[test]
    fn repeated_stop_for_stopped_job_is_noop() {
        let mut table = table_with_capacity(8);
        let id = table.add(100, 100, false, "a");
        mark_process_status(
            &mut table,
            &WaitStatus::Stopped(Pid::from_raw(100), Signal::SIGTSTP),
        );
        assert!(table.get(id).map(Job::notified).unwrap_or(false));

        // Once the notice flag is cleared, a duplicate stop report must
        // not re-announce the suspension.
        table.jobs[0].set_notified(false);
        mark_process_status(
            &mut table,
            &WaitStatus::Stopped(Pid::from_raw(100), Signal::SIGTSTP),
        );
        let job = table.get(id).expect("job should stay in the table");
        assert_eq!(job.state(), JobState::Stopped);
        assert!(!job.notified());
    }

    #[test]
    fn suspend_without_foreground_is_noop() {
        let state = SharedState::new(8);
        {
            let mut table = state.lock_table();
            table.add(100, 100, false, "a");
        }

        state.suspend_foreground();

        let table = state.lock_table();
        assert_eq!(table.jobs[0].state(), JobState::Running);
        assert!(!table.jobs[0].notified());
    }

    #[test]
    fn suspend_of_background_job_is_noop() {
        let state = SharedState::new(8);
        {
            let mut table = state.lock_table();
            let id = table.add(100, 100, true, "a");
            table.foreground = Some(id);
        }

        state.suspend_foreground();

        let table = state.lock_table();
        assert_eq!(table.jobs[0].state(), JobState::Running);
        assert!(table.jobs[0].is_background());
        assert!(!table.jobs[0].notified());
    }

    #[test]
    fn spawn_marks_foreground_within_registration() {
        let mut manager = JobManager::new(8).expect("job manager should start");

        let background = Pipeline::parse("sleep 0.1 &").expect("pipeline should parse");
        let background_id = manager
            .spawn_job(&background)
            .expect("background job should spawn");
        assert!(manager.state.lock_table().foreground.is_none());

        let foreground = Pipeline::parse("sleep 0.1").expect("pipeline should parse");
        let foreground_id = manager
            .spawn_job(&foreground)
            .expect("foreground job should spawn");
        assert_eq!(manager.state.lock_table().foreground, Some(foreground_id));

        assert_eq!(
            manager
                .wait_for_job(foreground_id)
                .expect("wait should succeed"),
            JobState::Done
        );
        assert!(manager.state.lock_table().foreground.is_none());
        assert_eq!(
            manager
                .wait_for_job(background_id)
                .expect("wait should succeed"),
            JobState::Done
        );
    }

    #[test]
    #[should_panic(expected = "job table capacity")]
    fn exceeding_capacity_is_fatal() {
        let mut table = table_with_capacity(1);
        table.add(100, 100, false, "a");
        table.add(200, 200, false, "b");
    }
}
