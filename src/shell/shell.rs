//! Msh - Shell Module
//!
//! The Shell itself is responsible for evaluating input lines, managing
//! jobs, and maintaining a history of previous commands.

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use crate::core::job::{Job, JobId, JobState};
use crate::core::parser::Pipeline;
use crate::editor::Editor;
use crate::errors::{ErrorKind, Result};
use crate::shell::builtins;
use crate::shell::job_control::JobManager;

const HISTORY_FILE_NAME: &str = ".msh_history";

/// Msh Shell
pub struct Shell {
    /// Responsible for readline and history.
    pub editor: Editor,
    history_file: Option<PathBuf>,
    job_manager: JobManager,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new Shell to manage running jobs and command history.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        let mut shell = Shell {
            editor: Editor::with_capacity(config.command_history_capacity),
            history_file: None,
            job_manager: JobManager::new(config.job_table_capacity)?,
            config,
        };

        if config.enable_command_history {
            shell.load_history()?;
        }

        info!("msh started up");
        Ok(shell)
    }

    fn load_history(&mut self) -> Result<()> {
        self.history_file = dirs::home_dir().map(|p| p.join(HISTORY_FILE_NAME));
        if let Some(ref history_file) = self.history_file {
            self.editor.load_history(history_file).or_else(|e| {
                if let ErrorKind::HistoryFileNotFound = *e.kind() {
                    return Ok(());
                }

                Err(e)
            })?;
        } else {
            warn!("unable to get home directory");
        }

        Ok(())
    }

    /// Custom prompt to output to the user.
    /// Returns `None` when end of input is reached.
    pub fn prompt(&mut self) -> Result<Option<String>> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("?"));
        let rel = match dirs::home_dir() {
            Some(ref home) => match cwd.strip_prefix(home) {
                Ok(rel) => Path::new("~").join(rel),
                Err(_) => cwd.clone(),
            },
            None => cwd.clone(),
        };

        let prompt = format!("{} $ ", rel.display());
        let line = self.editor.readline(&prompt)?;
        Ok(line)
    }

    /// Evaluates one input line: history expansion and recording, builtin
    /// dispatch, or pipeline launch.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        // skip if empty
        if input.is_empty() {
            return Ok(());
        }

        let mut line = input.to_owned();
        if self.config.enable_command_history {
            if line.starts_with('!') {
                // The recall invocation itself is never recorded; the
                // recalled line is echoed, recorded, and executed.
                self.editor.expand_history(&mut line)?;
                println!("{}", line);
            }
            self.editor.add_history_entry(&line);
        }

        let pipeline = match Pipeline::parse(&line) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                if let ErrorKind::EmptyCommand = *e.kind() {
                    // empty and malformed lines are silently ignored
                    return Ok(());
                }

                return Err(e);
            }
        };

        // Builtins are only recognized as the sole stage of a pipeline.
        if pipeline.commands.len() == 1 {
            let argv = pipeline.commands[0].argv();
            if builtins::is_builtin(&argv[0]) {
                let result = builtins::run(self, &argv[0], &argv[1..], &mut io::stdout());
                if let Err(e) = result {
                    eprintln!("msh: {}", e);
                }
                return Ok(());
            }
        }

        self.execute_pipeline(&pipeline)
    }

    /// Runs jobs from stdin until EOF is received.
    pub fn execute_from_stdin(&mut self) {
        loop {
            // Drop jobs whose completion has already been announced.
            self.job_manager.purge_completed();

            let input = match self.prompt() {
                Ok(Some(line)) => line.trim().to_owned(),
                Ok(None) => break,
                e => {
                    log_if_err!(e, "prompt");
                    continue;
                }
            };

            let temp_result = self.execute_command_string(&input);
            if let Err(ref e) = temp_result {
                eprintln!("msh: {}", e);
            }
            log_if_err!(temp_result, "execute_command_string");
        }
    }

    fn execute_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        let job_id = match self.job_manager.spawn_job(pipeline) {
            Ok(job_id) => job_id,
            Err(e) => {
                if let ErrorKind::CommandNotFound(..) = *e.kind() {
                    // each failing stage already reported itself
                    return Ok(());
                }

                return Err(e);
            }
        };

        if pipeline.background {
            self.job_manager.announce_job(job_id);
        } else {
            self.job_manager.wait_for_job(job_id)?;
        }
        Ok(())
    }

    /// Returns the shell's jobs (running and stopped), dropping done
    /// entries after this final display.
    pub fn get_jobs(&mut self) -> Vec<Job> {
        self.job_manager.job_snapshot()
    }

    /// Returns `true` if the shell has outstanding jobs.
    pub fn has_jobs(&self) -> bool {
        self.job_manager.has_jobs()
    }

    /// Resumes the specified job (or the highest-numbered one) in the
    /// foreground and waits for it to finish or stop.
    pub fn put_job_in_foreground(&mut self, job_id: Option<JobId>) -> Result<JobState> {
        self.job_manager.put_job_in_foreground(job_id)
    }

    /// Resumes the specified job (or the highest-numbered one) in the
    /// background without waiting.
    pub fn put_job_in_background(&mut self, job_id: Option<JobId>) -> Result<()> {
        self.job_manager.put_job_in_background(job_id)
    }

    /// Requests termination of the specified job's (or the
    /// highest-numbered one's) process group; the reaper records the
    /// resulting exit.
    pub fn kill_job(&mut self, job_id: Option<JobId>) -> Result<()> {
        self.job_manager.kill_job(job_id)
    }

    /// Exit the shell.
    ///
    /// Exits with a status of n, normalized into 0..=255 the way bash and
    /// its descendents do. If n is None, the exit status is 0.
    pub fn exit(&mut self, n: Option<i32>) -> ! {
        if self.config.display_messages {
            println!("exit");
        }

        let code = n.unwrap_or(0);
        let code_like_u8 = if code < 0 {
            (256 + code) % 256
        } else {
            code % 256
        };

        if self.config.enable_command_history {
            if let Some(ref history_file) = self.history_file {
                if let Err(e) = self.editor.save_history(history_file) {
                    error!(
                        "error: failed to save history to file during shutdown: {}",
                        e
                    );
                }
            }
        }

        info!("msh has shut down");
        process::exit(code_like_u8);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}\n{:?}", self.job_manager, self.editor)
    }
}

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if new command entries will be added to the shell's history.
    enable_command_history: bool,

    /// Number of entries to store in the shell's command history
    command_history_capacity: usize,

    /// Upper bound on concurrently tracked jobs; exceeding it is fatal.
    job_table_capacity: usize,

    /// Determines if some messages (e.g. "exit") should be displayed.
    display_messages: bool,
}

impl ShellConfig {
    /// Creates an interactive shell configuration: command history, job
    /// control, and shutdown messages are all enabled.
    pub fn interactive(command_history_capacity: usize) -> ShellConfig {
        ShellConfig {
            enable_command_history: true,
            command_history_capacity,
            job_table_capacity: DEFAULT_JOB_TABLE_CAPACITY,
            display_messages: true,
        }
    }

    /// Creates a noninteractive shell configuration: commands are read
    /// and executed without history or shutdown messages.
    pub fn noninteractive() -> ShellConfig {
        Default::default()
    }
}

const DEFAULT_JOB_TABLE_CAPACITY: usize = 16;

impl Default for ShellConfig {
    fn default() -> ShellConfig {
        ShellConfig {
            enable_command_history: false,
            command_history_capacity: 0,
            job_table_capacity: DEFAULT_JOB_TABLE_CAPACITY,
            display_messages: false,
        }
    }
}
