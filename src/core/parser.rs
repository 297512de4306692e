//! Msh Parser
//!
//! Turns one raw input line into a [`Pipeline`]: an ordered sequence of
//! commands connected by pipes, plus a background marker.
//!
//! The dialect is deliberately minimal: whitespace separates arguments,
//! `|` separates pipeline stages, and a trailing `&` backgrounds the
//! pipeline. Quote characters are treated as plain whitespace; there are
//! no nested-quote semantics.

use crate::errors::{Error, Result};

/// A single stage of a pipeline: the program name followed by its
/// arguments. Immutable once parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    argv: Vec<String>,
}

impl Command {
    /// The program to execute.
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The arguments to the program, not including the program itself.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The full argument vector, program first. Never empty.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// One evaluated input line: one or more commands connected by pipes,
/// executed as a unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pipeline {
    /// The pipeline stages, in left-to-right order.
    pub commands: Vec<Command>,
    /// Whether the pipeline runs in the background.
    pub background: bool,
    input: String,
}

impl Pipeline {
    /// Parses an input line into a `Pipeline`.
    ///
    /// Fails with `EmptyCommand` if the line, or any pipe-delimited stage
    /// of it, contains no tokens; callers treat that as an ignorable line.
    /// A trailing `&`, either standalone or glued to the last argument, is
    /// recognized as the background marker and stripped.
    ///
    /// # Examples
    ///
    /// ```
    /// use msh::core::parser::Pipeline;
    ///
    /// let pipeline = Pipeline::parse("echo hi | cat").unwrap();
    /// assert_eq!(pipeline.commands.len(), 2);
    /// assert_eq!(pipeline.commands[0].program(), "echo");
    /// assert!(!pipeline.background);
    /// ```
    pub fn parse(input: &str) -> Result<Pipeline> {
        // Quotes are whitespace-equivalent in this dialect.
        let cleaned: String = input
            .chars()
            .map(|c| if c == '\'' || c == '"' { ' ' } else { c })
            .collect();

        let segments: Vec<&str> = cleaned.split('|').collect();
        let last = segments.len() - 1;

        let mut commands = Vec::with_capacity(segments.len());
        let mut background = false;
        for (i, segment) in segments.iter().enumerate() {
            let mut argv: Vec<String> = segment.split_whitespace().map(str::to_owned).collect();
            if i == last {
                background = strip_background_marker(&mut argv);
            }
            if argv.is_empty() {
                return Err(Error::empty_command());
            }
            commands.push(Command { argv });
        }

        let input = commands
            .iter()
            .map(|c| c.argv.join(" "))
            .collect::<Vec<_>>()
            .join(" | ");
        Ok(Pipeline {
            commands,
            background,
            input,
        })
    }

    /// The reconstructed human-readable command line, used for display and
    /// for `fg`/`bg` re-issue.
    pub fn input(&self) -> &str {
        &self.input
    }
}

fn strip_background_marker(argv: &mut Vec<String>) -> bool {
    match argv.last_mut() {
        Some(last) if last == "&" => {
            argv.pop();
            true
        }
        Some(last) if last.ends_with('&') => {
            let len = last.len() - 1;
            last.truncate(len);
            true
        }
        _ => false,
    }
}
