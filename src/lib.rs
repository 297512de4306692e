//! Msh - M Shell
//!
//! A small interactive shell: pipelines of external commands, executed as
//! one process group per pipeline, with job control (`&`, Ctrl-Z, `jobs`,
//! `fg`, `bg`, `kill`) and persistent command history.

#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

#[macro_use]
mod macros;

pub mod core;
pub mod editor;
pub mod errors;
pub mod shell;

pub use crate::editor::Editor;
pub use crate::shell::shell::{Shell, ShellConfig};
