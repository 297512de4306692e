use crate::shell::builtins::{self, prelude::*};

pub struct History;

impl builtins::BuiltinCommand for History {
    const NAME: &'static str = builtins::HISTORY_NAME;

    const HELP: &'static str = "\
history: history [-c]
    Display the history list with line numbers. The `-c' option causes
    the history list to be cleared by deleting all of the entries.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        match args.first().map(AsRef::as_ref) {
            None => {
                write!(stdout, "{}", shell.editor).context(ErrorKind::Io)?;
                Ok(())
            }
            Some("-c") => {
                shell.editor.clear_history();
                Ok(())
            }
            Some(arg) => Err(Error::builtin_command(
                format!("history: {}: unknown argument", arg),
                1,
            )),
        }
    }
}
