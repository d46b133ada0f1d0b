//! Line-oriented terminal output sink.
//!
//! Every user-visible line the client produces goes through [`Ui`]. The
//! terminal implementation writes ordinary output to stdout, warnings to
//! stderr, and reads prompt answers from an injectable line reader.

use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

const UI_TARGET: &str = "nozzle::ui";

/// Output capability shared by the client, the pump, and the debug printer.
#[cfg_attr(test, mockall::automock)]
pub trait Ui: Send + Sync {
    /// Prints one line of ordinary output.
    fn say(&self, line: &str);

    /// Prints one warning line.
    fn warn(&self, line: &str);

    /// Shows `prompt` and reads one line of input without its line ending.
    ///
    /// End of input yields an empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error when the prompt cannot be written or the input cannot
    /// be read.
    fn ask(&self, prompt: &str) -> io::Result<String>;
}

/// [`Ui`] over a line reader and a pair of writers.
pub struct TerminalUi<R, W, E> {
    input: Mutex<R>,
    stdout: Mutex<W>,
    stderr: Mutex<E>,
}

impl<R, W, E> TerminalUi<R, W, E>
where
    R: BufRead + Send,
    W: Write + Send,
    E: Write + Send,
{
    /// Builds a sink reading answers from `input`.
    pub const fn new(input: R, stdout: W, stderr: E) -> Self {
        Self {
            input: Mutex::new(input),
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
        }
    }

    /// Returns the writers, dropping the reader.
    pub fn into_writers(self) -> (W, E) {
        (
            self.stdout.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.stderr.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_line(writer: &mut impl Write, line: &str) -> io::Result<()> {
    writeln!(writer, "{line}")?;
    writer.flush()
}

impl<R, W, E> Ui for TerminalUi<R, W, E>
where
    R: BufRead + Send,
    W: Write + Send,
    E: Write + Send,
{
    fn say(&self, line: &str) {
        if let Err(error) = write_line(&mut *lock(&self.stdout), line) {
            warn!(target: UI_TARGET, %error, "failed to write to stdout");
        }
    }

    fn warn(&self, line: &str) {
        if let Err(error) = write_line(&mut *lock(&self.stderr), line) {
            warn!(target: UI_TARGET, %error, "failed to write to stderr");
        }
    }

    fn ask(&self, prompt: &str) -> io::Result<String> {
        {
            let mut stdout = lock(&self.stdout);
            write!(stdout, "{prompt}\n> ")?;
            stdout.flush()?;
        }
        let mut answer = String::new();
        lock(&self.input).read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn terminal(input: &str) -> TerminalUi<Cursor<Vec<u8>>, Vec<u8>, Vec<u8>> {
        TerminalUi::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Vec::new())
    }

    #[test]
    fn say_and_warn_use_separate_streams() {
        let ui = terminal("");
        ui.say("hello");
        ui.warn("careful");
        let (stdout, stderr) = ui.into_writers();
        assert_eq!(String::from_utf8(stdout).expect("utf8"), "hello\n");
        assert_eq!(String::from_utf8(stderr).expect("utf8"), "careful\n");
    }

    #[test]
    fn ask_prints_prompt_and_strips_line_ending() {
        let ui = terminal("5\r\nignored\n");
        let answer = ui.ask("Pick one").expect("answer");
        assert_eq!(answer, "5");
        let (stdout, _) = ui.into_writers();
        assert_eq!(String::from_utf8(stdout).expect("utf8"), "Pick one\n> ");
    }

    #[test]
    fn ask_at_end_of_input_is_empty() {
        let ui = terminal("");
        assert_eq!(ui.ask("Pick one").expect("answer"), "");
    }
}
