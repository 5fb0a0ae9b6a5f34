use std::io::{self, BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Asks the user before destructive steps.
pub trait Confirm: Send + Sync {
    /// True to go ahead.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompts on stdout and reads answers from stdin until it gets `y` or `n`.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        run_blocking(|| {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            ask(prompt, &mut input, &mut io::stdout())
        })
    }
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Run a blocking read. On a multi-threaded runtime the worker hands its
/// other tasks off first; a current-thread runtime has nowhere to move them.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Prompt loop shared by interactive confirmers. End of input counts as no.
fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> bool {
    let mut line = String::new();
    loop {
        let _ = write!(output, "{} [y/n] ", prompt);
        let _ = output.flush();

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => continue,
        }
    }
}
