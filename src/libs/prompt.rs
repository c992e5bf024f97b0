// Yes/no confirmation before optional downloads.
// The setup flow only sees the `Confirmation` trait, so tests pass a closure
// with a fixed answer and the CLI passes `ConsolePrompt`.

use crate::log_warn;
use dialoguer::Input;
use std::io;

/// Answers a yes/no question.
pub trait Confirmation {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Interprets a reply by its first non-blank character: `y` or `n`, any case.
/// Anything else (including an empty reply) means "ask again".
pub fn parse_reply(reply: &str) -> Option<bool> {
    match reply.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('y') => Some(true),
        Some('n') => Some(false),
        _ => None,
    }
}

/// Keeps calling `read_reply` until it yields a `y`/`n` answer.
/// A read error ends the loop with "no".
pub fn ask_until_answered(mut read_reply: impl FnMut() -> io::Result<String>) -> bool {
    loop {
        match read_reply() {
            Ok(reply) => {
                if let Some(answer) = parse_reply(&reply) {
                    return answer;
                }
            }
            Err(e) => {
                log_warn!("[Prompt] Could not read an answer ({}). Treating it as 'no'.", e);
                return false;
            }
        }
    }
}

/// Asks on the terminal with dialoguer.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl Confirmation for ConsolePrompt {
    fn confirm(&mut self, question: &str) -> bool {
        let prompt = format!("{question} [Y/N]");
        ask_until_answered(|| {
            Input::<String>::new()
                .with_prompt(&prompt)
                .allow_empty(true)
                .interact_text()
                .map_err(io::Error::other)
        })
    }
}
