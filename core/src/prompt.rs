use std::io::BufRead;
use std::io::Write;

use crate::error::Result;
use crate::error::UpdaterErr;

/// Blocks until the operator sends a line of input. The content does not
/// matter; it is an acknowledgement, not an answer.
pub fn wait_for_acknowledgement(input: &mut impl BufRead) -> Result<()> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Asks `question` and reads a single y/n answer. Anything that is not a
/// case-insensitive y/yes/n/no is fatal rather than silently defaulting.
pub fn confirm(question: &str, input: &mut impl BufRead) -> Result<bool> {
    print!("{question} [y/n] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    parse_yes_no(&line)
}

fn parse_yes_no(answer: &str) -> Result<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => Err(UpdaterErr::InvalidResponse {
            input: answer.trim().to_string(),
        }),
    }
}
