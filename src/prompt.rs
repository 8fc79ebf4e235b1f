use anyhow::Result;
use std::io::{BufRead, Write};

/// Console questions for values missing from the command line. A disabled
/// prompter answers every question with "nothing typed".
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    enabled: bool,
}

impl Prompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio(enabled: bool) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), enabled)
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, enabled: bool) -> Self {
        Self { input, output, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Trimmed answer; `None` when disabled or stdin is closed.
    pub fn ask(&mut self, question: &str) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// `[S/n]` style question when `default_yes`, `[s/N]` otherwise. Accepts
    /// Spanish and English affirmatives.
    pub fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool> {
        let Some(answer) = self.ask(question)? else {
            return Ok(false);
        };
        Ok(is_yes(&answer, default_yes))
    }
}

pub fn is_yes(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "" => default_yes,
        "s" | "si" | "sí" | "y" | "yes" => true,
        _ => false,
    }
}
