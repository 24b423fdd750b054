//! View command - interactive preview window.

use anyhow::{Result, bail};
use ifx_compute::Backend;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::trace;

use crate::ViewArgs;

const SAVE_PROMPT: &str = "Do you want to save it? (y/n): ";

/// First `y` or `n` in the line, if any.
fn parse_answer(line: &str) -> Option<bool> {
    line.chars().find_map(|c| match c {
        'y' => Some(true),
        'n' => Some(false),
        _ => None,
    })
}

/// Asks until a `y` or `n` arrives. End of input means no.
pub fn confirm_save<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<bool> {
    write!(output, "{SAVE_PROMPT}")?;
    output.flush()?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        if let Some(answer) = parse_answer(&line) {
            return Ok(answer);
        }
    }
}

pub fn run(args: ViewArgs, backend: Backend, kernels: Option<&Path>) -> Result<()> {
    trace!(input = %args.input.display(), "view::run");

    let image = super::load_image(&args.input)?;
    let processor = super::open_processor(backend, kernels, &image)?;

    let outcome = ifx_view::run(image, processor, ifx_view::ViewerConfig::default());
    if outcome.exit_code != 0 {
        bail!("viewer exited with code {}", outcome.exit_code);
    }

    if confirm_save(io::stdin().lock(), io::stdout())? {
        super::save_image(&args.output, &outcome.image)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let answer = confirm_save(input.as_bytes(), &mut out).unwrap();
        (answer, String::from_utf8(out).unwrap())
    }

    #[test]
    fn yes_and_no() {
        assert_eq!(ask("y\n"), (true, SAVE_PROMPT.to_string()));
        assert!(!ask("n\n").0);
    }

    #[test]
    fn reasks_until_valid() {
        assert!(ask("maybe\n\nx\ny\n").0);
        assert!(!ask("?\nno\n").0);
    }

    #[test]
    fn eof_means_no() {
        assert!(!ask("").0);
        assert!(!ask("what\n").0);
    }
}
