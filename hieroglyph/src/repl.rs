//! Line-oriented composition loop.
//!
//! Commands, one per line:
//!
//! ```text
//! 12      append grapheme "12"
//! -2      remove the 2nd selected grapheme
//! =       confirm (resolve) the selection
//! !       clear the selection
//! q       quit
//! ```

use std::io::{BufRead, Write};

use anyhow::Result;
use libhieroglyph_core::{
    CompositionContext, CompositionSession, Confirmation, GlyphIndex,
};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Append(String),
    /// 1-based position as typed by the user.
    Remove(usize),
    Confirm,
    Clear,
    Quit,
}

/// Parse one input line; `None` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let cmd = match line {
        "" => return Ok(None),
        "=" => Command::Confirm,
        "!" => Command::Clear,
        "q" | "quit" | "exit" => Command::Quit,
        _ => match line.strip_prefix('-') {
            Some(pos) => {
                let pos: usize = pos.trim().parse()?;
                anyhow::ensure!(pos > 0, "positions start at 1");
                Command::Remove(pos)
            }
            None => Command::Append(line.to_string()),
        },
    };
    Ok(Some(cmd))
}

fn print_state<W: Write>(out: &mut W, context: &CompositionContext) -> Result<()> {
    writeln!(out, "selected:   [{}]", context.selection.join(" "))?;
    if context.candidates.is_empty() {
        writeln!(out, "candidates: (none)")?;
    } else {
        writeln!(out, "candidates: {}", context.candidates.join(" "))?;
    }
    if !context.auxiliary_text.is_empty() {
        writeln!(out, "{}", context.auxiliary_text)?;
    }
    Ok(())
}

/// Drive `session` from `input` until EOF or `q`, echoing state to `out`.
/// Returns the committed text.
pub fn run<G, R, W>(session: &mut CompositionSession<G>, input: R, mut out: W) -> Result<String>
where
    G: GlyphIndex,
    R: BufRead,
    W: Write,
{
    let mut context = CompositionContext::new();
    session.sync_to_context(&mut context);
    print_state(&mut out, &context)?;

    for line in input.lines() {
        let command = match parse_command(&line?) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };

        match command {
            Command::Append(id) => {
                if let Err(e) = session.append(&id) {
                    writeln!(out, "error: {}", e)?;
                }
            }
            Command::Remove(pos) => {
                if let Err(e) = session.remove_at(pos - 1) {
                    writeln!(out, "error: {}", e)?;
                }
            }
            Command::Confirm => {
                if let Confirmation::Resolved(text) = session.confirm() {
                    writeln!(out, "=> {}", text)?;
                }
            }
            Command::Clear => session.clear(),
            Command::Quit => break,
        }

        session.sync_to_context(&mut context);
        print_state(&mut out, &context)?;
    }

    Ok(session.take_committed())
}
