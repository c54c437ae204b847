//! Output capture
//!
//! Commands talk to the world by writing text to an injected sink, so
//! capturing a command means pointing that sink at an in-memory buffer.
//! Nothing process-global is redirected and there is no pipe to drain, so
//! capture cannot deadlock and concurrent tests never race on stdout.

use std::io::Write;

use anyhow::Result;

use crate::context::CommandContext;

/// Run `f` against a buffer sink and return its result together with the
/// trimmed captured text.
pub fn capture<T>(f: impl FnOnce(&mut dyn Write) -> T) -> (T, String) {
    let mut buf: Vec<u8> = Vec::new();
    let value = f(&mut buf);
    let output = String::from_utf8_lossy(&buf).trim().to_string();
    (value, output)
}

/// Execute one command line with its output captured. Returns the quit flag
/// and the trimmed output.
pub fn run_captured(ctx: &mut CommandContext, input: &str) -> Result<(bool, String)> {
    let registry = ctx.registry.clone();
    let (result, output) = capture(|out| registry.execute(input, ctx, out));
    Ok((result?, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_and_trims() {
        let ((), output) = capture(|out| {
            writeln!(out, "  hello").unwrap();
            writeln!(out, "world  ").unwrap();
        });
        assert_eq!(output, "hello\nworld");
    }

    #[test]
    fn empty_output_is_empty_string() {
        let ((), output) = capture(|_| {});
        assert_eq!(output, "");
    }

    #[test]
    fn result_passes_through() {
        let (value, output) = capture(|out| {
            write!(out, "forty-two").unwrap();
            42
        });
        assert_eq!(value, 42);
        assert_eq!(output, "forty-two");
    }
}
