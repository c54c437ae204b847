//! Read-eval-print loop
//!
//! Bare lines become `/chat` turns. Direct commands run with output
//! captured so the exchange can be replayed into the chat history, keeping
//! the assistant aware of what the user did between turns.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::capture::run_captured;
use crate::context::CommandContext;

pub fn run(ctx: &mut CommandContext) -> Result<()> {
    println!("Welcome to Tusk! Type /help for available commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // A bare line is an implicit chat message
        let input = if input.starts_with('/') {
            input.to_string()
        } else {
            format!("/chat {input}")
        };

        if is_chat_command(&input) {
            // Chat writes straight to the terminal: tool output, confirmation
            // prompts and the final text interleave live
            let registry = ctx.registry.clone();
            match registry.execute(&input, ctx, &mut stdout) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => println!("Error: {err}"),
            }
            continue;
        }

        match run_captured(ctx, &input) {
            Ok((quit, output)) => {
                if !output.is_empty() {
                    println!("{output}");
                }
                // Keep the assistant in the loop about direct commands
                if let Some(chat) = ctx.chat.as_mut() {
                    chat.session.record_command(&input, &output);
                }
                if quit {
                    break;
                }
            }
            Err(err) => println!("Error: {err}"),
        }
    }

    Ok(())
}

fn is_chat_command(input: &str) -> bool {
    let name = input.split_whitespace().next().unwrap_or_default();
    name.eq_ignore_ascii_case("/chat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_detection() {
        assert!(is_chat_command("/chat hello"));
        assert!(is_chat_command("/CHAT hello"));
        assert!(!is_chat_command("/chatter on"));
        assert!(!is_chat_command("/projects"));
    }
}
