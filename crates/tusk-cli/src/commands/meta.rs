//! Meta commands: /help, /quit, /exit, /echo, /debug

use std::io::Write;

use anyhow::Result;

use crate::context::CommandContext;
use crate::registry::{Command, Registry};

pub fn register(registry: &mut Registry) {
    registry.register(Command::new("/help", "Show available commands", help).hidden());
    registry.register(Command::new("/quit", "Exit Tusk", quit).hidden());
    registry.register(Command::new("/exit", "Exit Tusk", quit).hidden());
    registry.register(Command::new("/echo", "Echo your message", echo).hidden());
    registry.register(
        Command::new("/debug", "Toggle debug mode for LLM interactions", debug).hidden(),
    );
}

fn help(ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    let registry = ctx.registry.clone();
    let mut commands: Vec<_> = registry.commands().iter().collect();
    commands.sort_by_key(|c| c.name);

    writeln!(out, "Available commands:")?;
    for command in commands {
        writeln!(out, "  {:<15} - {}", command.name, command.description)?;
    }
    Ok(false)
}

fn quit(_ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    writeln!(out, "Goodbye!")?;
    Ok(true)
}

fn echo(_ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    writeln!(out, "{}", args.join(" "))?;
    Ok(false)
}

fn debug(ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    ctx.debug = !ctx.debug;
    if ctx.debug {
        writeln!(out, "Debug mode: ON")?;
    } else {
        writeln!(out, "Debug mode: OFF")?;
    }
    Ok(false)
}
