//! Chat commands and the registry-backed tool dispatcher
//!
//! `/chat` drives a full tool-calling turn; `/usage` and `/clearchat` are
//! session bookkeeping. The dispatcher executes tool calls through the same
//! registry the REPL uses, with output captured and echoed as it happens.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::debug;

use tusk_agent::{Confirmer, SessionUsage, ToolDispatcher, ToolSpec, Usage};
use tusk_core::Store;

use crate::capture::run_captured;
use crate::context::CommandContext;
use crate::registry::{Command, Param, Registry};

pub fn register(registry: &mut Registry) {
    registry.register(
        Command::new("/chat", "Chat with the AI assistant", chat)
            .with_params(&[Param::required(
                "message",
                "The message to send to the assistant",
            )])
            .hidden(),
    );
    registry.register(
        Command::new("/clearchat", "Clear the chat conversation history", clear).hidden(),
    );
    registry.register(
        Command::new("/usage", "Show session token usage and cost statistics", usage).hidden(),
    );
}

/// Executes model tool calls against the command registry
pub struct RegistryDispatcher {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    runtime: tokio::runtime::Handle,
    debug: bool,
}

impl RegistryDispatcher {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn Store>,
        runtime: tokio::runtime::Handle,
        debug: bool,
    ) -> Self {
        Self {
            registry,
            store,
            runtime,
            debug,
        }
    }
}

impl std::fmt::Debug for RegistryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryDispatcher")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl ToolDispatcher for RegistryDispatcher {
    fn tool_specs(&self) -> Vec<ToolSpec> {
        self.registry.tool_specs()
    }

    fn is_destructive(&self, name: &str) -> bool {
        self.registry.find(name).map_or(false, |c| c.destructive)
    }

    fn describe_destructive(&self, name: &str, args: &Map<String, Value>) -> String {
        match name.trim_start_matches('/') {
            "delproject" => {
                let Some(token) = args.get("project_id").and_then(Value::as_str) else {
                    return String::new();
                };
                let Ok(project) = self
                    .store
                    .resolve_project_id(token)
                    .and_then(|id| self.store.get_project(&id))
                else {
                    return format!("project '{token}'");
                };
                let tasks = self.store.list_tasks(&project.id).unwrap_or_default();
                if tasks.is_empty() {
                    format!("project '{}'", project.name)
                } else {
                    format!("project '{}' and its {} task(s)", project.name, tasks.len())
                }
            }
            "deltask" => {
                let Some(token) = args.get("task_id").and_then(Value::as_str) else {
                    return String::new();
                };
                match self
                    .store
                    .resolve_task_id(token)
                    .and_then(|id| self.store.get_task(&id))
                {
                    Ok(task) => format!("task '{}'", task.name),
                    Err(_) => format!("task '{token}'"),
                }
            }
            _ => String::new(),
        }
    }

    fn execute(&self, name: &str, args: &Map<String, Value>) -> String {
        let Some(command) = self.registry.find(name) else {
            return format!("Error: unknown command: {name}");
        };

        let mut input = command.name.to_string();
        for arg in command.positional_args(args) {
            input.push(' ');
            input.push_str(&arg);
        }

        if self.debug {
            println!("[debug] tool call: {input}");
        }
        debug!(tool = name, "executing tool call");

        // Tools run against a bare context: no chat state, so a tool can
        // never recurse into another chat turn.
        let mut ctx = CommandContext {
            store: self.store.clone(),
            registry: self.registry.clone(),
            runtime: self.runtime.clone(),
            chat: None,
            debug: false,
        };

        match run_captured(&mut ctx, &input) {
            Ok((_quit, output)) => {
                // Print immediately so the user sees progress mid-turn
                if !output.is_empty() {
                    println!("{output}");
                }
                output
            }
            Err(err) => format!("Error: {err}"),
        }
    }
}

/// Reads the destructive-action confirmation from the terminal
#[derive(Debug)]
pub struct CliConfirmer;

impl Confirmer for CliConfirmer {
    fn confirm(&self, description: &str) -> bool {
        let description = if description.is_empty() {
            "this item"
        } else {
            description
        };
        print!("\nConfirm delete {description}? [y/N]: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_ok() {
            let answer = line.trim().to_lowercase();
            if answer == "y" || answer == "yes" {
                return true;
            }
        }
        println!("Cancelled.");
        false
    }
}

fn chat(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /chat <message>")?;
        return Ok(false);
    }

    let registry = ctx.registry.clone();
    let store = ctx.store.clone();
    let runtime = ctx.runtime.clone();
    let debug = ctx.debug;

    let Some(chat) = ctx.chat.as_mut() else {
        writeln!(
            out,
            "Error: LLM client not available. Set OPENROUTER_API_KEY or GEMINI_API_KEY."
        )?;
        return Ok(false);
    };

    let message = args.join(" ");
    let dispatcher = RegistryDispatcher::new(registry, store, runtime.clone(), debug);
    let backend = chat.backend.clone();

    let result = runtime.block_on(chat.session.chat(
        &message,
        backend.as_ref(),
        &dispatcher,
        &CliConfirmer,
    ));

    match result {
        Ok(outcome) => {
            // Tool outputs were already echoed; this is the supplementary text
            if !outcome.text.trim().is_empty() {
                writeln!(out, "{}", outcome.text)?;
            }
            write_usage_line(out, &outcome.usage)?;
        }
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}

fn clear(ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    if let Some(chat) = ctx.chat.as_mut() {
        chat.session.clear();
    }
    writeln!(out, "Chat history cleared.")?;
    Ok(false)
}

fn usage(ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    let totals = match ctx.chat.as_ref().map(|c| c.session.usage()) {
        Some(totals) if totals.prompts > 0 => totals,
        _ => {
            writeln!(out, "No chat usage in this session yet.")?;
            return Ok(false);
        }
    };

    writeln!(out, "Session Usage Statistics:")?;
    writeln!(out, "  Prompts:       {}", totals.prompts)?;
    writeln!(out, "  Input tokens:  {}", totals.input_tokens)?;
    writeln!(out, "  Output tokens: {}", totals.output_tokens)?;
    writeln!(out, "  Total tokens:  {}", totals.total_tokens())?;
    write_total_cost(out, &totals)?;
    Ok(false)
}

/// Per-turn `[Tokens: ... | Cost: ...]` footer. Always shown, even for
/// zero-token turns, so silent failures stay visible.
fn write_usage_line(out: &mut dyn Write, usage: &Usage) -> io::Result<()> {
    writeln!(out)?;
    write!(
        out,
        "[Tokens: {} in / {} out",
        usage.input_tokens, usage.output_tokens
    )?;
    if usage.cost > 0.0 {
        if usage.cost < 0.01 {
            write!(out, " | Cost: ${:.6}", usage.cost)?;
        } else {
            write!(out, " | Cost: ${:.4}", usage.cost)?;
        }
    } else {
        write!(out, " | Cost: no data")?;
    }
    writeln!(out, "]")
}

fn write_total_cost(out: &mut dyn Write, totals: &SessionUsage) -> io::Result<()> {
    if totals.cost > 0.0 {
        if totals.cost < 0.01 {
            writeln!(out, "  Total cost:    ${:.6}", totals.cost)
        } else {
            writeln!(out, "  Total cost:    ${:.4}", totals.cost)
        }
    } else {
        writeln!(out, "  Total cost:    no data")
    }
}
