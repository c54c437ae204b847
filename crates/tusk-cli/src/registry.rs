//! Command registry
//!
//! Every command declares its parameter list once; the ordered list doubles
//! as the positional-argument convention for tool calls, so there is no
//! separate name-to-order table to keep in sync.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use tusk_agent::{ToolParam, ToolSpec};

use crate::context::CommandContext;

/// A declared command parameter (always string-typed on the wire)
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

/// Handler contract: positional string arguments in, text out through the
/// sink, `true` to terminate the REPL. Errors a user can act on are written
/// as plain text; an `Err` is reserved for dispatch-level failures.
pub type Handler = fn(&mut CommandContext, &[String], &mut dyn Write) -> Result<bool>;

/// A registered command
#[derive(Debug, Clone)]
pub struct Command {
    /// Canonical name including the leading slash, e.g. `/task`
    pub name: &'static str,
    pub shorthand: Option<&'static str>,
    pub description: &'static str,
    pub params: &'static [Param],
    /// Excluded from tool-schema generation (meta commands)
    pub hidden: bool,
    /// Requires confirmation when invoked through the model
    pub destructive: bool,
    pub handler: Handler,
}

impl Command {
    pub const fn new(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            shorthand: None,
            description,
            params: &[],
            hidden: false,
            destructive: false,
            handler,
        }
    }

    pub const fn with_shorthand(mut self, shorthand: &'static str) -> Self {
        self.shorthand = Some(shorthand);
        self
    }

    pub const fn with_params(mut self, params: &'static [Param]) -> Self {
        self.params = params;
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// Tool name as advertised to the model (no leading slash)
    pub fn tool_name(&self) -> &'static str {
        self.name.trim_start_matches('/')
    }

    /// Translate named tool arguments into the positional convention the
    /// handler expects: declared parameter order, absent keys skipped.
    pub fn positional_args(&self, args: &Map<String, Value>) -> Vec<String> {
        self.params
            .iter()
            .filter_map(|p| args.get(p.name))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Name-indexed command table
#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) {
        let slot = self.commands.len();
        self.index.insert(command.name.to_lowercase(), slot);
        if let Some(short) = command.shorthand {
            self.index.insert(short.to_lowercase(), slot);
        }
        self.commands.push(command);
    }

    /// Look up by name or shorthand, with or without the leading slash
    pub fn find(&self, name: &str) -> Option<&Command> {
        let name = name.to_lowercase();
        let key = if name.starts_with('/') {
            name
        } else {
            format!("/{name}")
        };
        self.index.get(&key).map(|&slot| &self.commands[slot])
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Tokenize and dispatch one input line. The command token is
    /// lowercased; arguments are passed through verbatim.
    pub fn execute(
        &self,
        input: &str,
        ctx: &mut CommandContext,
        out: &mut dyn Write,
    ) -> Result<bool> {
        let mut parts = input.split_whitespace();
        let Some(name) = parts.next() else {
            bail!("empty command");
        };
        let args: Vec<String> = parts.map(str::to_string).collect();

        match self.find(name) {
            Some(command) => (command.handler)(ctx, &args, out),
            None => bail!("unknown command: {}", name.to_lowercase()),
        }
    }

    /// Schemas for every non-hidden command. Zero-param commands omit the
    /// parameter schema entirely.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.commands
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| ToolSpec {
                name: c.tool_name().to_string(),
                description: c.description.to_string(),
                params: (!c.params.is_empty()).then(|| {
                    c.params
                        .iter()
                        .map(|p| ToolParam {
                            name: p.name.to_string(),
                            description: p.description.to_string(),
                            required: p.required,
                        })
                        .collect()
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut CommandContext, _: &[String], _: &mut dyn Write) -> Result<bool> {
        Ok(false)
    }

    fn sample_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(Command::new("/projects", "List all projects", noop));
        registry.register(
            Command::new("/task", "Add a task to a project", noop).with_params(&[
                Param::required("project_id", "The project"),
                Param::required("task_name", "The task name"),
            ]),
        );
        registry.register(Command::new("/today", "Tasks due today", noop).with_shorthand("/td"));
        registry.register(Command::new("/help", "Show help", noop).hidden());
        registry.register(
            Command::new("/deltask", "Delete a task", noop)
                .with_params(&[Param::required("task_id", "The task")])
                .destructive(),
        );
        registry
    }

    #[test]
    fn finds_by_name_shorthand_and_bare_name() {
        let registry = sample_registry();
        assert!(registry.find("/task").is_some());
        assert!(registry.find("task").is_some());
        assert!(registry.find("/TD").is_some());
        assert!(registry.find("/missing").is_none());
    }

    #[test]
    fn hidden_commands_are_not_tools() {
        let registry = sample_registry();
        let specs = registry.tool_specs();
        assert!(specs.iter().all(|s| s.name != "help"));
        assert_eq!(specs.len(), 4);
    }

    #[test]
    fn zero_param_commands_omit_parameters() {
        let registry = sample_registry();
        let specs = registry.tool_specs();
        let projects = specs.iter().find(|s| s.name == "projects").unwrap();
        assert!(projects.params.is_none());
        let task = specs.iter().find(|s| s.name == "task").unwrap();
        assert_eq!(task.params.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn positional_args_follow_declaration_order() {
        let registry = sample_registry();
        let task = registry.find("/task").unwrap();

        let mut args = Map::new();
        // Insertion order deliberately reversed
        args.insert("task_name".into(), Value::String("write report".into()));
        args.insert("project_id".into(), Value::String("abc123".into()));

        assert_eq!(
            task.positional_args(&args),
            vec!["abc123".to_string(), "write report".to_string()]
        );
    }

    #[test]
    fn positional_args_skip_absent_keys_and_stringify_scalars() {
        let registry = sample_registry();
        let task = registry.find("/task").unwrap();

        let mut args = Map::new();
        args.insert("project_id".into(), Value::from(42));
        assert_eq!(task.positional_args(&args), vec!["42".to_string()]);
    }
}
