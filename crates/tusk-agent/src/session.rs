//! Conversational tool-calling engine
//!
//! A [`ChatSession`] owns the role-tagged history and session usage totals
//! for one process run. Each chat turn walks the loop: send history plus
//! tool schemas, execute any tool calls through the dispatcher (destructive
//! ones behind the confirmer), feed results back, repeat until the model
//! answers with plain text. The loop is bounded so a backend that never
//! stops calling tools cannot spin forever.

use anyhow::Result;
use chrono::Local;
use tracing::{debug, warn};

use crate::backend::ChatBackend;
use crate::dispatch::{Confirmer, ToolDispatcher};
use crate::error::AgentError;
use crate::types::{ChatOutcome, Message, Role, Usage};

/// Hard cap on request rounds within a single chat turn
pub const MAX_TOOL_ROUNDS: usize = 10;

/// Marker for directly-typed commands injected into the history
const COMMAND_CONTEXT_PREFIX: &str = "[Command executed]";

/// How many injected command-context entries to keep
const MAX_COMMAND_CONTEXT_ENTRIES: usize = 10;

/// Cumulative token/cost accounting across all chat turns of a session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionUsage {
    pub prompts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

impl SessionUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// In-memory conversation state for the `/chat` surface
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Message>,
    usage: SessionUsage,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all history and start the next turn from a fresh system prompt
    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn usage(&self) -> SessionUsage {
        self.usage
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Inject a directly-typed command and its output as a synthetic
    /// user/assistant exchange, so the model keeps context across non-chat
    /// interactions. Old entries are trimmed pairwise to keep roles
    /// alternating.
    pub fn record_command(&mut self, command: &str, output: &str) {
        self.ensure_system_prompt();
        self.history.push(Message::user(format!(
            "{COMMAND_CONTEXT_PREFIX} {command}\nResult: {output}"
        )));
        self.history.push(Message::assistant("Noted."));
        self.trim_command_context();
    }

    /// Run one chat turn to completion.
    ///
    /// Backend failures abort the turn; everything appended to the history
    /// before the failing request stays committed. A declined destructive
    /// call short-circuits only that invocation.
    pub async fn chat(
        &mut self,
        message: &str,
        backend: &dyn ChatBackend,
        dispatcher: &dyn ToolDispatcher,
        confirmer: &dyn Confirmer,
    ) -> Result<ChatOutcome> {
        self.ensure_system_prompt();
        self.history.push(Message::user(message));

        let tools = dispatcher.tool_specs();
        let mut turn_usage = Usage::default();
        let mut narrated = String::new();
        let mut tools_ran = 0usize;

        for round in 0..MAX_TOOL_ROUNDS {
            let reply = backend.send(&self.history, &tools).await?;
            turn_usage.accumulate(&reply.usage);
            debug!(
                round,
                tool_calls = reply.tool_calls.len(),
                finish_reason = %reply.finish_reason,
                "backend reply"
            );

            if !reply.text.is_empty() {
                if !narrated.is_empty() {
                    narrated.push(' ');
                }
                narrated.push_str(&reply.text);
            }

            if reply.tool_calls.is_empty() {
                return self.finalize(narrated, reply.finish_reason, turn_usage, tools_ran);
            }

            self.history.push(Message {
                role: Role::Assistant,
                content: reply.text,
                tool_calls: reply.tool_calls.clone(),
                tool_call_id: None,
            });

            for call in &reply.tool_calls {
                let result = if dispatcher.is_destructive(&call.name) {
                    let description = dispatcher.describe_destructive(&call.name, &call.arguments);
                    if confirmer.confirm(&description) {
                        dispatcher.execute(&call.name, &call.arguments)
                    } else {
                        "Action cancelled by user.".to_string()
                    }
                } else {
                    dispatcher.execute(&call.name, &call.arguments)
                };
                tools_ran += 1;
                self.history.push(Message::tool(result, call.id.clone()));
            }
        }

        warn!(
            backend = backend.name(),
            "backend still calling tools after {MAX_TOOL_ROUNDS} rounds"
        );
        Err(AgentError::ToolLoopOverflow(MAX_TOOL_ROUNDS).into())
    }

    fn finalize(
        &mut self,
        narrated: String,
        finish_reason: String,
        turn_usage: Usage,
        tools_ran: usize,
    ) -> Result<ChatOutcome> {
        let mut text = narrated.trim().to_string();

        // Tool outputs were already printed as they happened; a bare
        // confirmation is enough when the model narrated nothing.
        if text.is_empty() && tools_ran > 0 {
            text = "Done.".to_string();
        }

        if text.is_empty() && tools_ran == 0 && turn_usage.input_tokens == 0 {
            return Err(AgentError::EmptyResponse.into());
        }

        self.history.push(Message::assistant(text.clone()));

        if !turn_usage.is_zero() {
            self.usage.prompts += 1;
            self.usage.input_tokens += turn_usage.input_tokens;
            self.usage.output_tokens += turn_usage.output_tokens;
            self.usage.cost += turn_usage.cost;
        }

        Ok(ChatOutcome {
            text,
            finish_reason,
            usage: turn_usage,
        })
    }

    fn ensure_system_prompt(&mut self) {
        if self.history.is_empty() {
            self.history.push(Message::system(system_prompt()));
        }
    }

    fn trim_command_context(&mut self) {
        let count = self
            .history
            .iter()
            .filter(|m| m.content.starts_with(COMMAND_CONTEXT_PREFIX))
            .count();
        if count <= MAX_COMMAND_CONTEXT_ENTRIES {
            return;
        }

        let mut to_remove = count - MAX_COMMAND_CONTEXT_ENTRIES;
        let mut trimmed = Vec::with_capacity(self.history.len());
        let mut skip_ack = false;
        for msg in self.history.drain(..) {
            if skip_ack {
                skip_ack = false;
                continue;
            }
            if to_remove > 0 && msg.content.starts_with(COMMAND_CONTEXT_PREFIX) {
                to_remove -= 1;
                // Drop the paired "Noted." too so roles keep alternating
                skip_ack = true;
                continue;
            }
            trimmed.push(msg);
        }
        self.history = trimmed;
    }
}

/// System prompt seeded lazily at the start of a conversation. Regenerated
/// per session so the embedded date stays current.
fn system_prompt() -> String {
    let now = Local::now();
    let today = now.format("%Y-%m-%d");
    let weekday = now.format("%A");

    format!(
        "You are a helpful task management assistant for Tusk, a terminal-based task manager.\n\
         \n\
         TODAY'S DATE: {today} ({weekday})\n\
         \n\
         IMPORTANT RULES:\n\
         1. When a user refers to a project by NAME (not ID), FIRST call \"projects\" to find the ID, then use that ID.\n\
         2. When a user refers to a task by NAME, FIRST call the listing tool to find the task's ID.\n\
         3. NEVER ask the user for an ID. Always look it up using available tools.\n\
         4. When users refer to \"that task\" or \"the project I just created\", use context from {COMMAND_CONTEXT_PREFIX} messages.\n\
         5. When setting due dates: \"today\" = {today}, \"tomorrow\" = the next day, etc.\n\
         6. Tool outputs are ALREADY shown to the user. After using tools, just say \"Done.\" or give a one-sentence summary. Do NOT repeat or list the tool output.\n\
         7. Be concise since this is a terminal application."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendReply;
    use crate::types::{ToolCall, ToolSpec};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a fixed script of replies
    struct ScriptedBackend {
        replies: Mutex<Vec<BackendReply>>,
        requests: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(mut replies: Vec<BackendReply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                requests: AtomicUsize::new(0),
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, _: &[Message], _: &[ToolSpec]) -> Result<BackendReply> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match self.replies.lock().unwrap().pop() {
                Some(reply) => Ok(reply),
                // Past the script: keep issuing tool calls forever
                None => Ok(tool_call_reply("loop", "endless")),
            }
        }
    }

    /// Dispatcher that records executions instead of running anything
    #[derive(Default)]
    struct RecordingDispatcher {
        destructive: Vec<String>,
        executed: Mutex<Vec<String>>,
    }

    impl ToolDispatcher for RecordingDispatcher {
        fn tool_specs(&self) -> Vec<ToolSpec> {
            Vec::new()
        }

        fn is_destructive(&self, name: &str) -> bool {
            self.destructive.iter().any(|d| d == name)
        }

        fn describe_destructive(&self, _: &str, _: &Map<String, Value>) -> String {
            "project 'Work' and its 3 task(s)".to_string()
        }

        fn execute(&self, name: &str, _: &Map<String, Value>) -> String {
            self.executed.lock().unwrap().push(name.to_string());
            format!("ran {name}")
        }
    }

    struct Always(bool);

    impl Confirmer for Always {
        fn confirm(&self, _: &str) -> bool {
            self.0
        }
    }

    fn text_reply(text: &str) -> BackendReply {
        BackendReply {
            text: text.to_string(),
            finish_reason: "stop".into(),
            usage: Usage {
                input_tokens: 100,
                output_tokens: 20,
                total_tokens: 120,
                cost: 0.0004,
            },
            ..BackendReply::default()
        }
    }

    fn tool_call_reply(id: &str, name: &str) -> BackendReply {
        BackendReply {
            tool_calls: vec![ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: Map::new(),
            }],
            finish_reason: "tool_calls".into(),
            usage: Usage {
                input_tokens: 100,
                output_tokens: 10,
                total_tokens: 110,
                cost: 0.0002,
            },
            ..BackendReply::default()
        }
    }

    #[tokio::test]
    async fn converges_after_one_tool_call() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("call-1", "projects"),
            text_reply("You have two projects."),
        ]);
        let dispatcher = RecordingDispatcher::default();
        let mut session = ChatSession::new();

        let outcome = session
            .chat("list my projects", &backend, &dispatcher, &Always(true))
            .await
            .unwrap();

        assert_eq!(outcome.text, "You have two projects.");
        assert_eq!(backend.requests(), 2);
        assert_eq!(*dispatcher.executed.lock().unwrap(), vec!["projects"]);

        // system, user, assistant(tool call), tool result, final assistant
        let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant
            ]
        );
        assert_eq!(session.history()[3].tool_call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_the_round_cap() {
        let backend = ScriptedBackend::new(Vec::new());
        let dispatcher = RecordingDispatcher::default();
        let mut session = ChatSession::new();

        let err = session
            .chat("spin", &backend, &dispatcher, &Always(true))
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<AgentError>(),
            Some(&AgentError::ToolLoopOverflow(MAX_TOOL_ROUNDS))
        );
        assert_eq!(backend.requests(), MAX_TOOL_ROUNDS);
    }

    #[tokio::test]
    async fn declined_destructive_call_is_cancelled_not_executed() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("call-1", "delproject"),
            text_reply("Okay, left it alone."),
        ]);
        let dispatcher = RecordingDispatcher {
            destructive: vec!["delproject".into()],
            ..RecordingDispatcher::default()
        };
        let mut session = ChatSession::new();

        let outcome = session
            .chat("delete work", &backend, &dispatcher, &Always(false))
            .await
            .unwrap();

        assert!(dispatcher.executed.lock().unwrap().is_empty());
        assert_eq!(outcome.text, "Okay, left it alone.");
        let cancelled = session
            .history()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(cancelled.content, "Action cancelled by user.");
    }

    #[tokio::test]
    async fn confirmed_destructive_call_executes() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("call-1", "delproject"),
            text_reply(""),
        ]);
        let dispatcher = RecordingDispatcher {
            destructive: vec!["delproject".into()],
            ..RecordingDispatcher::default()
        };
        let mut session = ChatSession::new();

        let outcome = session
            .chat("delete work", &backend, &dispatcher, &Always(true))
            .await
            .unwrap();

        assert_eq!(*dispatcher.executed.lock().unwrap(), vec!["delproject"]);
        // Tools ran but the model narrated nothing
        assert_eq!(outcome.text, "Done.");
    }

    #[tokio::test]
    async fn empty_reply_is_an_error_not_an_answer() {
        let backend = ScriptedBackend::new(vec![BackendReply::default()]);
        let dispatcher = RecordingDispatcher::default();
        let mut session = ChatSession::new();

        let err = session
            .chat("hello", &backend, &dispatcher, &Always(true))
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<AgentError>(),
            Some(&AgentError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn usage_accumulates_only_counted_turns() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply("c1", "projects"),
            text_reply("Two projects."),
        ]);
        let dispatcher = RecordingDispatcher::default();
        let mut session = ChatSession::new();

        session
            .chat("list", &backend, &dispatcher, &Always(true))
            .await
            .unwrap();

        let usage = session.usage();
        assert_eq!(usage.prompts, 1);
        assert_eq!(usage.input_tokens, 200);
        assert_eq!(usage.output_tokens, 30);
        assert!(usage.cost > 0.0);

        // A turn with zero reported tokens is not counted
        let silent = ScriptedBackend::new(vec![BackendReply {
            text: "cached answer".into(),
            ..BackendReply::default()
        }]);
        session
            .chat("again", &silent, &dispatcher, &Always(true))
            .await
            .unwrap();
        assert_eq!(session.usage().prompts, 1);
    }

    #[test]
    fn command_context_trims_oldest_pairs() {
        let mut session = ChatSession::new();
        for i in 0..13 {
            session.record_command(&format!("/project p{i}"), "Created.");
        }

        let entries: Vec<&Message> = session
            .history()
            .iter()
            .filter(|m| m.content.starts_with(COMMAND_CONTEXT_PREFIX))
            .collect();
        assert_eq!(entries.len(), MAX_COMMAND_CONTEXT_ENTRIES);
        // Oldest entries went first
        assert!(entries[0].content.contains("/project p3"));

        // system prompt + 10 surviving pairs, roles still alternating
        assert_eq!(session.history().len(), 1 + 2 * MAX_COMMAND_CONTEXT_ENTRIES);
        for pair in session.history()[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].content, "Noted.");
        }
    }

    #[test]
    fn clear_resets_history_but_not_usage() {
        let mut session = ChatSession::new();
        session.record_command("/projects", "none");
        session.usage.prompts = 3;
        session.clear();
        assert!(session.history().is_empty());
        assert_eq!(session.usage().prompts, 3);
    }
}
