use std::sync::Arc;

use super::prompt::{GREETING, SYSTEM_PROMPT};
use crate::cases::{CaseTable, describe_schema};
use crate::chart::Figure;
use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    /// Carries a figure for local display; never replayed to the model.
    Chart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Figure(Figure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: Role,
    payload: Payload,
}

impl Turn {
    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// What the orchestrator hands back for one tool call or direct answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Chart(Figure),
}

/// Per-session conversation state. The case table is shared read-only
/// between sessions.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    table: Arc<CaseTable>,
    schema: String,
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, table: Arc<CaseTable>) -> Self {
        let schema = describe_schema(&table);
        Self {
            id: id.into(),
            table,
            schema,
            history: seed_turns(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &CaseTable {
        &self.table
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(Turn::text(Role::User, text));
    }

    pub fn push_reply(&mut self, reply: Reply) {
        let turn = match reply {
            Reply::Text(text) => Turn::text(Role::Assistant, text),
            Reply::Chart(figure) => Turn {
                role: Role::Chart,
                payload: Payload::Figure(figure),
            },
        };
        self.history.push(turn);
    }

    /// History as sent to the model: chart turns are dropped.
    pub fn outgoing_messages(&self) -> Vec<ChatMessage> {
        self.history
            .iter()
            .filter_map(|turn| {
                let Payload::Text(text) = &turn.payload else {
                    return None;
                };
                match turn.role {
                    Role::System => Some(ChatMessage::system(text.clone())),
                    Role::User => Some(ChatMessage::user(text.clone())),
                    Role::Assistant => Some(ChatMessage::assistant(text.clone())),
                    Role::Chart => None,
                }
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.history = seed_turns();
    }
}

fn seed_turns() -> Vec<Turn> {
    vec![
        Turn::text(Role::System, SYSTEM_PROMPT),
        Turn::text(Role::Assistant, GREETING),
    ]
}
