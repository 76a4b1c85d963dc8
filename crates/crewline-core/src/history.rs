// ABOUTME: Rolling conversation history owned by an agent, governed by an explicit trimming policy.
// ABOUTME: The chat agent keeps the last 10 entries; role agents keep everything and window the prompt.

use crate::message::Message;

/// Entries retained by the conversational agent after every exchange.
pub const CHAT_HISTORY_CAP: usize = 10;

/// History entries a role agent places in each task prompt.
pub const ROLE_PROMPT_WINDOW: usize = 6;

/// How a history buffer is trimmed after each append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Never drop entries. Growth is bounded only by the process lifetime.
    Unbounded,
    /// Keep only the most recent `n` entries.
    KeepLast(usize),
}

impl HistoryPolicy {
    /// Trim `entries` in place so they satisfy this policy. Oldest entries go first.
    pub fn apply(&self, entries: &mut Vec<Message>) {
        match self {
            HistoryPolicy::Unbounded => {}
            HistoryPolicy::KeepLast(cap) => {
                if entries.len() > *cap {
                    entries.drain(0..entries.len() - cap);
                }
            }
        }
    }
}

/// An ordered message buffer that enforces its policy on every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Message>,
    policy: HistoryPolicy,
}

impl History {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// A history capped at `cap` entries.
    pub fn bounded(cap: usize) -> Self {
        Self::new(HistoryPolicy::KeepLast(cap))
    }

    pub fn unbounded() -> Self {
        Self::new(HistoryPolicy::Unbounded)
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
        self.policy.apply(&mut self.entries);
    }

    /// Append a user prompt and the assistant's reply as one exchange.
    /// The policy is applied once both entries are in place.
    pub fn record_exchange(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.entries.push(Message::user(prompt));
        self.entries.push(Message::assistant(reply));
        self.policy.apply(&mut self.entries);
    }

    /// The most recent `n` entries (or all of them if fewer exist), oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
