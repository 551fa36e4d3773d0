//! Short-term buffer (C7): a bounded sliding window of recent turns, with
//! conversational and structured rendering styles.
//!
//! Grounded on the `ShortTermMemory` Python module's deque-backed window,
//! `format_style` split between `"conversational"` and `"structured"`, and
//! its `get_summary` stats block. `resize` and the `VecDeque` eviction shape
//! borrow from `SensoryBuffer::resize`'s approach in a sibling Rust crate.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::models::{Message, Metadata};

/// Rendering style for `render()` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    Conversational,
    Structured,
}

/// Summary statistics for the buffer (§4.7, mirrors
/// `ShortTermMemory.get_summary`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferSummary {
    pub window_size: usize,
    pub current_count: usize,
    pub oldest_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub newest_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub roles: Vec<String>,
}

/// Bounded FIFO of recent conversation turns (ZONE 3 of the context payload).
pub struct ShortTermBuffer {
    messages: VecDeque<Message>,
    window_size: usize,
}

impl ShortTermBuffer {
    pub fn new(window_size: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message, evicting the oldest if the window is full. Rejects
    /// blank content (§4.7).
    pub fn push(&mut self, role: &str, content: &str, metadata: Metadata) -> Result<()> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MemoryError::InvalidInput("message content must not be empty".to_string()));
        }
        if self.messages.len() >= self.window_size {
            self.messages.pop_front();
        }
        self.messages.push_back(Message {
            role: role.to_string(),
            content: trimmed.to_string(),
            timestamp: chrono::Utc::now(),
            metadata,
        });
        Ok(())
    }

    /// Most recent `count` messages (or all, if `None`), oldest first.
    pub fn recent(&self, count: Option<usize>) -> Vec<&Message> {
        let all: Vec<&Message> = self.messages.iter().collect();
        match count {
            None => all,
            Some(n) => {
                let skip = all.len().saturating_sub(n);
                all[skip..].to_vec()
            }
        }
    }

    /// Render the buffer as a context-ready string (§4.7 / §4.10 ZONE 3).
    pub fn render(&self, count: Option<usize>, style: RenderStyle) -> String {
        let messages = self.recent(count);
        if messages.is_empty() {
            return String::new();
        }

        match style {
            RenderStyle::Conversational => {
                let mut lines = vec!["RECENT CONVERSATION:".to_string()];
                lines.extend(messages.iter().map(|m| m.format_conversational()));
                lines.join("\n")
            }
            RenderStyle::Structured => {
                let mut lines = vec!["--- SHORT-TERM MEMORY (Recent Context) ---".to_string()];
                for (i, m) in messages.iter().enumerate() {
                    lines.push(format!("[Turn {}] {}:", i + 1, m.role.to_uppercase()));
                    lines.push(format!("  {}", m.content));
                    if !m.metadata.is_empty() {
                        if let Ok(json) = serde_json::to_string(&m.metadata) {
                            lines.push(format!("  Metadata: {json}"));
                        }
                    }
                }
                lines.join("\n")
            }
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Change the window size, evicting the oldest messages if it shrinks.
    pub fn resize(&mut self, new_size: usize) {
        self.window_size = new_size.max(1);
        while self.messages.len() > self.window_size {
            self.messages.pop_front();
        }
    }

    pub fn summary(&self) -> BufferSummary {
        let mut roles: Vec<String> = self.messages.iter().map(|m| m.role.clone()).collect();
        roles.sort();
        roles.dedup();
        BufferSummary {
            window_size: self.window_size,
            current_count: self.messages.len(),
            oldest_timestamp: self.messages.front().map(|m| m.timestamp),
            newest_timestamp: self.messages.back().map(|m| m.timestamp),
            roles,
        }
    }
}
