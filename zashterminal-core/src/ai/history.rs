//! Persistent AI conversations (`ai_history.json`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{atomic_write, secure_file_permissions};
use crate::error::AiResult;

use super::provider::{ChatMessage, ChatRole};

/// Oldest conversations beyond this are dropped on save
pub const MAX_CONVERSATIONS: usize = 100;

/// Messages returned by [`AiHistoryManager::recent_messages`] by default
pub const RECENT_MESSAGES: usize = 50;

fn now_iso() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local time, ISO 8601
    #[serde(default)]
    pub timestamp: String,
    /// Speaker
    pub role: ChatRole,
    /// Message text
    pub content: String,
    /// Commands suggested with an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

impl HistoryEntry {
    /// As a request message
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// A chat session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// UUID
    pub id: String,
    /// Local time, ISO 8601
    #[serde(default)]
    pub created_at: String,
    /// Messages, oldest first
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}

impl Conversation {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now_iso(),
            messages: Vec::new(),
        }
    }

    /// First user message, for list titles
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    conversations: Vec<Conversation>,
    #[serde(default)]
    current_conversation_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Current {
        conversations: Vec<Conversation>,
        #[serde(default)]
        current_conversation_id: Option<String>,
    },
    Legacy {
        history: Vec<HistoryEntry>,
    },
}

/// Stores AI conversations
///
/// Every mutation is written through immediately.
#[derive(Debug)]
pub struct AiHistoryManager {
    path: PathBuf,
    conversations: Vec<Conversation>,
    current: Option<String>,
}

impl AiHistoryManager {
    /// Loads `path`. A missing or unreadable file starts an empty history;
    /// the old single-list format becomes one conversation.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (conversations, current) = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<StoredHistory>(&data) {
                Ok(StoredHistory::Current {
                    conversations,
                    current_conversation_id,
                }) => (conversations, current_conversation_id),
                Ok(StoredHistory::Legacy { history }) if !history.is_empty() => {
                    let mut conv = Conversation::new();
                    if let Some(first) = history.first().filter(|m| !m.timestamp.is_empty()) {
                        conv.created_at = first.timestamp.clone();
                    }
                    conv.messages = history;
                    let id = conv.id.clone();
                    tracing::info!("Migrated legacy AI history");
                    (vec![conv], Some(id))
                }
                Ok(StoredHistory::Legacy { .. }) => (Vec::new(), None),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse AI history");
                    (Vec::new(), None)
                }
            },
            Err(_) => (Vec::new(), None),
        };
        tracing::debug!(count = conversations.len(), "AI conversations loaded");
        Self {
            path,
            conversations,
            current,
        }
    }

    /// History file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) -> AiResult<()> {
        if self.conversations.len() > MAX_CONVERSATIONS {
            let excess = self.conversations.len() - MAX_CONVERSATIONS;
            self.conversations.drain(..excess);
        }
        let file = HistoryFile {
            conversations: self.conversations.clone(),
            current_conversation_id: self.current.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        atomic_write(&self.path, json.as_bytes())?;
        secure_file_permissions(&self.path);
        Ok(())
    }

    /// Starts a new conversation, makes it current and returns its id
    ///
    /// # Errors
    /// Write failures.
    pub fn new_conversation(&mut self) -> AiResult<String> {
        let conv = Conversation::new();
        let id = conv.id.clone();
        tracing::info!(id = %id, "New AI conversation");
        self.current = Some(id.clone());
        self.conversations.push(conv);
        self.save()?;
        Ok(id)
    }

    /// The current conversation
    #[must_use]
    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    fn current_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current.clone()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Makes `id` current. Returns false for unknown ids.
    ///
    /// # Errors
    /// Write failures.
    pub fn load_conversation(&mut self, id: &str) -> AiResult<bool> {
        if !self.conversations.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        self.current = Some(id.to_string());
        self.save()?;
        Ok(true)
    }

    /// Appends a message to the current conversation, starting one if
    /// needed. Blank messages are ignored.
    ///
    /// # Errors
    /// Write failures.
    pub fn add_message(
        &mut self,
        role: ChatRole,
        content: &str,
        commands: Vec<String>,
    ) -> AiResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        if self.current_conversation().is_none() {
            self.new_conversation()?;
        }
        let entry = HistoryEntry {
            timestamp: now_iso(),
            role,
            content: content.to_string(),
            commands,
        };
        if let Some(conv) = self.current_mut() {
            conv.messages.push(entry);
        }
        self.save()
    }

    /// Messages of the current conversation
    #[must_use]
    pub fn messages(&self) -> &[HistoryEntry] {
        self.current_conversation()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default()
    }

    /// Last `count` messages of the current conversation
    #[must_use]
    pub fn recent_messages(&self, count: usize) -> &[HistoryEntry] {
        let messages = self.messages();
        &messages[messages.len().saturating_sub(count)..]
    }

    /// Empties the current conversation
    ///
    /// # Errors
    /// Write failures.
    pub fn clear_current(&mut self) -> AiResult<()> {
        if let Some(conv) = self.current_mut() {
            conv.messages.clear();
            self.save()?;
        }
        Ok(())
    }

    /// Deletes a conversation. Returns false for unknown ids.
    ///
    /// # Errors
    /// Write failures.
    pub fn delete_conversation(&mut self, id: &str) -> AiResult<bool> {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return Ok(false);
        };
        self.conversations.remove(index);
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        self.save()?;
        Ok(true)
    }

    /// Deletes every conversation
    ///
    /// # Errors
    /// Write failures.
    pub fn clear_all(&mut self) -> AiResult<()> {
        self.conversations.clear();
        self.current = None;
        self.save()
    }

    /// All conversations, newest first
    pub fn all_conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn messages_start_a_conversation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ai_history.json");
        let mut history = AiHistoryManager::load(&path);
        history.add_message(ChatRole::User, "   ", Vec::new()).unwrap();
        assert!(history.current_conversation().is_none());

        history.add_message(ChatRole::User, " how? ", Vec::new()).unwrap();
        history
            .add_message(ChatRole::Assistant, "like this", vec!["ls".into()])
            .unwrap();
        assert_eq!(history.messages().len(), 2);
        assert_eq!(history.messages()[0].content, "how?");

        let reloaded = AiHistoryManager::load(&path);
        assert_eq!(reloaded.messages()[1].commands, vec!["ls"]);
        assert_eq!(reloaded.current_conversation().unwrap().title(), Some("how?"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn migrates_legacy_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ai_history.json");
        fs::write(
            &path,
            r#"{"history":[{"timestamp":"2024-01-01T10:00:00","role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        let history = AiHistoryManager::load(&path);
        let conv = history.current_conversation().unwrap();
        assert_eq!(conv.created_at, "2024-01-01T10:00:00");
        assert_eq!(conv.messages.len(), 1);
    }

    #[test]
    fn conversation_management() {
        let dir = TempDir::new().unwrap();
        let mut history = AiHistoryManager::load(dir.path().join("ai_history.json"));
        let first = history.new_conversation().unwrap();
        history.add_message(ChatRole::User, "one", Vec::new()).unwrap();
        let second = history.new_conversation().unwrap();

        let order: Vec<&str> = history.all_conversations().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec![second.as_str(), first.as_str()]);

        assert!(history.load_conversation(&first).unwrap());
        assert_eq!(history.messages().len(), 1);
        assert!(!history.load_conversation("missing").unwrap());

        history.clear_current().unwrap();
        assert!(history.messages().is_empty());

        assert!(history.delete_conversation(&first).unwrap());
        assert!(history.current_conversation().is_none());
        history.clear_all().unwrap();
        assert_eq!(history.all_conversations().count(), 0);
    }

    #[test]
    fn caps_conversations_and_recent_messages() {
        let dir = TempDir::new().unwrap();
        let mut history = AiHistoryManager::load(dir.path().join("ai_history.json"));
        for _ in 0..=MAX_CONVERSATIONS {
            history.new_conversation().unwrap();
        }
        assert_eq!(history.all_conversations().count(), MAX_CONVERSATIONS);

        for i in 0..60 {
            history
                .add_message(ChatRole::User, &format!("m{i}"), Vec::new())
                .unwrap();
        }
        let recent = history.recent_messages(RECENT_MESSAGES);
        assert_eq!(recent.len(), RECENT_MESSAGES);
        assert_eq!(recent[0].content, "m10");
        assert_eq!(history.recent_messages(500).len(), 60);
    }
}
