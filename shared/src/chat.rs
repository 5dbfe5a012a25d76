//! Per-partner chat history with text and voice messages.
//!
//! Chats are not real-time sessions and do not count towards the busy flag.
//! At most one chat is open; history of closed chats is kept for the next
//! time the same partner is opened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::presence::MemberId;
use crate::{AppError, ErrorKind, UnixTimeMs, MAX_CHAT_MESSAGE_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    Text(String),
    Voice { audio_ref: String, duration_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: MemberId,
    pub body: MessageBody,
    pub sent_at: UnixTimeMs,
}

/// Automatic answers sent by the simulated partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CannedReply {
    TextAck,
    VoiceAck,
}

impl CannedReply {
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::TextAck => "Sounds good!",
            Self::VoiceAck => "Got your voice message!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub started_at: UnixTimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub partner: MemberId,
    pub messages: Vec<ChatMessage>,
    pub recording: Option<Recording>,
}

impl ChatSession {
    fn seeded(partner: MemberId, now: UnixTimeMs) -> Self {
        let minutes_ago = |m: u64| UnixTimeMs(now.0.saturating_sub(m * 60_000));
        let line = |sender: MemberId, text: &str, at: UnixTimeMs| ChatMessage {
            id: MessageId::new(),
            sender,
            body: MessageBody::Text(text.to_string()),
            sent_at: at,
        };
        Self {
            partner,
            messages: vec![
                line(partner, "Hey! Just checking in, are you okay?", minutes_ago(5)),
                line(
                    MemberId::SELF,
                    "Hey, I'm good! Thanks for asking. Just finishing up some work.",
                    minutes_ago(4),
                ),
                line(partner, "Great to hear!", minutes_ago(3)),
            ],
            recording: None,
        }
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn append(&mut self, sender: MemberId, body: MessageBody, now: UnixTimeMs) -> MessageId {
        let id = MessageId::new();
        self.messages.push(ChatMessage {
            id,
            sender,
            body,
            sent_at: now,
        });
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("No chat is open")]
    NoOpenChat,
    #[error("You cannot chat with yourself")]
    SelfChat,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Message is longer than {max} characters")]
    MessageTooLong { max: usize },
    #[error("A voice message is already being recorded")]
    AlreadyRecording,
    #[error("No voice message is being recorded")]
    NotRecording,
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        let kind = match e {
            ChatError::NoOpenChat | ChatError::AlreadyRecording | ChatError::NotRecording => {
                ErrorKind::InvalidState
            }
            ChatError::SelfChat | ChatError::EmptyMessage | ChatError::MessageTooLong { .. } => {
                ErrorKind::Validation
            }
        };
        AppError::new(kind, e.to_string())
    }
}

/// A finished voice recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceMessage {
    pub partner: MemberId,
    pub id: MessageId,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatBook {
    sessions: BTreeMap<MemberId, ChatSession>,
    open: Option<MemberId>,
}

impl ChatBook {
    /// Opens the chat with `partner`, seeding the conversation the first time.
    pub fn open(&mut self, partner: MemberId, now: UnixTimeMs) -> Result<&ChatSession, ChatError> {
        if partner.is_self() {
            return Err(ChatError::SelfChat);
        }
        if let Some(previous) = self.open.filter(|p| *p != partner) {
            self.discard_recording(previous);
        }
        self.open = Some(partner);
        info!(partner = %partner, "chat opened");
        Ok(self
            .sessions
            .entry(partner)
            .or_insert_with(|| ChatSession::seeded(partner, now)))
    }

    /// Closes the open chat, dropping any unfinished recording.
    pub fn close(&mut self) -> Option<MemberId> {
        let partner = self.open.take()?;
        self.discard_recording(partner);
        info!(partner = %partner, "chat closed");
        Some(partner)
    }

    fn discard_recording(&mut self, partner: MemberId) {
        if let Some(session) = self.sessions.get_mut(&partner) {
            if session.recording.take().is_some() {
                debug!(partner = %partner, "unfinished recording discarded");
            }
        }
    }

    #[must_use]
    pub const fn open_partner(&self) -> Option<MemberId> {
        self.open
    }

    #[must_use]
    pub fn open_session(&self) -> Option<&ChatSession> {
        self.open.and_then(|p| self.sessions.get(&p))
    }

    #[must_use]
    pub fn session(&self, partner: MemberId) -> Option<&ChatSession> {
        self.sessions.get(&partner)
    }

    fn open_session_mut(&mut self) -> Result<&mut ChatSession, ChatError> {
        let partner = self.open.ok_or(ChatError::NoOpenChat)?;
        self.sessions.get_mut(&partner).ok_or(ChatError::NoOpenChat)
    }

    pub fn send_text(&mut self, text: &str, now: UnixTimeMs) -> Result<(MemberId, MessageId), ChatError> {
        let session = self.open_session_mut()?;
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > MAX_CHAT_MESSAGE_LEN {
            return Err(ChatError::MessageTooLong {
                max: MAX_CHAT_MESSAGE_LEN,
            });
        }
        let id = session.append(MemberId::SELF, MessageBody::Text(text.to_string()), now);
        Ok((session.partner, id))
    }

    pub fn start_recording(&mut self, now: UnixTimeMs) -> Result<MemberId, ChatError> {
        let session = self.open_session_mut()?;
        if session.is_recording() {
            return Err(ChatError::AlreadyRecording);
        }
        session.recording = Some(Recording { started_at: now });
        Ok(session.partner)
    }

    /// Ends the recording and appends it as a voice message lasting the
    /// elapsed whole seconds.
    pub fn stop_recording(&mut self, audio_ref: String, now: UnixTimeMs) -> Result<VoiceMessage, ChatError> {
        let session = self.open_session_mut()?;
        let recording = session.recording.take().ok_or(ChatError::NotRecording)?;
        let duration_secs = now.elapsed_since(recording.started_at) / 1000;
        let id = session.append(
            MemberId::SELF,
            MessageBody::Voice {
                audio_ref,
                duration_secs,
            },
            now,
        );
        Ok(VoiceMessage {
            partner: session.partner,
            id,
            duration_secs,
        })
    }

    pub fn cancel_recording(&mut self) -> Result<MemberId, ChatError> {
        let session = self.open_session_mut()?;
        session.recording.take().ok_or(ChatError::NotRecording)?;
        Ok(session.partner)
    }

    /// Records a message from `partner`, whether or not their chat is open.
    pub fn receive(&mut self, partner: MemberId, text: &str, now: UnixTimeMs) -> MessageId {
        self.sessions
            .entry(partner)
            .or_insert_with(|| ChatSession::seeded(partner, now))
            .append(partner, MessageBody::Text(text.to_string()), now)
    }
}
