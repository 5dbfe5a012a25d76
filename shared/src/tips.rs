//! Safety tips fetched on demand for a topic.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{AppError, ErrorKind, MAX_TOPIC_LEN};

pub const CATEGORIES: [&str; 6] = [
    "Child Safety",
    "Online Safety",
    "Travel Safety",
    "Home Security",
    "Natural Disasters",
    "Personal Safety",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsRequestId(pub u64);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipsState {
    #[default]
    Empty,
    Loading { topic: String },
    Ready { topic: String, tips: String },
    Failed { topic: String, error: String },
}

impl TipsState {
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Loading { topic } | Self::Ready { topic, .. } | Self::Failed { topic, .. } => {
                Some(topic)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TipsError {
    #[error("Please enter or select a topic for safety tips.")]
    EmptyTopic,
    #[error("Topic is longer than {max} characters")]
    TopicTooLong { max: usize },
}

impl From<TipsError> for AppError {
    fn from(e: TipsError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipsWorkflow {
    state: TipsState,
    latest: u64,
}

impl TipsWorkflow {
    #[must_use]
    pub const fn state(&self) -> &TipsState {
        &self.state
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, TipsState::Loading { .. })
    }

    /// Validates the topic and enters loading. The returned id must come back
    /// with the response.
    pub fn begin(&mut self, topic: &str) -> Result<(TipsRequestId, String), TipsError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TipsError::EmptyTopic);
        }
        if topic.chars().count() > MAX_TOPIC_LEN {
            return Err(TipsError::TopicTooLong { max: MAX_TOPIC_LEN });
        }
        self.latest += 1;
        self.state = TipsState::Loading {
            topic: topic.to_string(),
        };
        info!(request = self.latest, topic, "fetching safety tips");
        Ok((TipsRequestId(self.latest), topic.to_string()))
    }

    /// Stores a response if it answers the latest request. On failure returns
    /// the message shown to the user.
    pub fn resolve(&mut self, request: TipsRequestId, result: Result<String, String>) -> Option<Result<(), String>> {
        let TipsState::Loading { topic } = &self.state else {
            debug!(request = request.0, "tips response with nothing loading");
            return None;
        };
        if request.0 != self.latest {
            debug!(request = request.0, latest = self.latest, "stale tips response discarded");
            return None;
        }
        let topic = topic.clone();
        match result {
            Ok(tips) => {
                self.state = TipsState::Ready { topic, tips };
                Some(Ok(()))
            }
            Err(reason) => {
                let error = format!("Failed to generate tips: {reason}");
                self.state = TipsState::Failed {
                    topic,
                    error: error.clone(),
                };
                Some(Err(error))
            }
        }
    }
}
