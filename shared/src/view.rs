//! Screen routing and the view model rendered by the shells.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, MessageBody};
use crate::map;
use crate::model::Model;
use crate::notifications::{Notification, NotificationKind};
use crate::presence::{Member, MemberStatus};
use crate::session::{AudioState, CallState};
use crate::tips::{TipsState, CATEGORIES};
use crate::{format_clock, format_time_ago, UnixTimeMs};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    Dashboard,
    Map,
    Safety,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberView {
    pub id: u32,
    pub name: String,
    pub avatar_url: String,
    pub status: MemberStatus,
    pub status_label: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub updated: Option<String>,
}

impl MemberView {
    fn new(member: &Member, now: UnixTimeMs) -> Self {
        Self {
            id: member.id.0,
            name: member.name.clone(),
            avatar_url: member.avatar_url.clone(),
            status: member.status,
            status_label: member.status.label().to_string(),
            lat: member.location.map(|l| l.coordinate.lat()),
            lng: member.location.map(|l| l.coordinate.lng()),
            updated: member.location.map(|l| {
                format!(
                    "Updated {}",
                    format_time_ago(l.captured_at.as_millis(), now.as_millis())
                )
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.0,
            kind: n.kind,
            message: n.message.clone(),
        }
    }
}

/// Full-screen session UI, if one is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOverlay {
    OutgoingCall {
        partner: String,
    },
    IncomingCall {
        partner: String,
    },
    InCall {
        partner: String,
        muted: bool,
        video_enabled: bool,
        recording: bool,
    },
    OutgoingAudioRequest {
        partner: String,
    },
    IncomingAudioRequest {
        partner: String,
    },
    AudioStream {
        partner: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SosView {
    pub active: bool,
    pub loading: bool,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageView {
    pub id: String,
    pub from_self: bool,
    pub text: Option<String>,
    pub audio_ref: Option<String>,
    pub duration_label: Option<String>,
    pub sent_at: u64,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(m: &ChatMessage) -> Self {
        let (text, audio_ref, duration_label) = match &m.body {
            MessageBody::Text(text) => (Some(text.clone()), None, None),
            MessageBody::Voice {
                audio_ref,
                duration_secs,
            } => (
                None,
                Some(audio_ref.clone()),
                Some(format_clock(*duration_secs)),
            ),
        };
        Self {
            id: m.id.0.to_string(),
            from_self: m.sender.is_self(),
            text,
            audio_ref,
            duration_label,
            sent_at: m.sent_at.as_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatView {
    pub partner_id: u32,
    pub partner_name: String,
    pub messages: Vec<ChatMessageView>,
    pub recording: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipsView {
    pub categories: Vec<String>,
    pub topic: Option<String>,
    pub loading: bool,
    pub tips: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub screen: Screen,
    pub members: Vec<MemberView>,
    pub notifications: Vec<NotificationView>,
    pub overlay: Option<SessionOverlay>,
    pub sos: SosView,
    pub chat: Option<ChatView>,
    pub tips: TipsView,
    pub map_geojson: Option<String>,
    pub is_busy: bool,
    pub sos_button_visible: bool,
    pub nav_visible: bool,
}

fn overlay(model: &Model) -> Option<SessionOverlay> {
    let name = |id| model.presence.name_of(id);
    let call = match *model.sessions.call() {
        CallState::Idle => None,
        CallState::Requesting { partner, .. } => Some(SessionOverlay::OutgoingCall {
            partner: name(partner),
        }),
        CallState::Receiving { partner } => Some(SessionOverlay::IncomingCall {
            partner: name(partner),
        }),
        CallState::InCall { partner, controls } => Some(SessionOverlay::InCall {
            partner: name(partner),
            muted: controls.muted,
            video_enabled: controls.video_enabled,
            recording: controls.recording,
        }),
    };
    call.or_else(|| match *model.sessions.audio() {
        AudioState::Idle => None,
        AudioState::Requesting { partner, .. } => Some(SessionOverlay::OutgoingAudioRequest {
            partner: name(partner),
        }),
        AudioState::Receiving { partner } => Some(SessionOverlay::IncomingAudioRequest {
            partner: name(partner),
        }),
        AudioState::Streaming { partner } => Some(SessionOverlay::AudioStream {
            partner: name(partner),
        }),
    })
}

fn tips_view(state: &TipsState) -> TipsView {
    let categories = CATEGORIES.iter().map(ToString::to_string).collect();
    let topic = state.topic().map(str::to_string);
    match state {
        TipsState::Empty => TipsView {
            categories,
            ..TipsView::default()
        },
        TipsState::Loading { .. } => TipsView {
            categories,
            topic,
            loading: true,
            ..TipsView::default()
        },
        TipsState::Ready { tips, .. } => TipsView {
            categories,
            topic,
            tips: Some(tips.clone()),
            ..TipsView::default()
        },
        TipsState::Failed { error, .. } => TipsView {
            categories,
            topic,
            error: Some(error.clone()),
            ..TipsView::default()
        },
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let now = model.now;
    let chat = model
        .chats
        .open_session()
        .filter(|_| model.screen == Screen::Chat)
        .map(|session| ChatView {
            partner_id: session.partner.0,
            partner_name: model.presence.name_of(session.partner),
            messages: session.messages.iter().map(ChatMessageView::from).collect(),
            recording: session.is_recording(),
        });
    let map_geojson = (model.screen == Screen::Map)
        .then(|| map::roster_geojson(&model.presence, now).ok())
        .flatten();
    let in_chat = model.screen == Screen::Chat;

    ViewModel {
        screen: model.screen,
        members: model
            .presence
            .members()
            .iter()
            .map(|m| MemberView::new(m, now))
            .collect(),
        notifications: model
            .notifications
            .active()
            .iter()
            .map(NotificationView::from)
            .collect(),
        overlay: overlay(model),
        sos: SosView {
            active: model.sos.is_active(),
            loading: model.sos.is_loading(),
            plan: model.sos.plan().map(str::to_string),
        },
        chat,
        tips: tips_view(model.tips.state()),
        map_geojson,
        is_busy: model.is_busy(),
        sos_button_visible: !in_chat,
        nav_visible: !in_chat,
    }
}
