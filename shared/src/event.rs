use serde::{Deserialize, Serialize};

use crate::capabilities::{AiText, GeolocationResult};
use crate::chat::CannedReply;
use crate::notifications::NotificationId;
use crate::presence::{MemberId, PresenceReport};
use crate::session::AttemptId;
use crate::sos::Generation;
use crate::tips::TipsRequestId;
use crate::view::Screen;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Lifecycle
    AppStarted,
    Configure { json: String },

    // Presence
    SelfLocationResolved(GeolocationResult),
    PresenceTick,
    PresenceReported(Vec<PresenceReport>),

    // Notifications & navigation
    NotificationExpired { id: NotificationId },
    DismissNotification { id: NotificationId },
    Navigate { screen: Screen },

    // Calls
    StartCall { member: MemberId },
    OutboundCallAnswered { partner: MemberId, attempt: AttemptId },
    AcceptCall,
    DeclineCall,
    HangUp,
    ToggleMute,
    ToggleVideo,
    ToggleCallRecording,

    // Audio streaming
    RequestAudio { member: MemberId },
    OutboundAudioAccepted { partner: MemberId, attempt: AttemptId },
    AcceptAudioRequest,
    DeclineAudioRequest,
    EndAudioStream,

    // Inbound sessions
    IncomingSimulationDue,
    IncomingCall { member: MemberId },
    IncomingAudioRequest { member: MemberId },

    // Chat
    StartChat { member: MemberId },
    EndChat,
    SendChatMessage { text: String },
    StartVoiceRecording,
    StopVoiceRecording { audio_ref: String },
    CancelVoiceRecording,
    VoiceRecordingFailed { reason: String },
    ChatReplyDue { partner: MemberId, reply: CannedReply },

    // SOS
    TriggerSos,
    CancelSos,
    EmergencyPlanGenerated { generation: Generation, result: AiText },

    // Safety tips
    FetchSafetyTips { topic: String },
    SafetyTipsGenerated { request: TipsRequestId, result: AiText },

    CheckIn,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::Configure { .. } => "configure",
            Self::SelfLocationResolved(_) => "self_location_resolved",
            Self::PresenceTick => "presence_tick",
            Self::PresenceReported(_) => "presence_reported",
            Self::NotificationExpired { .. } => "notification_expired",
            Self::DismissNotification { .. } => "dismiss_notification",
            Self::Navigate { .. } => "navigate",
            Self::StartCall { .. } => "start_call",
            Self::OutboundCallAnswered { .. } => "outbound_call_answered",
            Self::AcceptCall => "accept_call",
            Self::DeclineCall => "decline_call",
            Self::HangUp => "hang_up",
            Self::ToggleMute => "toggle_mute",
            Self::ToggleVideo => "toggle_video",
            Self::ToggleCallRecording => "toggle_call_recording",
            Self::RequestAudio { .. } => "request_audio",
            Self::OutboundAudioAccepted { .. } => "outbound_audio_accepted",
            Self::AcceptAudioRequest => "accept_audio_request",
            Self::DeclineAudioRequest => "decline_audio_request",
            Self::EndAudioStream => "end_audio_stream",
            Self::IncomingSimulationDue => "incoming_simulation_due",
            Self::IncomingCall { .. } => "incoming_call",
            Self::IncomingAudioRequest { .. } => "incoming_audio_request",
            Self::StartChat { .. } => "start_chat",
            Self::EndChat => "end_chat",
            Self::SendChatMessage { .. } => "send_chat_message",
            Self::StartVoiceRecording => "start_voice_recording",
            Self::StopVoiceRecording { .. } => "stop_voice_recording",
            Self::CancelVoiceRecording => "cancel_voice_recording",
            Self::VoiceRecordingFailed { .. } => "voice_recording_failed",
            Self::ChatReplyDue { .. } => "chat_reply_due",
            Self::TriggerSos => "trigger_sos",
            Self::CancelSos => "cancel_sos",
            Self::EmergencyPlanGenerated { .. } => "emergency_plan_generated",
            Self::FetchSafetyTips { .. } => "fetch_safety_tips",
            Self::SafetyTipsGenerated { .. } => "safety_tips_generated",
            Self::CheckIn => "check_in",
        }
    }

    /// Events that come straight from a user gesture, as opposed to timers,
    /// capability responses and feeds.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::DismissNotification { .. }
                | Self::Navigate { .. }
                | Self::StartCall { .. }
                | Self::AcceptCall
                | Self::DeclineCall
                | Self::HangUp
                | Self::ToggleMute
                | Self::ToggleVideo
                | Self::ToggleCallRecording
                | Self::RequestAudio { .. }
                | Self::AcceptAudioRequest
                | Self::DeclineAudioRequest
                | Self::EndAudioStream
                | Self::StartChat { .. }
                | Self::EndChat
                | Self::SendChatMessage { .. }
                | Self::StartVoiceRecording
                | Self::StopVoiceRecording { .. }
                | Self::CancelVoiceRecording
                | Self::TriggerSos
                | Self::CancelSos
                | Self::FetchSafetyTips { .. }
                | Self::CheckIn
        )
    }
}
