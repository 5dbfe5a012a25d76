//! Call and audio-stream state machines.
//!
//! Only one real-time session may be pending or running at a time: while
//! either machine is not idle the user is busy and new outbound sessions are
//! refused. Delayed transitions carry the attempt they were scheduled for so
//! a stale timer can never resurrect a cancelled request.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::presence::MemberId;
use crate::{AppError, ErrorKind};

/// Distinguishes successive outbound requests to the same partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallControls {
    pub muted: bool,
    pub video_enabled: bool,
    pub recording: bool,
}

impl Default for CallControls {
    fn default() -> Self {
        Self {
            muted: false,
            video_enabled: true,
            recording: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallState {
    #[default]
    Idle,
    /// Outbound call ringing on the partner's side.
    Requesting { partner: MemberId, attempt: AttemptId },
    /// Inbound call waiting for accept or decline.
    Receiving { partner: MemberId },
    InCall { partner: MemberId, controls: CallControls },
}

impl CallState {
    #[must_use]
    pub const fn partner(&self) -> Option<MemberId> {
        match self {
            Self::Idle => None,
            Self::Requesting { partner, .. }
            | Self::Receiving { partner }
            | Self::InCall { partner, .. } => Some(*partner),
        }
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioState {
    #[default]
    Idle,
    Requesting { partner: MemberId, attempt: AttemptId },
    Receiving { partner: MemberId },
    Streaming { partner: MemberId },
}

impl AudioState {
    #[must_use]
    pub const fn partner(&self) -> Option<MemberId> {
        match self {
            Self::Idle => None,
            Self::Requesting { partner, .. }
            | Self::Receiving { partner }
            | Self::Streaming { partner } => Some(*partner),
        }
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("You are already busy.")]
    Busy,
    #[error("{operation} is not valid right now")]
    InvalidTransition { operation: &'static str },
    #[error("Unknown family member {0}")]
    UnknownMember(MemberId),
    #[error("You cannot start a session with yourself")]
    SelfTarget,
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        let kind = match e {
            SessionError::Busy => ErrorKind::Busy,
            SessionError::InvalidTransition { .. } => ErrorKind::InvalidState,
            SessionError::UnknownMember(_) => ErrorKind::NotFound,
            SessionError::SelfTarget => ErrorKind::Validation,
        };
        AppError::new(kind, e.to_string())
    }
}

/// How a pending request ended when the user said no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declined {
    /// An inbound request was refused.
    Incoming(MemberId),
    /// The user's own outbound request was withdrawn before it was answered.
    Cancelled(MemberId),
}

impl Declined {
    #[must_use]
    pub const fn partner(self) -> MemberId {
        match self {
            Self::Incoming(p) | Self::Cancelled(p) => p,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCoordinator {
    call: CallState,
    audio: AudioState,
    next_attempt: u64,
}

impl SessionCoordinator {
    #[must_use]
    pub const fn call(&self) -> &CallState {
        &self.call
    }

    #[must_use]
    pub const fn audio(&self) -> &AudioState {
        &self.audio
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !self.call.is_idle() || !self.audio.is_idle()
    }

    fn admit_outbound(&mut self, partner: MemberId) -> Result<AttemptId, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if partner.is_self() {
            return Err(SessionError::SelfTarget);
        }
        self.next_attempt += 1;
        Ok(AttemptId(self.next_attempt))
    }

    fn admit_inbound(&self, partner: MemberId) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if partner.is_self() {
            return Err(SessionError::SelfTarget);
        }
        Ok(())
    }

    pub fn start_call(&mut self, partner: MemberId) -> Result<AttemptId, SessionError> {
        let attempt = self.admit_outbound(partner)?;
        self.call = CallState::Requesting { partner, attempt };
        info!(partner = %partner, attempt = attempt.0, "outbound call requested");
        Ok(attempt)
    }

    /// Applies a scheduled answer. Returns false when the request it was
    /// scheduled for is no longer pending.
    pub fn answer_outbound_call(&mut self, partner: MemberId, attempt: AttemptId) -> bool {
        match self.call {
            CallState::Requesting {
                partner: p,
                attempt: a,
            } if p == partner && a == attempt => {
                self.call = CallState::InCall {
                    partner,
                    controls: CallControls::default(),
                };
                info!(partner = %partner, attempt = attempt.0, "outbound call answered");
                true
            }
            _ => {
                debug!(partner = %partner, attempt = attempt.0, "stale call answer ignored");
                false
            }
        }
    }

    pub fn receive_call(&mut self, partner: MemberId) -> Result<(), SessionError> {
        self.admit_inbound(partner)?;
        self.call = CallState::Receiving { partner };
        info!(partner = %partner, "incoming call");
        Ok(())
    }

    pub fn accept_call(&mut self) -> Result<MemberId, SessionError> {
        let CallState::Receiving { partner } = self.call else {
            return Err(SessionError::InvalidTransition {
                operation: "accept_call",
            });
        };
        self.call = CallState::InCall {
            partner,
            controls: CallControls::default(),
        };
        info!(partner = %partner, "call accepted");
        Ok(partner)
    }

    pub fn decline_call(&mut self) -> Result<Declined, SessionError> {
        let declined = match self.call {
            CallState::Receiving { partner } => Declined::Incoming(partner),
            CallState::Requesting { partner, .. } => Declined::Cancelled(partner),
            CallState::Idle | CallState::InCall { .. } => {
                return Err(SessionError::InvalidTransition {
                    operation: "decline_call",
                })
            }
        };
        self.call = CallState::Idle;
        info!(partner = %declined.partner(), ?declined, "call declined");
        Ok(declined)
    }

    pub fn hang_up(&mut self) -> Result<MemberId, SessionError> {
        let CallState::InCall { partner, .. } = self.call else {
            return Err(SessionError::InvalidTransition { operation: "hang_up" });
        };
        self.call = CallState::Idle;
        info!(partner = %partner, "call ended");
        Ok(partner)
    }

    fn controls_mut(&mut self, operation: &'static str) -> Result<&mut CallControls, SessionError> {
        match &mut self.call {
            CallState::InCall { controls, .. } => Ok(controls),
            _ => Err(SessionError::InvalidTransition { operation }),
        }
    }

    /// Returns whether the microphone is now muted.
    pub fn toggle_mute(&mut self) -> Result<bool, SessionError> {
        let controls = self.controls_mut("toggle_mute")?;
        controls.muted = !controls.muted;
        Ok(controls.muted)
    }

    /// Returns whether video is now enabled.
    pub fn toggle_video(&mut self) -> Result<bool, SessionError> {
        let controls = self.controls_mut("toggle_video")?;
        controls.video_enabled = !controls.video_enabled;
        Ok(controls.video_enabled)
    }

    /// Returns whether the call is now being recorded.
    pub fn toggle_recording(&mut self) -> Result<bool, SessionError> {
        let controls = self.controls_mut("toggle_recording")?;
        controls.recording = !controls.recording;
        Ok(controls.recording)
    }

    pub fn request_audio(&mut self, partner: MemberId) -> Result<AttemptId, SessionError> {
        let attempt = self.admit_outbound(partner)?;
        self.audio = AudioState::Requesting { partner, attempt };
        info!(partner = %partner, attempt = attempt.0, "outbound audio requested");
        Ok(attempt)
    }

    pub fn accept_outbound_audio(&mut self, partner: MemberId, attempt: AttemptId) -> bool {
        match self.audio {
            AudioState::Requesting {
                partner: p,
                attempt: a,
            } if p == partner && a == attempt => {
                self.audio = AudioState::Streaming { partner };
                info!(partner = %partner, attempt = attempt.0, "audio request accepted");
                true
            }
            _ => {
                debug!(partner = %partner, attempt = attempt.0, "stale audio acceptance ignored");
                false
            }
        }
    }

    pub fn receive_audio_request(&mut self, partner: MemberId) -> Result<(), SessionError> {
        self.admit_inbound(partner)?;
        self.audio = AudioState::Receiving { partner };
        info!(partner = %partner, "incoming audio request");
        Ok(())
    }

    /// Accepting an inbound audio request starts streaming on the partner's
    /// side only; locally the session is finished.
    pub fn accept_audio_request(&mut self) -> Result<MemberId, SessionError> {
        let AudioState::Receiving { partner } = self.audio else {
            return Err(SessionError::InvalidTransition {
                operation: "accept_audio_request",
            });
        };
        self.audio = AudioState::Idle;
        info!(partner = %partner, "streaming audio to partner");
        Ok(partner)
    }

    pub fn decline_audio_request(&mut self) -> Result<Declined, SessionError> {
        let declined = match self.audio {
            AudioState::Receiving { partner } => Declined::Incoming(partner),
            AudioState::Requesting { partner, .. } => Declined::Cancelled(partner),
            AudioState::Idle | AudioState::Streaming { .. } => {
                return Err(SessionError::InvalidTransition {
                    operation: "decline_audio_request",
                })
            }
        };
        self.audio = AudioState::Idle;
        info!(partner = %declined.partner(), ?declined, "audio request declined");
        Ok(declined)
    }

    pub fn end_audio_stream(&mut self) -> Result<MemberId, SessionError> {
        let AudioState::Streaming { partner } = self.audio else {
            return Err(SessionError::InvalidTransition {
                operation: "end_audio_stream",
            });
        };
        self.audio = AudioState::Idle;
        info!(partner = %partner, "audio stream ended");
        Ok(partner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MOM: MemberId = MemberId(1);
    const DAD: MemberId = MemberId(2);

    mod call_tests {
        use super::*;

        #[test]
        fn test_outbound_call_answered() {
            let mut s = SessionCoordinator::default();
            let attempt = s.start_call(MOM).unwrap();
            assert!(s.is_busy());
            assert!(s.answer_outbound_call(MOM, attempt));
            assert_eq!(
                *s.call(),
                CallState::InCall {
                    partner: MOM,
                    controls: CallControls::default()
                }
            );
        }

        #[test]
        fn test_decline_before_answer_cancels() {
            let mut s = SessionCoordinator::default();
            let attempt = s.start_call(MOM).unwrap();
            assert_eq!(s.decline_call(), Ok(Declined::Cancelled(MOM)));
            assert!(!s.answer_outbound_call(MOM, attempt));
            assert!(s.call().is_idle());
        }

        #[test]
        fn test_stale_answer_from_earlier_attempt() {
            let mut s = SessionCoordinator::default();
            let first = s.start_call(MOM).unwrap();
            s.decline_call().unwrap();
            let second = s.start_call(MOM).unwrap();
            assert_ne!(first, second);

            assert!(!s.answer_outbound_call(MOM, first));
            assert!(matches!(s.call(), CallState::Requesting { .. }));
            assert!(s.answer_outbound_call(MOM, second));
        }

        #[test]
        fn test_inbound_accept_and_hang_up() {
            let mut s = SessionCoordinator::default();
            s.receive_call(DAD).unwrap();
            assert_eq!(s.accept_call(), Ok(DAD));
            assert_eq!(s.hang_up(), Ok(DAD));
            assert!(!s.is_busy());
            assert_eq!(s.call().partner(), None);
        }

        #[test]
        fn test_repeated_decline_and_hang_up_are_noops() {
            let mut s = SessionCoordinator::default();
            s.receive_call(DAD).unwrap();
            s.decline_call().unwrap();
            assert!(matches!(s.decline_call(), Err(SessionError::InvalidTransition { .. })));
            assert!(matches!(s.hang_up(), Err(SessionError::InvalidTransition { .. })));
            assert_eq!(s, SessionCoordinator::default());
        }

        #[test]
        fn test_accept_only_from_receiving() {
            let mut s = SessionCoordinator::default();
            s.start_call(MOM).unwrap();
            assert!(s.accept_call().is_err());
        }

        #[test]
        fn test_self_target_rejected() {
            let mut s = SessionCoordinator::default();
            assert_eq!(s.start_call(MemberId::SELF), Err(SessionError::SelfTarget));
            assert_eq!(s.receive_call(MemberId::SELF), Err(SessionError::SelfTarget));
            assert!(!s.is_busy());
        }

        #[test]
        fn test_controls() {
            let mut s = SessionCoordinator::default();
            assert!(s.toggle_mute().is_err());
            s.receive_call(MOM).unwrap();
            s.accept_call().unwrap();
            assert_eq!(s.toggle_mute(), Ok(true));
            assert_eq!(s.toggle_video(), Ok(false));
            assert_eq!(s.toggle_recording(), Ok(true));
            assert_eq!(s.toggle_recording(), Ok(false));
            s.hang_up().unwrap();
            s.receive_call(MOM).unwrap();
            s.accept_call().unwrap();
            let CallState::InCall { controls, .. } = *s.call() else {
                panic!("expected in call");
            };
            assert_eq!(controls, CallControls::default());
        }
    }

    mod audio_tests {
        use super::*;

        #[test]
        fn test_outbound_audio_streams() {
            let mut s = SessionCoordinator::default();
            let attempt = s.request_audio(DAD).unwrap();
            assert!(s.accept_outbound_audio(DAD, attempt));
            assert_eq!(*s.audio(), AudioState::Streaming { partner: DAD });
            assert_eq!(s.end_audio_stream(), Ok(DAD));
            assert!(!s.is_busy());
        }

        #[test]
        fn test_accepting_inbound_returns_to_idle() {
            let mut s = SessionCoordinator::default();
            s.receive_audio_request(MOM).unwrap();
            assert!(s.is_busy());
            assert_eq!(s.accept_audio_request(), Ok(MOM));
            assert!(s.audio().is_idle());
        }

        #[test]
        fn test_decline_audio() {
            let mut s = SessionCoordinator::default();
            s.receive_audio_request(MOM).unwrap();
            assert_eq!(s.decline_audio_request(), Ok(Declined::Incoming(MOM)));
            let attempt = s.request_audio(MOM).unwrap();
            assert_eq!(s.decline_audio_request(), Ok(Declined::Cancelled(MOM)));
            assert!(!s.accept_outbound_audio(MOM, attempt));
            assert!(s.end_audio_stream().is_err());
        }

        #[test]
        fn test_audio_blocks_calls() {
            let mut s = SessionCoordinator::default();
            s.request_audio(MOM).unwrap();
            assert_eq!(s.start_call(DAD), Err(SessionError::Busy));
            assert_eq!(s.receive_call(DAD), Err(SessionError::Busy));
        }
    }

    #[derive(Debug, Clone)]
    enum Initiation {
        Call(u32),
        Audio(u32),
    }

    fn initiation() -> impl Strategy<Value = Initiation> {
        prop_oneof![
            (0u32..8).prop_map(Initiation::Call),
            (0u32..8).prop_map(Initiation::Audio),
        ]
    }

    fn busy_coordinator(kind: u8) -> SessionCoordinator {
        let mut s = SessionCoordinator::default();
        match kind % 5 {
            0 => {
                s.start_call(MOM).unwrap();
            }
            1 => s.receive_call(MOM).unwrap(),
            2 => {
                s.receive_call(MOM).unwrap();
                s.accept_call().unwrap();
            }
            3 => {
                s.request_audio(MOM).unwrap();
            }
            _ => s.receive_audio_request(MOM).unwrap(),
        }
        s
    }

    proptest! {
        #[test]
        fn busy_rejects_every_initiation(kind in any::<u8>(), ops in prop::collection::vec(initiation(), 1..20)) {
            let mut s = busy_coordinator(kind);
            let before = s.clone();
            for op in ops {
                let result = match op {
                    Initiation::Call(id) => s.start_call(MemberId(id)),
                    Initiation::Audio(id) => s.request_audio(MemberId(id)),
                };
                prop_assert_eq!(result, Err(SessionError::Busy));
            }
            prop_assert_eq!(s, before);
        }
    }
}
