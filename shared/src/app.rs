use rand::Rng;
use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::chat::{CannedReply, ChatError};
use crate::config::CoreConfig;
use crate::event::Event;
use crate::model::Model;
use crate::notifications::NotificationKind;
use crate::presence::{MemberId, MemberStatus};
use crate::session::{Declined, SessionError};
use crate::sos::{PlanResolution, TriggerOutcome};
use crate::view::{self, Screen, ViewModel};
use crate::{AppError, AppResult};

#[derive(Default)]
pub struct App;

impl App {
    /// Shows a notification and schedules its own expiry.
    fn notify(model: &mut Model, caps: &Capabilities, kind: NotificationKind, message: impl Into<String>) {
        let id = model.notifications.push(kind, message, model.now);
        caps.timer
            .notify_after(model.config.notification_ttl(), Event::NotificationExpired { id });
    }

    fn reject(model: &mut Model, caps: &Capabilities, error: AppError) {
        warn!(
            code = error.code(),
            retryable = error.kind.is_retryable(),
            message = %error.message,
            context = ?error.context,
            "request rejected"
        );
        Self::notify(model, caps, NotificationKind::Warning, error.user_facing_message());
    }

    /// Busy is checked before anything about the member so a busy user only
    /// ever sees the busy warning.
    fn outbound_partner(model: &Model, member: MemberId) -> AppResult<String> {
        if model.sessions.is_busy() {
            return Err(SessionError::Busy.into());
        }
        model
            .presence
            .get(member)
            .map(|m| m.name.clone())
            .ok_or_else(|| SessionError::UnknownMember(member).into())
    }

    fn start_call(model: &mut Model, caps: &Capabilities, member: MemberId) {
        let started = Self::outbound_partner(model, member)
            .and_then(|name| {
                let attempt = model.sessions.start_call(member)?;
                Ok((name, attempt))
            });
        match started {
            Ok((name, attempt)) => {
                Self::notify(model, caps, NotificationKind::Info, format!("Calling {name}..."));
                caps.timer.notify_after(
                    model.config.outbound_answer_delay(),
                    Event::OutboundCallAnswered {
                        partner: member,
                        attempt,
                    },
                );
            }
            Err(e) => Self::reject(model, caps, e),
        }
    }

    fn request_audio(model: &mut Model, caps: &Capabilities, member: MemberId) {
        let started = Self::outbound_partner(model, member)
            .and_then(|name| {
                let attempt = model.sessions.request_audio(member)?;
                Ok((name, attempt))
            });
        match started {
            Ok((name, attempt)) => {
                Self::notify(
                    model,
                    caps,
                    NotificationKind::Info,
                    format!("Requesting audio from {name}..."),
                );
                caps.timer.notify_after(
                    model.config.outbound_answer_delay(),
                    Event::OutboundAudioAccepted {
                        partner: member,
                        attempt,
                    },
                );
            }
            Err(e) => Self::reject(model, caps, e),
        }
    }

    fn receive_call(model: &mut Model, caps: &Capabilities, member: MemberId) {
        if !model.accepts_inbound() || model.presence.get(member).is_none() {
            debug!(member = %member, "incoming call not presented");
            return;
        }
        if model.sessions.receive_call(member).is_ok() {
            let name = model.presence.name_of(member);
            Self::notify(model, caps, NotificationKind::Info, format!("Incoming call from {name}"));
        }
    }

    fn receive_audio_request(model: &mut Model, caps: &Capabilities, member: MemberId) {
        if !model.accepts_inbound() || model.presence.get(member).is_none() {
            debug!(member = %member, "incoming audio request not presented");
            return;
        }
        if model.sessions.receive_audio_request(member).is_ok() {
            let name = model.presence.name_of(member);
            Self::notify(model, caps, NotificationKind::Info, format!("Audio request from {name}"));
        }
    }

    fn schedule_simulation(model: &mut Model, caps: &Capabilities) {
        if model.simulation_pending {
            return;
        }
        model.simulation_pending = true;
        caps.timer
            .notify_after(model.config.incoming_event_interval(), Event::IncomingSimulationDue);
    }

    fn simulate_incoming(model: &mut Model, caps: &Capabilities) {
        model.simulation_pending = false;
        if !model.config.simulate_incoming {
            debug!("incoming simulation disabled");
            return;
        }
        Self::schedule_simulation(model, caps);
        if !model.accepts_inbound() {
            return;
        }
        let others = model.presence.others();
        if others.is_empty() {
            return;
        }
        let caller = others[model.rng.gen_range(0..others.len())];
        if model.rng.gen_bool(0.5) {
            Self::receive_call(model, caps, caller);
        } else {
            Self::receive_audio_request(model, caps, caller);
        }
    }

    fn chat_failed(model: &mut Model, caps: &Capabilities, error: ChatError) {
        Self::reject(model, caps, error.into());
    }

    fn trigger_sos(model: &mut Model, caps: &Capabilities) {
        if let Err(e) = model.presence.set_status(MemberId::SELF, MemberStatus::InSos) {
            warn!(error = %e, "could not mark self in SOS");
        }
        Self::notify(
            model,
            caps,
            NotificationKind::Warning,
            "SOS Alert Triggered! Generating emergency plan.",
        );

        match model.sos.trigger(model.presence.self_location()) {
            TriggerOutcome::RequestPlan {
                generation,
                location,
            } => {
                caps.ai.emergency_plan(location, move |result| {
                    Event::EmergencyPlanGenerated { generation, result }
                });
            }
            TriggerOutcome::LocationUnavailable => {
                Self::notify(
                    model,
                    caps,
                    NotificationKind::Error,
                    "Cannot generate emergency plan: Your location is unavailable.",
                );
            }
        }
    }

    fn cancel_sos(model: &mut Model, caps: &Capabilities) {
        model.sos.cancel();
        if model.presence.status_of(MemberId::SELF) == Some(MemberStatus::InSos) {
            // Only undo our own write; any other status set meanwhile stays.
            if let Err(e) = model.presence.set_status(MemberId::SELF, MemberStatus::Safe) {
                warn!(error = %e, "could not clear SOS status");
            }
        }
        Self::notify(model, caps, NotificationKind::Info, "SOS alert has been cancelled.");
    }

    fn navigate(model: &mut Model, screen: Screen) {
        if screen == Screen::Chat && model.chats.open_partner().is_none() {
            debug!("no chat open, staying on {:?}", model.screen);
            return;
        }
        if model.screen == Screen::Chat && screen != Screen::Chat {
            model.chats.close();
        }
        model.screen = screen;
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.update_timestamp();
        debug!(event = event.name(), user = event.is_user_initiated(), "update");

        match event {
            Event::AppStarted => {
                if model.started {
                    debug!("already started");
                } else {
                    model.started = true;
                    caps.geolocation.current_position(Event::SelfLocationResolved);
                    caps.timer
                        .notify_after(model.config.presence_tick(), Event::PresenceTick);
                    if model.config.simulate_incoming {
                        Self::schedule_simulation(model, caps);
                    }
                    info!("core started");
                }
            }

            Event::Configure { json } => match CoreConfig::from_json(&json) {
                Ok(config) => {
                    info!(?config, "configuration applied");
                    model.apply_config(config);
                    if model.started && model.config.simulate_incoming {
                        Self::schedule_simulation(model, caps);
                    }
                }
                Err(e) => {
                    let error = AppError::from(e);
                    warn!(%error, "configuration rejected");
                    Self::notify(model, caps, NotificationKind::Error, error.user_facing_message());
                }
            },

            Event::SelfLocationResolved(Ok(coordinate)) => {
                model.presence.update_self_location(coordinate, model.now);
            }

            Event::SelfLocationResolved(Err(e)) => {
                let error = AppError::from(e).with_context("operation", "current_position");
                Self::reject(model, caps, error);
            }

            Event::PresenceTick => {
                let jitter = model.config.presence_jitter_deg;
                let now = model.now;
                let moved = model.presence.tick(&mut model.rng, jitter, now);
                debug!(moved, "presence tick");
                caps.timer
                    .notify_after(model.config.presence_tick(), Event::PresenceTick);
            }

            Event::PresenceReported(reports) => {
                for report in &reports {
                    if let Err(e) = model.presence.apply_report(report) {
                        warn!(member = %report.member, error = %e, "presence report ignored");
                    }
                }
            }

            Event::NotificationExpired { id } => {
                model.notifications.expire(id);
            }

            Event::DismissNotification { id } => {
                if !model.notifications.dismiss(id) {
                    debug!(id = id.0, "notification already gone");
                }
            }

            Event::Navigate { screen } => Self::navigate(model, screen),

            Event::StartCall { member } => Self::start_call(model, caps, member),

            Event::OutboundCallAnswered { partner, attempt } => {
                if model.sessions.answer_outbound_call(partner, attempt) {
                    let name = model.presence.name_of(partner);
                    Self::notify(model, caps, NotificationKind::Success, format!("{name} answered."));
                }
            }

            Event::AcceptCall => match model.sessions.accept_call() {
                Ok(partner) => {
                    let name = model.presence.name_of(partner);
                    Self::notify(
                        model,
                        caps,
                        NotificationKind::Success,
                        format!("Call with {name} started."),
                    );
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::DeclineCall => match model.sessions.decline_call() {
                Ok(declined) => {
                    let name = model.presence.name_of(declined.partner());
                    let message = match declined {
                        Declined::Incoming(_) => format!("You declined the call from {name}."),
                        Declined::Cancelled(_) => format!("Call to {name} cancelled."),
                    };
                    Self::notify(model, caps, NotificationKind::Info, message);
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::HangUp => match model.sessions.hang_up() {
                Ok(partner) => {
                    let name = model.presence.name_of(partner);
                    Self::notify(model, caps, NotificationKind::Info, format!("Call with {name} ended."));
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::ToggleMute => {
                if let Err(e) = model.sessions.toggle_mute() {
                    debug!(error = %e, "ignored");
                }
            }

            Event::ToggleVideo => match model.sessions.toggle_video() {
                Ok(enabled) => {
                    let message = if enabled { "Video enabled." } else { "Video disabled." };
                    Self::notify(model, caps, NotificationKind::Info, message);
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::ToggleCallRecording => match model.sessions.toggle_recording() {
                Ok(recording) => {
                    let message = if recording {
                        "Call recording started."
                    } else {
                        "Call recording stopped."
                    };
                    Self::notify(model, caps, NotificationKind::Info, message);
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::RequestAudio { member } => Self::request_audio(model, caps, member),

            Event::OutboundAudioAccepted { partner, attempt } => {
                if model.sessions.accept_outbound_audio(partner, attempt) {
                    let name = model.presence.name_of(partner);
                    Self::notify(
                        model,
                        caps,
                        NotificationKind::Success,
                        format!("{name} accepted audio request."),
                    );
                }
            }

            Event::AcceptAudioRequest => match model.sessions.accept_audio_request() {
                Ok(partner) => {
                    let name = model.presence.name_of(partner);
                    Self::notify(
                        model,
                        caps,
                        NotificationKind::Success,
                        format!("Streaming audio to {name}."),
                    );
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::DeclineAudioRequest => match model.sessions.decline_audio_request() {
                Ok(declined) => {
                    let name = model.presence.name_of(declined.partner());
                    let message = match declined {
                        Declined::Incoming(_) => {
                            format!("You declined the audio request from {name}.")
                        }
                        Declined::Cancelled(_) => format!("Audio request to {name} cancelled."),
                    };
                    Self::notify(model, caps, NotificationKind::Info, message);
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::EndAudioStream => match model.sessions.end_audio_stream() {
                Ok(partner) => {
                    let name = model.presence.name_of(partner);
                    Self::notify(
                        model,
                        caps,
                        NotificationKind::Info,
                        format!("Audio stream from {name} ended."),
                    );
                }
                Err(e) => debug!(error = %e, "ignored"),
            },

            Event::IncomingSimulationDue => Self::simulate_incoming(model, caps),

            Event::IncomingCall { member } => Self::receive_call(model, caps, member),

            Event::IncomingAudioRequest { member } => {
                Self::receive_audio_request(model, caps, member);
            }

            Event::StartChat { member } => {
                if model.presence.get(member).is_none() {
                    Self::reject(model, caps, SessionError::UnknownMember(member).into());
                } else {
                    match model.chats.open(member, model.now).map(|_| ()) {
                        Ok(()) => model.screen = Screen::Chat,
                        Err(e) => Self::chat_failed(model, caps, e),
                    }
                }
            }

            Event::EndChat => {
                model.chats.close();
                if model.screen == Screen::Chat {
                    model.screen = Screen::Dashboard;
                }
            }

            Event::SendChatMessage { text } => match model.chats.send_text(&text, model.now) {
                Ok((partner, _)) => {
                    caps.timer.notify_after(
                        model.config.chat_reply_delay(),
                        Event::ChatReplyDue {
                            partner,
                            reply: CannedReply::TextAck,
                        },
                    );
                }
                Err(e) => Self::chat_failed(model, caps, e),
            },

            Event::StartVoiceRecording => {
                if let Err(e) = model.chats.start_recording(model.now) {
                    Self::chat_failed(model, caps, e);
                }
            }

            Event::StopVoiceRecording { audio_ref } => {
                match model.chats.stop_recording(audio_ref, model.now) {
                    Ok(voice) => {
                        debug!(partner = %voice.partner, duration_secs = voice.duration_secs, "voice message sent");
                        caps.timer.notify_after(
                            model.config.chat_reply_delay(),
                            Event::ChatReplyDue {
                                partner: voice.partner,
                                reply: CannedReply::VoiceAck,
                            },
                        );
                    }
                    Err(e) => Self::chat_failed(model, caps, e),
                }
            }

            Event::CancelVoiceRecording => {
                if let Err(e) = model.chats.cancel_recording() {
                    debug!(error = %e, "ignored");
                }
            }

            Event::VoiceRecordingFailed { reason } => {
                warn!(%reason, "voice recording failed");
                if let Err(e) = model.chats.cancel_recording() {
                    debug!(error = %e, "no recording to discard");
                }
                Self::notify(
                    model,
                    caps,
                    NotificationKind::Error,
                    "Could not access microphone. Please check permissions.",
                );
            }

            Event::ChatReplyDue { partner, reply } => {
                model.chats.receive(partner, reply.text(), model.now);
            }

            Event::TriggerSos => Self::trigger_sos(model, caps),

            Event::CancelSos => Self::cancel_sos(model, caps),

            Event::EmergencyPlanGenerated { generation, result } => {
                let result = result.map_err(|e| {
                    AppError::from(e).with_context("generation", generation.0.to_string())
                });
                let failure = result.as_ref().err().cloned();
                let resolution = model
                    .sos
                    .resolve(generation, result.map_err(|e| e.user_facing_message()));
                if let (PlanResolution::Applied, Some(error)) = (resolution, failure) {
                    warn!(%error, context = ?error.context, "emergency plan failed");
                    Self::notify(
                        model,
                        caps,
                        NotificationKind::Error,
                        format!("Failed to generate emergency plan: {}", error.user_facing_message()),
                    );
                }
            }

            Event::FetchSafetyTips { topic } => match model.tips.begin(&topic) {
                Ok((request, topic)) => {
                    caps.ai.safety_tips(&topic, move |result| Event::SafetyTipsGenerated {
                        request,
                        result,
                    });
                }
                Err(e) => Self::reject(model, caps, e.into()),
            },

            Event::SafetyTipsGenerated { request, result } => {
                let outcome = model
                    .tips
                    .resolve(request, result.map_err(|e| AppError::from(e).user_facing_message()));
                if let Some(Err(message)) = outcome {
                    Self::notify(model, caps, NotificationKind::Error, message);
                }
            }

            Event::CheckIn => {
                info!("check-in sent");
                Self::notify(
                    model,
                    caps,
                    NotificationKind::Success,
                    "You've checked in safely. Your family has been notified.",
                );
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{AiError, AiOperation, Effect, TimerOperation};
    use crate::Coordinate;
    use crux_core::testing::AppTester;

    fn started() -> (AppTester<App, Effect>, Model) {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        model.apply_config(CoreConfig {
            rng_seed: Some(5),
            ..CoreConfig::default()
        });
        (app, model)
    }

    fn timer_delays(effects: &[Effect]) -> Vec<u64> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Timer(request) => {
                    let TimerOperation::NotifyAfter { millis } = request.operation;
                    Some(millis)
                }
                _ => None,
            })
            .collect()
    }

    fn messages(model: &Model) -> Vec<String> {
        model
            .notifications
            .active()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    #[test]
    fn test_app_started_requests_location_and_timers() {
        let (app, mut model) = started();
        let update = app.update(Event::AppStarted, &mut model);
        assert!(update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Geolocation(_))));
        let mut delays = timer_delays(&update.effects);
        delays.sort_unstable();
        assert_eq!(delays, vec![10_000, 20_000]);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

        let again = app.update(Event::AppStarted, &mut model);
        assert!(timer_delays(&again.effects).is_empty());
    }

    #[test]
    fn test_location_failure_warns() {
        let (app, mut model) = started();
        app.update(
            Event::SelfLocationResolved(Err(
                crate::capabilities::GeolocationError::PermissionDenied,
            )),
            &mut model,
        );
        assert_eq!(messages(&model), vec!["Could not fetch your location."]);
        assert_eq!(
            model.notifications.latest().unwrap().kind,
            NotificationKind::Warning
        );
        assert!(model.presence.self_location().is_none());
    }

    #[test]
    fn test_start_call_schedules_answer_and_expiry() {
        let (app, mut model) = started();
        let update = app.update(Event::StartCall { member: MemberId(1) }, &mut model);
        assert_eq!(messages(&model), vec!["Calling Mom..."]);
        let mut delays = timer_delays(&update.effects);
        delays.sort_unstable();
        assert_eq!(delays, vec![3000, 5000]);
    }

    #[test]
    fn test_unknown_member_rejected() {
        let (app, mut model) = started();
        app.update(Event::StartCall { member: MemberId(77) }, &mut model);
        assert!(!model.is_busy());
        assert_eq!(messages(&model), vec!["Unknown family member 77"]);
    }

    #[test]
    fn test_busy_warning() {
        let (app, mut model) = started();
        app.update(Event::StartCall { member: MemberId(1) }, &mut model);
        let before = *model.sessions.call();
        app.update(Event::RequestAudio { member: MemberId(2) }, &mut model);
        assert_eq!(*model.sessions.call(), before);
        assert_eq!(messages(&model).last().unwrap(), "You are already busy.");
    }

    #[test]
    fn test_sos_without_location_skips_ai() {
        let (app, mut model) = started();
        let update = app.update(Event::TriggerSos, &mut model);
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Ai(_))));
        assert!(model.sos.is_active());
        assert!(!model.sos.is_loading());
        assert_eq!(
            model.presence.status_of(MemberId::SELF),
            Some(MemberStatus::InSos)
        );
        assert_eq!(
            messages(&model),
            vec![
                "SOS Alert Triggered! Generating emergency plan.",
                "Cannot generate emergency plan: Your location is unavailable."
            ]
        );
    }

    #[test]
    fn test_sos_with_location_requests_plan() {
        let (app, mut model) = started();
        model
            .presence
            .update_self_location(Coordinate::new(34.0522, -118.2437).unwrap(), model.now);
        let update = app.update(Event::TriggerSos, &mut model);
        let op = update
            .effects
            .iter()
            .find_map(|e| match e {
                Effect::Ai(request) => Some(request.operation.clone()),
                _ => None,
            })
            .unwrap();
        let AiOperation::EmergencyPlan { location, request } = op else {
            panic!("expected an emergency plan request");
        };
        assert_eq!(location.lat, 34.0522);
        assert!(request.prompt.contains("Latitude: 34.0522"));
        assert!(model.sos.is_loading());
    }

    #[test]
    fn test_failed_plan_notifies_once() {
        let (app, mut model) = started();
        model
            .presence
            .update_self_location(Coordinate::new(1.0, 1.0).unwrap(), model.now);
        app.update(Event::TriggerSos, &mut model);
        let generation = model.sos.current_generation().unwrap();
        app.update(
            Event::EmergencyPlanGenerated {
                generation,
                result: Err(AiError::Service("quota".into())),
            },
            &mut model,
        );
        assert_eq!(
            messages(&model).last().unwrap(),
            "Failed to generate emergency plan: quota"
        );
        let count = messages(&model).len();

        app.update(
            Event::EmergencyPlanGenerated {
                generation,
                result: Err(AiError::Timeout),
            },
            &mut model,
        );
        assert_eq!(messages(&model).len(), count);
    }

    #[test]
    fn test_cancel_sos_preserves_offline() {
        let (app, mut model) = started();
        app.update(Event::TriggerSos, &mut model);
        model
            .presence
            .set_status(MemberId::SELF, MemberStatus::Offline)
            .unwrap();
        app.update(Event::CancelSos, &mut model);
        assert_eq!(
            model.presence.status_of(MemberId::SELF),
            Some(MemberStatus::Offline)
        );
        assert!(!model.sos.is_active());
        assert_eq!(messages(&model).last().unwrap(), "SOS alert has been cancelled.");
    }

    #[test]
    fn test_blank_topic_warns_without_ai() {
        let (app, mut model) = started();
        let update = app.update(Event::FetchSafetyTips { topic: "   ".into() }, &mut model);
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Ai(_))));
        assert_eq!(
            messages(&model),
            vec!["Please enter or select a topic for safety tips."]
        );
    }

    #[test]
    fn test_inbound_blocked_on_chat_screen() {
        let (app, mut model) = started();
        app.update(Event::StartChat { member: MemberId(2) }, &mut model);
        assert_eq!(model.screen, Screen::Chat);
        app.update(Event::IncomingCall { member: MemberId(1) }, &mut model);
        assert!(model.sessions.call().is_idle());
    }

    #[test]
    fn test_simulation_presents_one_session() {
        let (app, mut model) = started();
        let update = app.update(Event::IncomingSimulationDue, &mut model);
        assert!(model.is_busy());
        assert!(timer_delays(&update.effects).contains(&20_000));
        let partner = model
            .sessions
            .call()
            .partner()
            .or_else(|| model.sessions.audio().partner())
            .unwrap();
        assert!(!partner.is_self());
    }

    #[test]
    fn test_simulation_skipped_during_sos() {
        let (app, mut model) = started();
        app.update(Event::TriggerSos, &mut model);
        app.update(Event::IncomingSimulationDue, &mut model);
        assert!(!model.is_busy());
    }

    #[test]
    fn test_navigate_to_chat_requires_open_chat() {
        let (app, mut model) = started();
        app.update(Event::Navigate { screen: Screen::Chat }, &mut model);
        assert_eq!(model.screen, Screen::Dashboard);
        app.update(Event::Navigate { screen: Screen::Map }, &mut model);
        assert_eq!(model.screen, Screen::Map);
    }

    #[test]
    fn test_invalid_config_keeps_previous() {
        let (app, mut model) = started();
        app.update(
            Event::Configure {
                json: r#"{"chat_reply_delay_ms": 0}"#.into(),
            },
            &mut model,
        );
        assert_eq!(model.config.chat_reply_delay_ms, 1500);
        assert_eq!(
            model.notifications.latest().unwrap().kind,
            NotificationKind::Error
        );
    }

    #[test]
    fn test_location_timeout_uses_location_message() {
        let (app, mut model) = started();
        app.update(
            Event::SelfLocationResolved(Err(crate::capabilities::GeolocationError::Timeout)),
            &mut model,
        );
        assert_eq!(messages(&model), vec!["Could not fetch your location."]);
    }

    #[test]
    fn test_disabling_simulation_stops_pending_timer() {
        let (app, mut model) = started();
        app.update(Event::AppStarted, &mut model);
        assert!(model.simulation_pending);
        app.update(
            Event::Configure {
                json: r#"{"simulate_incoming": false}"#.into(),
            },
            &mut model,
        );

        let update = app.update(Event::IncomingSimulationDue, &mut model);
        assert!(!model.is_busy());
        assert!(!timer_delays(&update.effects).contains(&20_000));
        assert!(!model.simulation_pending);
    }

    #[test]
    fn test_enabling_simulation_after_start_schedules_once() {
        let (app, mut model) = started();
        app.update(
            Event::Configure {
                json: r#"{"simulate_incoming": false}"#.into(),
            },
            &mut model,
        );
        let update = app.update(Event::AppStarted, &mut model);
        assert!(!timer_delays(&update.effects).contains(&20_000));

        let enable = || Event::Configure {
            json: r#"{"simulate_incoming": true}"#.into(),
        };
        let update = app.update(enable(), &mut model);
        assert_eq!(timer_delays(&update.effects), vec![20_000]);
        let update = app.update(enable(), &mut model);
        assert!(timer_delays(&update.effects).is_empty());

        app.update(Event::IncomingSimulationDue, &mut model);
        assert!(model.is_busy());
    }

    #[test]
    fn test_configure_before_start_does_not_schedule() {
        let (app, mut model) = started();
        let update = app.update(
            Event::Configure {
                json: r#"{"simulate_incoming": true}"#.into(),
            },
            &mut model,
        );
        assert!(timer_delays(&update.effects).is_empty());
    }

    #[test]
    fn test_dismiss_removes_only_that_notification() {
        let (app, mut model) = started();
        app.update(Event::CheckIn, &mut model);
        app.update(Event::StartCall { member: MemberId(1) }, &mut model);
        let first = model.notifications.active()[0].id;

        app.update(Event::DismissNotification { id: first }, &mut model);
        assert_eq!(messages(&model), vec!["Calling Mom..."]);
        app.update(Event::DismissNotification { id: first }, &mut model);
        assert_eq!(messages(&model).len(), 1);
    }

    #[test]
    fn test_plan_timeout_reports_friendly_message() {
        let (app, mut model) = started();
        model
            .presence
            .update_self_location(Coordinate::new(1.0, 2.0).unwrap(), model.now);
        app.update(Event::TriggerSos, &mut model);
        let generation = model.sos.current_generation().unwrap();
        app.update(
            Event::EmergencyPlanGenerated {
                generation,
                result: Err(AiError::Timeout),
            },
            &mut model,
        );
        assert_eq!(
            messages(&model).last().unwrap(),
            "Failed to generate emergency plan: The request timed out. Please try again."
        );
    }

    #[test]
    fn test_microphone_failure_without_recording_still_warns() {
        let (app, mut model) = started();
        app.update(Event::StartChat { member: MemberId(1) }, &mut model);
        app.update(
            Event::VoiceRecordingFailed {
                reason: "NotFoundError".into(),
            },
            &mut model,
        );
        assert_eq!(
            messages(&model),
            vec!["Could not access microphone. Please check permissions."]
        );
    }
}
