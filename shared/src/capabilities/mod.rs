//! Capabilities the shell provides to the core.
//!
//! Rendering comes straight from Crux. Timers, device geolocation and the
//! generative-AI provider are custom request/response capabilities.

mod ai;
mod geolocation;
mod timer;

pub use crux_core::render::Render;

pub use self::ai::{Ai, AiError, AiOperation, AiOutput, AiResult, AiText};
pub use self::geolocation::{
    Geolocation, GeolocationError, GeolocationOperation, GeolocationResult,
};
pub use self::timer::{Timer, TimerError, TimerOperation, TimerOutput, TimerResult};

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub timer: Timer<Event>,
    pub geolocation: Geolocation<Event>,
    pub ai: Ai<Event>,
}
