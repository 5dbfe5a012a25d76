//! SOS activation and emergency-plan lifecycle.
//!
//! Each trigger opens a new generation. Plan results are tagged with the
//! generation that requested them and are dropped if SOS has since been
//! cancelled or re-triggered.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::presence::Location;
use crate::Coordinate;

pub const LOCATION_UNAVAILABLE_PLAN: &str =
    "Your location is unavailable. Please ensure location services are enabled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    Loading,
    Ready(String),
    Failed { reason: String, fallback: String },
    LocationUnavailable,
}

impl PlanState {
    fn failed(reason: &str) -> Self {
        Self::Failed {
            reason: reason.to_string(),
            fallback: format!(
                "Could not generate an emergency plan. Please contact emergency services directly if you are in danger.\n\nError: {reason}"
            ),
        }
    }

    /// Text to show in the plan panel, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::Ready(plan) => Some(plan),
            Self::Failed { fallback, .. } => Some(fallback),
            Self::LocationUnavailable => Some(LOCATION_UNAVAILABLE_PLAN),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SosState {
    #[default]
    Inactive,
    Active { generation: Generation, plan: PlanState },
}

/// What the caller must do after a trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    RequestPlan {
        generation: Generation,
        location: Coordinate,
    },
    LocationUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanResolution {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SosWorkflow {
    state: SosState,
    last_generation: u64,
}

impl SosWorkflow {
    #[must_use]
    pub const fn state(&self) -> &SosState {
        &self.state
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, SosState::Active { .. })
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(
            self.state,
            SosState::Active {
                plan: PlanState::Loading,
                ..
            }
        )
    }

    #[must_use]
    pub fn plan(&self) -> Option<&str> {
        match &self.state {
            SosState::Inactive => None,
            SosState::Active { plan, .. } => plan.text(),
        }
    }

    #[must_use]
    pub const fn current_generation(&self) -> Option<Generation> {
        match self.state {
            SosState::Inactive => None,
            SosState::Active { generation, .. } => Some(generation),
        }
    }

    /// Starts (or restarts) SOS. Without a self location the plan is settled
    /// immediately and no request is needed.
    pub fn trigger(&mut self, self_location: Option<Location>) -> TriggerOutcome {
        self.last_generation += 1;
        let generation = Generation(self.last_generation);
        if self.is_active() {
            debug!(generation = generation.0, "SOS re-triggered, earlier plan request is now stale");
        }

        match self_location {
            Some(location) => {
                self.state = SosState::Active {
                    generation,
                    plan: PlanState::Loading,
                };
                info!(generation = generation.0, "SOS triggered, requesting plan");
                TriggerOutcome::RequestPlan {
                    generation,
                    location: location.coordinate,
                }
            }
            None => {
                self.state = SosState::Active {
                    generation,
                    plan: PlanState::LocationUnavailable,
                };
                warn!(generation = generation.0, "SOS triggered without a location");
                TriggerOutcome::LocationUnavailable
            }
        }
    }

    /// Applies a plan result if it belongs to the current activation.
    pub fn resolve(&mut self, generation: Generation, result: Result<String, String>) -> PlanResolution {
        match &mut self.state {
            SosState::Active {
                generation: current,
                plan,
            } if *current == generation && *plan == PlanState::Loading => {
                *plan = match result {
                    Ok(text) => PlanState::Ready(text),
                    Err(reason) => PlanState::failed(&reason),
                };
                info!(generation = generation.0, ready = matches!(plan, PlanState::Ready(_)), "emergency plan resolved");
                PlanResolution::Applied
            }
            _ => {
                debug!(generation = generation.0, "stale emergency plan discarded");
                PlanResolution::Stale
            }
        }
    }

    /// Returns true if SOS was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = SosState::Inactive;
        info!(was_active, "SOS cancelled");
        was_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnixTimeMs;

    fn here() -> Location {
        Location {
            coordinate: Coordinate::new(34.0522, -118.2437).unwrap(),
            captured_at: UnixTimeMs(1),
        }
    }

    fn requested(outcome: TriggerOutcome) -> Generation {
        match outcome {
            TriggerOutcome::RequestPlan { generation, .. } => generation,
            TriggerOutcome::LocationUnavailable => panic!("expected a plan request"),
        }
    }

    #[test]
    fn test_trigger_and_resolve() {
        let mut sos = SosWorkflow::default();
        let generation = requested(sos.trigger(Some(here())));
        assert!(sos.is_active());
        assert!(sos.is_loading());
        assert_eq!(sos.plan(), None);

        assert_eq!(sos.resolve(generation, Ok("Go to the station.".into())), PlanResolution::Applied);
        assert!(!sos.is_loading());
        assert_eq!(sos.plan(), Some("Go to the station."));
    }

    #[test]
    fn test_no_location_settles_immediately() {
        let mut sos = SosWorkflow::default();
        assert_eq!(sos.trigger(None), TriggerOutcome::LocationUnavailable);
        assert!(sos.is_active());
        assert!(!sos.is_loading());
        assert_eq!(sos.plan(), Some(LOCATION_UNAVAILABLE_PLAN));
    }

    #[test]
    fn test_failure_stores_fallback() {
        let mut sos = SosWorkflow::default();
        let generation = requested(sos.trigger(Some(here())));
        sos.resolve(generation, Err("quota exceeded".into()));
        let plan = sos.plan().unwrap();
        assert!(plan.starts_with("Could not generate an emergency plan."));
        assert!(plan.ends_with("\n\nError: quota exceeded"));
    }

    #[test]
    fn test_result_after_cancel_is_stale() {
        let mut sos = SosWorkflow::default();
        let generation = requested(sos.trigger(Some(here())));
        assert!(sos.cancel());
        assert_eq!(sos.resolve(generation, Ok("late".into())), PlanResolution::Stale);
        assert!(!sos.is_active());
        assert_eq!(sos.plan(), None);
    }

    #[test]
    fn test_retrigger_makes_old_result_stale() {
        let mut sos = SosWorkflow::default();
        let first = requested(sos.trigger(Some(here())));
        let second = requested(sos.trigger(Some(here())));
        assert!(second > first);

        assert_eq!(sos.resolve(first, Ok("old".into())), PlanResolution::Stale);
        assert!(sos.is_loading());
        assert_eq!(sos.resolve(second, Ok("new".into())), PlanResolution::Applied);
        assert_eq!(sos.plan(), Some("new"));
        assert_eq!(sos.resolve(second, Ok("dup".into())), PlanResolution::Stale);
    }

    #[test]
    fn test_cancel_when_inactive() {
        let mut sos = SosWorkflow::default();
        assert!(!sos.cancel());
        assert_eq!(*sos.state(), SosState::Inactive);
    }
}
