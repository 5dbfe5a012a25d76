use std::time::Duration;

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOperation {
    NotifyAfter { millis: u64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOutput {
    Elapsed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("Timer was cancelled by the shell")]
    Cancelled,
    #[error("Timer is unavailable: {0}")]
    Unavailable(String),
}

pub type TimerResult = Result<TimerOutput, TimerError>;

impl Operation for TimerOperation {
    type Output = TimerResult;
}

/// One-shot delays. The shell answers when the delay has elapsed and the
/// pre-built event is then dispatched; the receiving handler re-checks state.
#[derive(Clone)]
pub struct Timer<E> {
    context: CapabilityContext<TimerOperation, E>,
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}

impl<E> Timer<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, E>) -> Self {
        Self { context }
    }

    pub fn notify_after(&self, delay: Duration, event: E) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let ctx = self.context.clone();
        self.context.spawn(async move {
            match ctx
                .request_from_shell(TimerOperation::NotifyAfter { millis })
                .await
            {
                Ok(TimerOutput::Elapsed) => ctx.update_app(event),
                Err(e) => tracing::warn!(error = %e, millis, "timer did not fire"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_format() {
        let op = TimerOperation::NotifyAfter { millis: 3000 };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"NotifyAfter":{"millis":3000}}"#);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            TimerError::Unavailable("backgrounded".into()).to_string(),
            "Timer is unavailable: backgrounded"
        );
    }
}
