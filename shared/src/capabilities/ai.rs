use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::{self, AiRequest};
use crate::{AppError, Coordinate, ErrorKind, LatLng};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AiOperation {
    EmergencyPlan { location: LatLng, request: AiRequest },
    SafetyTips { topic: String, request: AiRequest },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AiOutput {
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("{0}")]
    Service(String),
    #[error("AI service is unavailable")]
    Unavailable,
    #[error("AI request timed out")]
    Timeout,
    #[error("AI service returned an empty response")]
    EmptyResponse,
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        let kind = match e {
            AiError::Timeout => ErrorKind::Timeout,
            AiError::Service(_) | AiError::Unavailable | AiError::EmptyResponse => {
                ErrorKind::ExternalService
            }
        };
        AppError::new(kind, e.to_string())
    }
}

pub type AiResult = Result<AiOutput, AiError>;

impl Operation for AiOperation {
    type Output = AiResult;
}

/// Generated text with blank answers folded into [`AiError::EmptyResponse`].
pub type AiText = Result<String, AiError>;

fn into_text(result: AiResult) -> AiText {
    match result {
        Ok(AiOutput::Text(text)) if text.trim().is_empty() => Err(AiError::EmptyResponse),
        Ok(AiOutput::Text(text)) => Ok(text),
        Err(e) => Err(e),
    }
}

/// Single-attempt requests to the generative-AI provider held by the shell.
#[derive(Clone)]
pub struct Ai<E> {
    context: CapabilityContext<AiOperation, E>,
}

impl<Ev> Capability<Ev> for Ai<Ev> {
    type Operation = AiOperation;
    type MappedSelf<MappedEv> = Ai<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Ai::new(self.context.map_event(f))
    }
}

impl<E> Ai<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<AiOperation, E>) -> Self {
        Self { context }
    }

    pub fn emergency_plan<F>(&self, location: Coordinate, callback: F)
    where
        F: FnOnce(AiText) -> E + Send + 'static,
    {
        let operation = AiOperation::EmergencyPlan {
            location: location.into(),
            request: prompts::emergency_plan_request(location),
        };
        self.run(operation, callback);
    }

    pub fn safety_tips<F>(&self, topic: &str, callback: F)
    where
        F: FnOnce(AiText) -> E + Send + 'static,
    {
        let operation = AiOperation::SafetyTips {
            topic: topic.to_string(),
            request: prompts::safety_tips_request(topic),
        };
        self.run(operation, callback);
    }

    fn run<F>(&self, operation: AiOperation, callback: F)
    where
        F: FnOnce(AiText) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(into_text(result)));
        });
    }
}
