//! Prompt construction for the generative-AI boundary.
//!
//! The core decides what is asked and which model tier answers; the shell
//! only forwards the request to the provider it holds credentials for.

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Which class of model should answer a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Low latency, used for safety tips.
    Fast,
    /// Highest quality, used for emergency plans.
    Capable,
}

impl ModelTier {
    /// Provider model name the shells are expected to map this tier to.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Fast => "gemini-2.5-flash",
            Self::Capable => "gemini-2.5-pro",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Sampling {
    #[must_use]
    pub const fn tips() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.95,
            top_k: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiRequest {
    pub tier: ModelTier,
    pub prompt: String,
    pub sampling: Option<Sampling>,
}

const SAFETY_TIPS_TEMPLATE: &str = "You are a helpful safety assistant. Provide clear, concise, and actionable safety tips for the following topic: \"{topic}\". Structure your response with clear headings and bullet points. Do not use markdown formatting like '*' or '#'. Just use plain text and newlines.";

const EMERGENCY_PLAN_TEMPLATE: &str = "URGENT: A user is in an emergency situation and has triggered an SOS alert.
Their current location is Latitude: {lat}, Longitude: {lng}.

Provide an immediate, concise, and actionable emergency plan. The tone should be calm and authoritative.
The response MUST be plain text and include the following:
1. A confirmation of their general area if possible (e.g., \"near downtown Los Angeles\").
2. The address and contact number for the NEAREST police station.
3. The address and contact number for the NEAREST hospital.
4. Two or three critical, location-aware safety tips (e.g., \"Find a well-lit public area,\" or \"Stay away from the warehouse district.\").

Structure the response clearly. Do not use markdown.";

#[must_use]
pub fn safety_tips_request(topic: &str) -> AiRequest {
    AiRequest {
        tier: ModelTier::Fast,
        prompt: SAFETY_TIPS_TEMPLATE.replace("{topic}", topic.trim()),
        sampling: Some(Sampling::tips()),
    }
}

#[must_use]
pub fn emergency_plan_request(location: Coordinate) -> AiRequest {
    let prompt = EMERGENCY_PLAN_TEMPLATE
        .replace("{lat}", &location.lat().to_string())
        .replace("{lng}", &location.lng().to_string());
    AiRequest {
        tier: ModelTier::Capable,
        prompt,
        sampling: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tips_prompt_embeds_trimmed_topic() {
        let req = safety_tips_request("  Travel Safety ");
        assert!(req.prompt.contains("topic: \"Travel Safety\"."));
        assert_eq!(req.tier, ModelTier::Fast);
        assert_eq!(req.sampling, Some(Sampling::tips()));
    }

    #[test]
    fn test_plan_prompt_embeds_coordinates() {
        let loc = Coordinate::new(34.0522, -118.2437).unwrap();
        let req = emergency_plan_request(loc);
        assert!(req
            .prompt
            .contains("Latitude: 34.0522, Longitude: -118.2437."));
        assert!(req.prompt.contains("NEAREST hospital"));
        assert_eq!(req.tier, ModelTier::Capable);
        assert!(req.sampling.is_none());
    }

    #[test]
    fn test_tier_models() {
        assert_eq!(ModelTier::Fast.default_model(), "gemini-2.5-flash");
        assert_eq!(ModelTier::Capable.default_model(), "gemini-2.5-pro");
    }
}
