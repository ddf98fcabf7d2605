use crate::aggregate::AggregationPayload;
use crate::error::Result;
use crate::llm::prompt::PromptTemplate;
use crate::llm::{GenerationRequest, TextGenerator};

pub const MAX_TOKENS: u32 = 6000;
pub const TEMPERATURE: f64 = 0.2;

/// Result of the narrative call. `Failed` is the "generation failed"
/// sentinel; it carries the reason for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    Generated(String),
    Failed(String),
}

/// Ask the LLM for the written report.
///
/// Returns `Err` only when the service is unreachable; every other failure,
/// including an empty reply, becomes [`NarrativeOutcome::Failed`].
pub async fn generate_narrative(
    generator: &dyn TextGenerator,
    template: &PromptTemplate,
    model: &str,
    payload: &AggregationPayload,
) -> Result<NarrativeOutcome> {
    let request = GenerationRequest {
        model: model.to_string(),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        prompt: template.render(&payload.to_prompt_json()?),
    };

    match generator.generate(&request).await {
        Ok(text) if text.trim().is_empty() => {
            log::error!("Narrative generation returned an empty response");
            Ok(NarrativeOutcome::Failed("empty response".into()))
        }
        Ok(text) => {
            log::info!("Narrative generated ({} chars)", text.len());
            Ok(NarrativeOutcome::Generated(text))
        }
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => {
            log::error!("Narrative generation failed: {e}");
            Ok(NarrativeOutcome::Failed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::testing::ScriptedGenerator;

    fn template() -> PromptTemplate {
        PromptTemplate::new("Report on: {data}").unwrap()
    }

    #[tokio::test]
    async fn test_text_returned_verbatim_with_fixed_parameters() {
        let generator = ScriptedGenerator::new(vec![Ok("## Overview\n**Acme**  \n".into())]);
        let outcome = generate_narrative(&generator, &template(), "claude-test", &AggregationPayload::default())
            .await
            .unwrap();
        assert_eq!(outcome, NarrativeOutcome::Generated("## Overview\n**Acme**  \n".into()));

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 6000);
        assert_eq!(requests[0].temperature, 0.2);
        assert_eq!(requests[0].model, "claude-test");
        assert!(requests[0].prompt.starts_with("Report on: {"));
        assert!(requests[0].prompt.contains("\"client_demographics\": []"));
    }

    #[tokio::test]
    async fn test_empty_response_is_failed_sentinel() {
        let generator = ScriptedGenerator::new(vec![Ok("   \n".into())]);
        let outcome = generate_narrative(&generator, &template(), "m", &AggregationPayload::default())
            .await
            .unwrap();
        assert!(matches!(outcome, NarrativeOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_service_error_is_failed_sentinel() {
        let generator = ScriptedGenerator::new(vec![Err(Error::Llm("HTTP 500".into()))]);
        let outcome = generate_narrative(&generator, &template(), "m", &AggregationPayload::default())
            .await
            .unwrap();
        assert_eq!(outcome, NarrativeOutcome::Failed("LLM error: HTTP 500".into()));
    }

    #[tokio::test]
    async fn test_unreachable_service_propagates() {
        let generator = ScriptedGenerator::new(vec![Err(Error::LlmUnavailable("refused".into()))]);
        let err = generate_narrative(&generator, &template(), "m", &AggregationPayload::default())
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
