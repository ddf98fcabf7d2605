use crate::aggregate::AggregationPayload;
use crate::llm::prompt::PromptTemplate;
use crate::llm::{strip_code_fences, GenerationRequest, TextGenerator};

pub const MAX_TOKENS: u32 = 4000;
pub const TEMPERATURE: f64 = 0.1;

/// Ask the LLM for a chart program and strip any code fences around it.
///
/// Charts are optional, so every failure (including an unreachable service)
/// is logged and returns `None`.
pub async fn generate_chart_code(
    generator: &dyn TextGenerator,
    template: &PromptTemplate,
    model: &str,
    payload: &AggregationPayload,
) -> Option<String> {
    let data = match payload.to_prompt_json() {
        Ok(data) => data,
        Err(e) => {
            log::error!("Could not serialize payload for chart generation: {e}");
            return None;
        }
    };
    let request = GenerationRequest {
        model: model.to_string(),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        prompt: template.render(&data),
    };

    match generator.generate(&request).await {
        Ok(text) => {
            let source = strip_code_fences(&text);
            if source.is_empty() {
                log::warn!("Chart generation returned no code");
                None
            } else {
                log::info!("Chart code generated ({} chars)", source.len());
                Some(source.to_string())
            }
        }
        Err(e) => {
            log::warn!("Chart code generation failed: {e}");
            None
        }
    }
}
