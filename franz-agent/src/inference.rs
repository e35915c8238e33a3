//! Inference gateway - prompt assembly plus bounded retry

use franz_core::{
    complete_with_retry, ChatMessage, CompletionRequest, LlmProvider, Result, RetryPolicy,
    SamplingConfig, SYSTEM_PROMPT,
};

/// Turns (screenshot, story, feedback) into the next story.
pub struct InferenceGateway<P> {
    provider: P,
    model: String,
    system_prompt: String,
    retry: RetryPolicy,
}

impl<P: LlmProvider> InferenceGateway<P> {
    pub fn new(provider: P) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            system_prompt: SYSTEM_PROMPT.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System block, the previous story, then feedback with the screenshot.
    pub fn build_request(
        &self,
        screenshot_b64: &str,
        prev_story: &str,
        feedback: &str,
        sampling: &SamplingConfig,
    ) -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prev_story),
            ChatMessage::user_with_image(feedback, screenshot_b64),
        ])
        .with_model(self.model.as_str())
        .with_temperature(sampling.temperature)
        .with_top_p(sampling.top_p)
        .with_max_tokens(sampling.max_tokens)
    }

    /// Raw text of the model's answer. No parsing, no validation.
    pub async fn infer(
        &self,
        screenshot_b64: &str,
        prev_story: &str,
        feedback: &str,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let request = self.build_request(screenshot_b64, prev_story, feedback, sampling);
        tracing::debug!(
            model = %self.model,
            story_chars = prev_story.len(),
            feedback_chars = feedback.len(),
            screenshot_bytes = screenshot_b64.len(),
            "requesting next story"
        );

        let response = complete_with_retry(&self.provider, &request, &self.retry)
            .await
            .map_err(|e| e.with_operation("inference::infer").with_context("model", self.model.clone()))?;

        tracing::debug!(
            finish_reason = ?response.finish_reason,
            completion_tokens = response.usage.completion_tokens,
            "story received"
        );
        // A null content is the model writing nothing
        Ok(response.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use franz_core::{
        CompletionResponse, ContentPart, FinishReason, MessageContent, ProviderError, Role, Usage,
    };
    use std::sync::Mutex;

    struct EchoProvider {
        content: Option<String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-vl"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                model: "echo-vl".into(),
                content: self.content.clone(),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            })
        }
    }

    fn echo(content: Option<&str>) -> EchoProvider {
        EchoProvider {
            content: content.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_request_layout() {
        let gateway = InferenceGateway::new(echo(None)).with_system_prompt("draw a cat");
        let sampling = SamplingConfig {
            temperature: 0.4,
            top_p: 0.8,
            max_tokens: 256,
            ..SamplingConfig::default()
        };

        let request = gateway.build_request("QUJD", "old story", "2 actions ok", &sampling);

        assert_eq!(request.model.as_deref(), Some("echo-vl"));
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.top_p, Some(0.8));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0], ChatMessage::system("draw a cat"));
        assert_eq!(request.messages[1], ChatMessage::user("old story"));

        let last = &request.messages[2];
        assert_eq!(last.role, Role::User);
        let MessageContent::Parts(parts) = &last.content else {
            panic!("expected multimodal parts");
        };
        assert_eq!(parts[0], ContentPart::text("2 actions ok"));
        assert_eq!(parts[1], ContentPart::png_base64("QUJD"));
    }

    #[tokio::test]
    async fn test_output_is_returned_verbatim() {
        let raw = "  RULES I KNOW:\n1. drag draws lines\n\n```python\ndrag(1, 2, 3, 4)\n```\n";
        let gateway = InferenceGateway::new(echo(Some(raw)));

        let story = gateway
            .infer("", "", "feedback", &SamplingConfig::default())
            .await
            .unwrap();
        assert_eq!(story, raw);
        assert_eq!(gateway.provider().seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_story() {
        let gateway = InferenceGateway::new(echo(None));
        let story = gateway
            .infer("", "old", "feedback", &SamplingConfig::default())
            .await
            .unwrap();
        assert_eq!(story, "");
    }
}
