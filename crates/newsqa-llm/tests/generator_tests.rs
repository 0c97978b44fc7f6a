use newsqa_core::config::{LlmConfig, LlmProvider};
use newsqa_core::traits::Generator;
use newsqa_llm::extractive::NO_ANSWER;
use newsqa_llm::gemini::parse_response;
use newsqa_llm::{get_default_generator, ExtractiveGenerator, GeminiError, GeminiGenerator};

#[test]
fn extractive_picks_the_best_matching_sentence() {
    let context = "The Eiffel Tower opened in 1889.\n\n\
                   Paris is the capital of France. It has the Eiffel Tower.";
    let answer = ExtractiveGenerator::new()
        .generate("What is the capital of France?", context)
        .expect("answer");
    assert_eq!(answer, "Paris is the capital of France.");
}

#[test]
fn extractive_prefers_earlier_sentence_on_ties() {
    let context = "Rates rose in March.\nRates rose again in June.";
    let answer =
        ExtractiveGenerator::new().generate("When did rates rise?", context).expect("answer");
    assert_eq!(answer, "Rates rose in March.");
}

#[test]
fn extractive_without_overlap_does_not_know() {
    let g = ExtractiveGenerator::new();
    assert_eq!(g.generate("Who won the match?", "").expect("answer"), NO_ANSWER);
    assert_eq!(g.generate("Who won the match?", "Bread prices fell.").expect("answer"), NO_ANSWER);
}

#[test]
fn parses_first_candidate_text() {
    let body = r#"{
        "candidates": [
            {
                "content": {
                    "role": "model",
                    "parts": [{"text": "Paris "}, {"text": "is the capital."}]
                },
                "finishReason": "STOP"
            },
            {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
        ],
        "usageMetadata": {"promptTokenCount": 12}
    }"#;
    assert_eq!(parse_response(body).expect("parse"), "Paris is the capital.");
}

#[test]
fn blocked_or_empty_responses_are_errors() {
    let blocked = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
    match parse_response(blocked) {
        Err(GeminiError::EmptyResponse { reason }) => assert_eq!(reason.as_deref(), Some("SAFETY")),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(
        parse_response(r#"{"promptFeedback": {}}"#),
        Err(GeminiError::EmptyResponse { reason: None })
    ));
    assert!(matches!(parse_response("<html>"), Err(GeminiError::Parse { .. })));
}

#[test]
fn gemini_requires_an_api_key() {
    if std::env::var("GEMINI_API_KEY").is_ok() {
        return;
    }
    let config = LlmConfig { api_key: Some("   ".into()), ..LlmConfig::default() };
    assert!(matches!(GeminiGenerator::new(&config), Err(GeminiError::MissingApiKey)));
}

#[test]
fn gemini_builds_with_explicit_key() {
    let config = LlmConfig {
        api_key: Some("test-key".into()),
        model: "gemini-test".into(),
        ..LlmConfig::default()
    };
    let g = GeminiGenerator::new(&config).expect("generator");
    assert_eq!(g.model(), "gemini-test");
}

#[test]
fn unreachable_endpoint_is_a_network_error() {
    let config = LlmConfig {
        api_key: Some("test-key".into()),
        api_base: "http://127.0.0.1:9".into(),
        timeout_secs: 2,
        ..LlmConfig::default()
    };
    let g = GeminiGenerator::new(&config).expect("generator");
    let err = g.generate("q", "c").expect_err("no server on the discard port");
    assert!(matches!(err.downcast_ref::<GeminiError>(), Some(GeminiError::Network { .. })));
}

#[test]
fn provider_selects_generator() {
    let config = LlmConfig { provider: LlmProvider::Extractive, ..LlmConfig::default() };
    let g = get_default_generator(&config).expect("generator");
    let answer =
        g.generate("capital of France?", "Paris is the capital of France.").expect("answer");
    assert_eq!(answer, "Paris is the capital of France.");
}

#[test]
fn deferred_generator_builds_on_first_use() {
    let config = LlmConfig { provider: LlmProvider::Extractive, ..LlmConfig::default() };
    let g = newsqa_llm::DeferredGenerator::new(config);
    let answer =
        g.generate("capital of France?", "Paris is the capital of France.").expect("answer");
    assert_eq!(answer, "Paris is the capital of France.");
}

#[test]
fn gemini_error_messages() {
    assert_eq!(
        GeminiError::Api { status: 429, message: "quota".into() }.to_string(),
        "API error (429): quota"
    );
    assert_eq!(
        GeminiError::EmptyResponse { reason: Some("SAFETY".into()) }.to_string(),
        "Model returned no text (finish reason SAFETY)"
    );
    assert_eq!(GeminiError::EmptyResponse { reason: None }.to_string(), "Model returned no text");
    let as_std: &dyn std::error::Error = &GeminiError::MissingApiKey;
    assert!(as_std.to_string().contains("GEMINI_API_KEY"));
}
