use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use certprep_core::model::ExamType;
use serde_json::{Value, json};
use services::generation::{
    ChatCompletionsConfig, ChatCompletionsGenerator, FallbackGenerator, GenerationRequest,
    ProviderConfig, ProviderGenerator, QuestionGenerator,
};
use services::GeneratorError;
use std::sync::{Arc, Mutex};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn request(use_external_provider: bool) -> GenerationRequest {
    GenerationRequest {
        exam_name: "AWS Solutions Architect".into(),
        exam_type: ExamType::parse("solutions_architect").unwrap(),
        count: 2,
        domain: Some("Networking".into()),
        use_external_provider,
    }
}

const FENCED: &str = "Here you go:\n```json\n[{\"question_text\": \"What routes traffic between VPCs?\", \
    \"options\": [{\"letter\": \"A\", \"text\": \"Transit Gateway\"}, {\"letter\": \"B\", \"text\": \"NAT\"}], \
    \"correct_answer_letter\": \"A\"}]\n```";

#[tokio::test]
async fn chat_generator_reads_fenced_json_from_the_first_choice() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let router = Router::new()
        .route(
            "/chat/completions",
            post(
                |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(json!({"choices": [{"message": {"content": FENCED}}]}))
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let base_url = serve(router).await;

    let generator = ChatCompletionsGenerator::new(ChatCompletionsConfig {
        base_url,
        api_key: "test-key".into(),
        model: "test-model".into(),
    });
    let questions = generator.generate(&request(false)).await.unwrap();

    assert_eq!(questions.len(), 1);
    assert_eq!(
        questions[0].question_text.as_deref(),
        Some("What routes traffic between VPCs?")
    );
    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "test-model");
    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("Generate 2"));
    assert!(prompt.contains("focused on Networking"));
}

#[tokio::test]
async fn provider_generator_posts_the_exam_type_and_count() {
    let router = Router::new().route(
        "/generate-questions",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["exam_type"], "solutions_architect");
            assert_eq!(body["num_questions"], 2);
            Json(json!({"questions": [
                {"question": "Which service is DNS?", "answers": [
                    {"text": "Route 53", "is_correct": true}, {"text": "ELB"}]}
            ]}))
        }),
    );
    let base_url = serve(router).await;

    let generator = ProviderGenerator::new(ProviderConfig {
        base_url,
        api_key: "key".into(),
    });
    let questions = generator.generate(&request(true)).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert!(questions[0].options[0].is_correct);
}

#[tokio::test]
async fn failing_provider_falls_back_to_chat() {
    let router = Router::new()
        .route(
            "/provider/generate-questions",
            post(|| async { StatusCode::BAD_GATEWAY }),
        )
        .route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": FENCED}}]})) }),
        );
    let base_url = serve(router).await;

    let generator = FallbackGenerator::new(
        Some(ProviderGenerator::new(ProviderConfig {
            base_url: format!("{base_url}/provider"),
            api_key: "key".into(),
        })),
        Some(ChatCompletionsGenerator::new(ChatCompletionsConfig {
            base_url,
            api_key: "key".into(),
            model: "m".into(),
        })),
    );
    let questions = generator.generate(&request(true)).await.unwrap();
    assert_eq!(questions.len(), 1);
}

#[tokio::test]
async fn provider_error_status_is_reported() {
    let router = Router::new().route(
        "/generate-questions",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base_url = serve(router).await;

    let generator = ProviderGenerator::new(ProviderConfig {
        base_url,
        api_key: "key".into(),
    });
    let err = generator.generate(&request(true)).await.unwrap_err();
    assert!(matches!(err, GeneratorError::HttpStatus(s) if s.as_u16() == 500));
}
