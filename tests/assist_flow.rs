//! End-to-end assist flow against a mocked provider: validation, context
//! assembly, non-fatal collaborator failures, notices, and supersession.

mod common;

use async_trait::async_trait;
use common::{
    first_request_body, fresh_store, gemini_path, mock_config, mount_gemini_answer,
    mount_openai_answer, OPENAI_PATH,
};
use page_assist_lib::assist::{
    AssistStatus, Assistant, Notice, NoticeKind, NoticeSink, EMPTY_PROMPT_MESSAGE,
    MARKDOWN_SUFFIX, MISSING_MODEL_MESSAGE, SUCCESS_MESSAGE,
};
use page_assist_lib::capture::{CaptureBridge, CaptureRequester, CaptureSlot, ScreenshotSource};
use page_assist_lib::catalog::ProviderId;
use page_assist_lib::error::{AssistError, CaptureError};
use page_assist_lib::page::{PageExtractor, PageMetadata, StaticPage, WebpageContent};
use page_assist_lib::settings;
use page_assist_lib::state::StateStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOT: &str = "data:image/png;base64,iVBORw0KGgo=";

#[derive(Default)]
struct RecordingNotices(Mutex<Vec<Notice>>);

impl RecordingNotices {
    fn taken(&self) -> Vec<Notice> {
        self.0.lock().unwrap().clone()
    }
}

impl NoticeSink for RecordingNotices {
    fn show(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

struct FixedShot(Result<String, CaptureError>);

#[async_trait]
impl ScreenshotSource for FixedShot {
    async fn capture(&self) -> Result<String, CaptureError> {
        self.0.clone()
    }
}

struct BrokenPage;

#[async_trait]
impl PageExtractor for BrokenPage {
    async fn extract(&self) -> Result<Option<WebpageContent>, String> {
        Err("Cannot access a chrome:// URL".to_string())
    }
}

fn article() -> WebpageContent {
    WebpageContent {
        text: "Ferris is the unofficial mascot.".to_string(),
        metadata: PageMetadata {
            title: "Ferris".to_string(),
            url: "https://rustacean.net".to_string(),
            ..Default::default()
        },
    }
}

struct Harness {
    server: MockServer,
    store: Arc<StateStore>,
    notices: Arc<RecordingNotices>,
}

impl Harness {
    async fn new() -> Self {
        let (_, store) = fresh_store().await;
        Self {
            server: MockServer::start().await,
            store,
            notices: Arc::new(RecordingNotices::default()),
        }
    }

    async fn select(&self, provider: ProviderId, key: &str, model: &str) {
        settings::save_api_key(&self.store, provider, key).await.unwrap();
        self.store
            .set_selected_model(Some(model.to_string()))
            .await
            .unwrap();
    }

    fn assistant(
        &self,
        pages: Arc<dyn PageExtractor>,
        screenshots: Arc<dyn ScreenshotSource>,
    ) -> Assistant {
        Assistant::new(
            self.store.clone(),
            mock_config(&self.server),
            pages,
            screenshots,
            self.notices.clone(),
        )
    }

    fn text_only(&self) -> Assistant {
        self.assistant(
            Arc::new(StaticPage(Some(article()))),
            Arc::new(FixedShot(Err(CaptureError::Failed("unused".into())))),
        )
    }

    async fn request_count(&self) -> usize {
        self.server.received_requests().await.unwrap().len()
    }
}

// ── Validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn no_model_selected_is_rejected_without_network() {
    let h = Harness::new().await;
    let err = h.text_only().assist("Summarize").await.unwrap_err();

    assert_eq!(err.to_string(), MISSING_MODEL_MESSAGE);
    assert_eq!(h.request_count().await, 0);
    let notices = h.notices.taken();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert_eq!(notices[0].message, MISSING_MODEL_MESSAGE);
}

#[tokio::test]
async fn model_without_provider_key_is_rejected() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gemini-2.0-flash").await;

    let err = h.text_only().assist("Summarize").await.unwrap_err();
    assert_eq!(err.to_string(), MISSING_MODEL_MESSAGE);
    assert_eq!(h.request_count().await, 0);
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o-mini").await;

    let err = h.text_only().assist("   ").await.unwrap_err();
    assert!(matches!(err, AssistError::Validation(_)));
    assert_eq!(err.to_string(), EMPTY_PROMPT_MESSAGE);
    assert_eq!(h.request_count().await, 0);
}

// ── Happy paths ──────────────────────────────────────────────────────

#[tokio::test]
async fn openai_assist_appends_markdown_instruction_and_notifies() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o-mini").await;
    mount_openai_answer(&h.server, "## Summary\n- Ferris").await;

    let status = h.text_only().assist("Summarize this page").await.unwrap();
    let AssistStatus::Completed(outcome) = status else {
        panic!("expected completion, got {:?}", status);
    };
    assert_eq!(outcome.answer, "## Summary\n- Ferris");
    assert_eq!(outcome.provider, ProviderId::OpenAi);
    assert_eq!(outcome.model_id, "gpt-4o-mini");
    assert_eq!(outcome.screenshot, None);

    let body = first_request_body(&h.server).await;
    let content = body["messages"][0]["content"].as_array().unwrap();
    assert_eq!(
        content[0]["text"],
        format!("Summarize this page{}", MARKDOWN_SUFFIX)
    );
    assert!(content[1]["text"].as_str().unwrap().contains("Title: Ferris"));
    assert_eq!(content.len(), 2);

    let notices = h.notices.taken();
    assert_eq!(notices, vec![Notice::success(SUCCESS_MESSAGE)]);
}

#[tokio::test]
async fn deep_context_sends_screenshot_to_gemini() {
    let h = Harness::new().await;
    h.select(ProviderId::Gemini, "g-1", "gemini-2.0-flash").await;
    h.store.set_context_mode(true).await.unwrap();
    mount_gemini_answer(&h.server, "gemini-2.0-flash", "It shows a crab.").await;

    let assistant = h.assistant(
        Arc::new(StaticPage(Some(article()))),
        Arc::new(FixedShot(Ok(SHOT.to_string()))),
    );
    let status = assistant.assist("What is on screen?").await.unwrap();
    assert!(matches!(status, AssistStatus::Completed(ref o) if o.answer == "It shows a crab."));

    let body = first_request_body(&h.server).await;
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert!(parts[0]["text"].as_str().unwrap().starts_with("Webpage Context:"));
    assert_eq!(parts[2]["inline_data"]["mime_type"], "image/png");
    assert_eq!(parts[2]["inline_data"]["data"], "iVBORw0KGgo=");
}

#[tokio::test]
async fn shallow_context_never_asks_for_a_screenshot() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o").await;
    mount_openai_answer(&h.server, "ok").await;

    let slot = Arc::new(CaptureSlot::new());
    struct MustNotCapture;
    impl CaptureRequester for MustNotCapture {
        fn request_capture(&self) -> Result<(), String> {
            panic!("capture requested in shallow mode");
        }
    }
    let bridge = CaptureBridge::new(slot, Arc::new(MustNotCapture), Duration::from_secs(1));
    let assistant = h.assistant(Arc::new(StaticPage(None)), Arc::new(bridge));

    assert!(assistant.assist("hi").await.is_ok());
}

#[tokio::test]
async fn screenshot_via_capture_bridge() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o").await;
    h.store.set_context_mode(true).await.unwrap();
    mount_openai_answer(&h.server, "seen").await;

    struct Capturer(Arc<CaptureSlot>);
    impl CaptureRequester for Capturer {
        fn request_capture(&self) -> Result<(), String> {
            let slot = self.0.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                slot.complete(SHOT.to_string());
            });
            Ok(())
        }
    }
    let slot = Arc::new(CaptureSlot::new());
    let bridge = CaptureBridge::new(
        slot.clone(),
        Arc::new(Capturer(slot.clone())),
        Duration::from_secs(2),
    );
    let assistant = h.assistant(Arc::new(StaticPage(None)), Arc::new(bridge));

    let status = assistant.assist("Describe").await.unwrap();
    assert!(matches!(status, AssistStatus::Completed(ref o) if o.screenshot.as_deref() == Some(SHOT)));
    let body = first_request_body(&h.server).await;
    let content = body["messages"][0]["content"].as_array().unwrap();
    assert_eq!(content.last().unwrap()["type"], "image_url");
}

// ── Non-fatal collaborator failures ──────────────────────────────────

#[tokio::test]
async fn screenshot_failure_falls_back_to_text_only() {
    let h = Harness::new().await;
    h.select(ProviderId::Gemini, "g-1", "gemini-1.5-pro").await;
    h.store.set_context_mode(true).await.unwrap();
    mount_gemini_answer(&h.server, "gemini-1.5-pro", "text only answer").await;

    let assistant = h.assistant(
        Arc::new(StaticPage(Some(article()))),
        Arc::new(FixedShot(Err(CaptureError::TimedOut(30)))),
    );
    let status = assistant.assist("Summarize").await.unwrap();
    assert!(matches!(status, AssistStatus::Completed(ref o) if o.screenshot.is_none()));

    let body = first_request_body(&h.server).await;
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|p| p.get("inline_data").is_none()));
}

#[tokio::test]
async fn extractor_failure_sends_prompt_alone() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o-mini").await;
    mount_openai_answer(&h.server, "fine").await;

    let assistant = h.assistant(
        Arc::new(BrokenPage),
        Arc::new(FixedShot(Err(CaptureError::Cancelled))),
    );
    let status = assistant.assist("Explain").await.unwrap();
    assert!(matches!(status, AssistStatus::Completed(ref o) if o.webpage.is_none()));

    let body = first_request_body(&h.server).await;
    assert_eq!(body["messages"][0]["content"].as_array().unwrap().len(), 1);
}

// ── Provider failures ────────────────────────────────────────────────

#[tokio::test]
async fn provider_error_message_reaches_the_notice() {
    let h = Harness::new().await;
    h.select(ProviderId::Gemini, "bad", "gemini-2.0-flash").await;
    Mock::given(method("POST"))
        .and(path(gemini_path("gemini-2.0-flash")))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&h.server)
        .await;

    let err = h.text_only().assist("Summarize").await.unwrap_err();
    assert!(matches!(err, AssistError::Provider(_)));
    assert_eq!(h.notices.taken(), vec![Notice::error("API key not valid")]);
}

#[tokio::test]
async fn malformed_response_shows_generic_failure() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o-mini").await;
    Mock::given(method("POST"))
        .and(path(OPENAI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"object": "list"})))
        .mount(&h.server)
        .await;

    let err = h.text_only().assist("Summarize").await.unwrap_err();
    assert!(matches!(err, AssistError::Contract { .. }));
    assert_eq!(h.notices.taken(), vec![Notice::error("Failed to generate result")]);
}

// ── Supersession ─────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_latest_assist_reports() {
    let h = Harness::new().await;
    h.select(ProviderId::OpenAi, "sk-1", "gpt-4o-mini").await;
    Mock::given(method("POST"))
        .and(path(OPENAI_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "late"}}]
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&h.server)
        .await;

    let assistant = h.text_only();
    let (first, second) = tokio::join!(assistant.assist("one"), assistant.assist("two"));

    assert_eq!(first.unwrap(), AssistStatus::Superseded { sequence: 1 });
    let AssistStatus::Completed(outcome) = second.unwrap() else {
        panic!("latest assist should complete");
    };
    assert_eq!(outcome.sequence, 2);
    assert_eq!(assistant.latest_sequence(), 2);
    assert_eq!(h.notices.taken(), vec![Notice::success(SUCCESS_MESSAGE)]);
}
