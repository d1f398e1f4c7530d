//! Tests for `TelegramProvider`.

use super::{
    DeliveryError, HttpClient, HttpError, HttpRequest, HttpResponse, MessageSender,
    ProviderOptions, RetryPolicy, TelegramProvider,
};
use crate::message::TelegramMessage;
use crate::time::{InstantSleeper, Sleeper};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock HTTP client that replays a scripted sequence of responses.
///
/// Once the script runs out, the last entry's status is repeated.
#[derive(Debug)]
struct MockClient {
    responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    call_count: AtomicUsize,
}

impl MockClient {
    fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    fn status(code: u16) -> Result<HttpResponse, HttpError> {
        Ok(HttpResponse::new(
            http::StatusCode::from_u16(code).unwrap(),
            format!("status {code}").into_bytes(),
        ))
    }

    fn always(code: u16) -> Self {
        Self::new(vec![Self::status(code)])
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn captured_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for MockClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);

        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            return responses.remove(0);
        }
        match &responses[0] {
            Ok(response) => Ok(response.clone()),
            Err(_) => Err(HttpError::Timeout),
        }
    }
}

impl HttpClient for Arc<MockClient> {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).request(req).await
    }
}

/// Client that never answers, for timeout tests.
struct HangingClient;

impl HttpClient for HangingClient {
    async fn request(&self, _req: HttpRequest) -> Result<HttpResponse, HttpError> {
        std::future::pending().await
    }
}

/// Sleeper that records requested delays without waiting.
#[derive(Debug, Default, Clone)]
struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn api_url() -> url::Url {
    url::Url::parse("https://api.telegram.org").unwrap()
}

fn provider(client: Arc<MockClient>) -> TelegramProvider<Arc<MockClient>, InstantSleeper> {
    TelegramProvider::new(client, &api_url(), "bot:tok", "111")
        .unwrap()
        .with_sleeper(InstantSleeper)
}

mod construction {
    use super::*;

    #[test]
    fn builds_send_message_endpoint_from_token() {
        let provider = provider(Arc::new(MockClient::always(200)));

        assert_eq!(
            provider.endpoint().as_str(),
            "https://api.telegram.org/botbot:tok/sendMessage"
        );
        assert_eq!(provider.chat_id(), "111");
    }

    #[test]
    fn tolerates_trailing_slash_on_api_url() {
        let api = url::Url::parse("http://localhost:8081/").unwrap();
        let provider = TelegramProvider::new((), &api, "42:abc", "chat").unwrap();

        assert_eq!(
            provider.endpoint().as_str(),
            "http://localhost:8081/bot42:abc/sendMessage"
        );
    }

    #[test]
    fn uses_default_timeout_and_policy() {
        let provider = TelegramProvider::new((), &api_url(), "t", "c").unwrap();

        assert_eq!(provider.timeout(), Duration::from_secs(5));
        assert_eq!(*provider.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn with_options_applies_timeout() {
        let options = ProviderOptions::from_query([("timeout", "3")]).unwrap();
        let provider = TelegramProvider::new((), &api_url(), "t", "c")
            .unwrap()
            .with_options(options);

        assert_eq!(provider.timeout(), Duration::from_secs(3));
    }
}

mod send {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn posts_json_payload_with_chat_id() {
        let client = Arc::new(MockClient::always(200));
        let provider = provider(client.clone());

        provider.send(&TelegramMessage::text("hi")).await.unwrap();

        let requests = client.captured_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, http::Method::POST);
        assert_eq!(
            requests[0].url.as_str(),
            "https://api.telegram.org/botbot:tok/sendMessage"
        );
        assert_eq!(
            requests[0].headers.get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "chat_id": "111",
                "text": "hi",
                "disable_notifications": 0,
                "disable_web_page_preview": 0
            })
        );
    }

    #[tokio::test]
    async fn payload_includes_optional_fields_when_set() {
        let client = Arc::new(MockClient::always(200));
        let provider = provider(client.clone());
        let message = TelegramMessage {
            text: "<b>hi</b>".to_string(),
            parse_mode: Some("HTML".to_string()),
            disable_web_page_preview: true,
            disable_notifications: false,
            reply_to_message_id: Some(7),
        };

        provider.send(&message).await.unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(client.captured_requests()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["disable_web_page_preview"], 1);
        assert_eq!(body["reply_to_message_id"], 7);
    }

    #[tokio::test]
    async fn any_2xx_is_success() {
        let client = Arc::new(MockClient::always(204));

        provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap();

        assert_eq!(client.calls(), 1);
    }
}

mod retries {
    use super::*;

    #[tokio::test]
    async fn retries_server_errors_up_to_max_retries() {
        let client = Arc::new(MockClient::always(500));
        let provider = provider(client.clone());

        let error = provider
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert_eq!(client.calls(), 5);
        assert!(matches!(
            error,
            DeliveryError::RetriesExhausted { attempts: 5, .. }
        ));
        assert_eq!(error.status(), Some(http::StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn respects_custom_retry_count() {
        let client = Arc::new(MockClient::always(503));
        let provider = provider(client.clone()).with_retry_policy(RetryPolicy::new().with_max_retries(2));

        let _ = provider.send(&TelegramMessage::text("hi")).await;

        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let client = Arc::new(MockClient::always(400));
        let provider = provider(client.clone());

        let error = provider
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert_eq!(client.calls(), 1);
        assert!(matches!(error, DeliveryError::Rejected(_)));
        assert_eq!(error.status(), Some(http::StatusCode::BAD_REQUEST));
        assert!(error.to_string().contains("status 400"));
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let client = Arc::new(MockClient::always(404));

        let error = provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert_eq!(client.calls(), 1);
        assert_eq!(error.status(), Some(http::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let client = Arc::new(MockClient::new(vec![
            Err(HttpError::Timeout),
            MockClient::status(502),
            MockClient::status(200),
        ]));

        provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap();

        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn fatal_status_after_transient_failure_stops_immediately() {
        let client = Arc::new(MockClient::new(vec![
            MockClient::status(500),
            MockClient::status(404),
            MockClient::status(200),
        ]));

        let result = provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await;

        assert!(matches!(result, Err(DeliveryError::Rejected(_))));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn connection_errors_are_retried_then_surfaced() {
        let client = Arc::new(MockClient::new(vec![Err(HttpError::Connection(Box::new(
            std::io::Error::other("refused"),
        )))]));

        let error = provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert_eq!(client.calls(), 5);
        assert_eq!(error.status(), None);
    }

    #[tokio::test]
    async fn invalid_url_is_not_retried() {
        let client = Arc::new(MockClient::new(vec![Err(HttpError::InvalidUrl(
            "bad".to_string(),
        ))]));

        let result = provider(client.clone())
            .send(&TelegramMessage::text("hi"))
            .await;

        assert!(matches!(result, Err(DeliveryError::Rejected(_))));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn sleeps_on_exponential_schedule() {
        let client = Arc::new(MockClient::always(500));
        let sleeper = RecordingSleeper::default();
        let provider = TelegramProvider::new(client, &api_url(), "t", "c")
            .unwrap()
            .with_sleeper(sleeper.clone());

        let _ = provider.send(&TelegramMessage::text("hi")).await;

        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[tokio::test]
    async fn stops_when_backoff_budget_is_spent() {
        let client = Arc::new(MockClient::always(500));
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new()
            .with_max_retries(10)
            .with_initial_delay(Duration::from_secs(4))
            .with_max_backoff(Duration::from_secs(10));
        let provider = TelegramProvider::new(client.clone(), &api_url(), "t", "c")
            .unwrap()
            .with_sleeper(sleeper.clone())
            .with_retry_policy(policy);

        let error = provider
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        // 4s + 6s (clamped from 8s) exhausts the 10s budget
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(4), Duration::from_secs(6)]
        );
        assert_eq!(client.calls(), 3);
        assert!(matches!(
            error,
            DeliveryError::RetriesExhausted { attempts: 3, .. }
        ));
    }
}

mod timeout {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hanging_request_times_out_and_is_retried() {
        let provider = TelegramProvider::new(HangingClient, &api_url(), "t", "c")
            .unwrap()
            .with_sleeper(InstantSleeper)
            .with_timeout(Duration::from_secs(3))
            .with_retry_policy(RetryPolicy::new().with_max_retries(1));

        let started = tokio::time::Instant::now();
        let error = provider
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DeliveryError::RetriesExhausted { attempts: 2, .. }
        ));
        assert!(error.to_string().contains("timed out"));
        assert!(started.elapsed() >= Duration::from_secs(6));
    }
}

mod redaction {
    use super::*;
    use crate::provider::ReqwestClient;

    #[tokio::test]
    async fn connection_failure_never_exposes_token() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let api = url::Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
        let client = ReqwestClient::new().unwrap();
        let provider = TelegramProvider::new(client, &api, "123:SECRETTOKEN", "111")
            .unwrap()
            .with_retry_policy(RetryPolicy::new().with_max_retries(0));

        let error = provider
            .send(&TelegramMessage::text("hi"))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("Connection error"));
        assert!(!error.to_string().contains("SECRETTOKEN"));
        assert!(!format!("{error:?}").contains("SECRETTOKEN"));
    }
}
