use axum::{http::StatusCode, routing::post, Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use summa_lib::ai::{client_for, Mode};
use summa_lib::config::AppConfig;
use summa_lib::document::Document;
use summa_lib::extraction::Normalized;
use summa_lib::session::{analyze, render, SessionManager, ViewState};

const RECEIPT_ANSWER: &str = "```json\n{\"vendor_info\": {\"name\": \"Cafe\", \"date\": \"2024-01-05\"}, \"line_items\": [{\"item_name\": \"Tea\", \"quantity\": 1, \"unit_price\": 3.5, \"subtotal\": 3.5}], \"totals\": {\"subtotal\": 3.5, \"tax\": 0.28, \"total\": 3.78}}\n```";

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1/chat/completions", addr)
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "gpt-4o",
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

fn config(endpoint: String) -> AppConfig {
    AppConfig {
        openai_api_key: "sk-test".into(),
        openai_endpoint: endpoint,
        ..AppConfig::default()
    }
}

fn scan() -> Document {
    Document::from_bytes("scan.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()).unwrap()
}

#[tokio::test]
async fn receipt_end_to_end() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(completion(RECEIPT_ANSWER)) }),
    );
    let model = client_for(&config(spawn(router).await)).unwrap();

    let session = Arc::new(Mutex::new(SessionManager::new(Mode::Receipt)));
    session.lock().select_file(scan());
    assert!(analyze(&session, model.as_ref()).await.unwrap());

    let ViewState::Success(result) = session.lock().state().clone() else {
        panic!("expected a result");
    };
    let Normalized::Receipt(receipt) = &result else {
        panic!("expected a receipt");
    };
    assert_eq!(receipt.line_items[0].item_name, "Tea");
    assert!(render::render(&result).contains("$3.78"));
}

#[tokio::test]
async fn provider_failure_then_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": { "message": "The server had an error" } })),
                    )
                } else {
                    (
                        StatusCode::OK,
                        Json(completion("[{\"vendor_name\": \"Lyft\", \"expense_amount\": 18.2}]")),
                    )
                }
            }
        }),
    );
    let model = client_for(&config(spawn(router).await)).unwrap();

    let session = Arc::new(Mutex::new(SessionManager::new(Mode::Expense)));
    session.lock().select_file(scan());
    assert!(analyze(&session, model.as_ref()).await.unwrap());
    match session.lock().state() {
        ViewState::Failed(message) => assert!(message.contains("The server had an error")),
        other => panic!("expected a failure, got {:?}", other),
    }

    // retry re-runs the same document
    let ticket = session.lock().retry().unwrap();
    let outcome = summa_lib::session::run_analysis(model.as_ref(), &ticket).await;
    assert!(session.lock().complete(ticket.generation, outcome));
    match session.lock().state() {
        ViewState::Success(Normalized::Expenses(list)) => {
            assert_eq!(list[0].vendor_name, "Lyft");
        }
        other => panic!("expected expenses, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn refusal_is_shown_verbatim() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(completion("Sorry, I can't read this image.")) }),
    );
    let model = client_for(&config(spawn(router).await)).unwrap();

    let session = Arc::new(Mutex::new(SessionManager::new(Mode::Expense)));
    session.lock().select_file(scan());
    analyze(&session, model.as_ref()).await.unwrap();
    assert_eq!(
        session.lock().state(),
        &ViewState::Failed("Sorry, I can't read this image.".to_string())
    );
}
