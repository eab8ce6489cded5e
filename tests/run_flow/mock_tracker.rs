//! Mock issue tracker.
//!
//! Accepts issue batches on `POST /issues`, records them, and answers with
//! one successful result per issue.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, post, web};
use serde_json::{Value, json};

#[derive(Default)]
pub struct MockTrackerState {
    pub batches: Vec<Value>,
    pub auth_headers: Vec<Option<String>>,
}

pub struct MockTracker {
    pub url: String,
    pub state: Arc<Mutex<MockTrackerState>>,
}

#[post("/issues")]
async fn create_issues(
    req: HttpRequest,
    state: web::Data<Arc<Mutex<MockTrackerState>>>,
    body: web::Json<Value>,
) -> HttpResponse {
    let body = body.into_inner();
    let results: Vec<Value> = body["issues"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, issue)| {
            json!({
                "reference": issue["reference"],
                "success": true,
                "url": format!("https://tracker.test/issues/{}", i + 1),
            })
        })
        .collect();

    let mut state = state.lock().unwrap();
    state.auth_headers.push(
        req.headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    state.batches.push(body);

    HttpResponse::Ok().json(json!({ "results": results }))
}

impl MockTracker {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockTrackerState::default()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{}/issues", port);

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .service(create_issues)
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Fire and forget; the server lives for the process lifetime
        tokio::spawn(server);

        MockTracker { url, state }
    }
}
