//! In-process mock of the Management Activity API: token endpoint plus the
//! subscriptions/content/audit routes, with scriptable responses and request
//! recording for assertions.

// Each test binary uses its own slice of this module.
#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode, Uri};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const TEST_TOKEN: &str = "test-token";

/// Scriptable feed state shared between a test and the mock server.
#[derive(Clone, Default)]
pub struct MockFeed {
    inner: Arc<RwLock<FeedState>>,
    token_requests: Arc<AtomicUsize>,
}

#[derive(Default)]
struct FeedState {
    subscriptions: Vec<Value>,
    content_pages: HashMap<String, Vec<Vec<Value>>>,
    content_failures: HashMap<String, (u16, String, String)>,
    audits: HashMap<String, Vec<Value>>,
    content_queries: Vec<ContentQuery>,
    audit_queries: Vec<String>,
    started: Vec<(String, Option<Value>)>,
    stopped: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ContentQuery {
    pub content_type: String,
    pub start_time: String,
    pub end_time: String,
    pub publisher: String,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, content_types: &[&str]) {
        let mut state = self.inner.write().expect("mock feed poisoned");
        state.subscriptions = content_types
            .iter()
            .map(|ct| json!({ "contentType": ct, "status": "enabled" }))
            .collect();
    }

    pub fn set_content(&self, content_type: &str, blobs: Vec<Value>) {
        self.set_content_pages(content_type, vec![blobs]);
    }

    pub fn set_content_pages(&self, content_type: &str, pages: Vec<Vec<Value>>) {
        let mut state = self.inner.write().expect("mock feed poisoned");
        state.content_failures.remove(content_type);
        state.content_pages.insert(content_type.to_owned(), pages);
    }

    pub fn fail_content(&self, content_type: &str, status: u16, code: &str, message: &str) {
        let mut state = self.inner.write().expect("mock feed poisoned");
        state.content_pages.remove(content_type);
        state.content_failures.insert(
            content_type.to_owned(),
            (status, code.to_owned(), message.to_owned()),
        );
    }

    pub fn set_audits(&self, content_id: &str, records: Vec<Value>) {
        let mut state = self.inner.write().expect("mock feed poisoned");
        state.audits.insert(content_id.to_owned(), records);
    }

    pub fn content_queries(&self) -> Vec<ContentQuery> {
        self.inner
            .read()
            .expect("mock feed poisoned")
            .content_queries
            .clone()
    }

    pub fn audit_queries(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("mock feed poisoned")
            .audit_queries
            .clone()
    }

    pub fn started(&self) -> Vec<(String, Option<Value>)> {
        self.inner.read().expect("mock feed poisoned").started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.inner.read().expect("mock feed poisoned").stopped.clone()
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }
}

/// A content blob descriptor in the API's wire shape.
pub fn blob(content_id: &str, content_type: &str, created: &str) -> Value {
    json!({
        "contentType": content_type,
        "contentId": content_id,
        "contentUri": format!("https://mock.invalid/audit/{content_id}"),
        "contentCreated": created,
        "contentExpiration": "",
    })
}

/// A minimal audit record in the API's wire shape.
pub fn audit_record(id: &str, operation: &str) -> Value {
    json!({
        "Id": id,
        "RecordType": "ExchangeAdmin",
        "CreationTime": "2024-01-01T11:30:00",
        "Operation": operation,
        "OrganizationId": "org",
        "UserType": 2,
        "UserKey": "key",
        "UserId": "admin@example.net",
        "ClientIP": "203.0.113.7",
    })
}

pub struct MockApiServer {
    base: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockApiServer {
    pub async fn start(feed: MockFeed) -> Result<Self> {
        let listener =
            std::net::TcpListener::bind("127.0.0.1:0").context("failed to bind mock listener")?;
        listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let base = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let service_base = base.clone();
        let make_service = make_service_fn(move |_| {
            let feed = feed.clone();
            let base = service_base.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    serve_request(feed.clone(), base.clone(), req)
                }))
            }
        });

        let server = Server::from_tcp(listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock API server stopped: {err}");
            }
        });

        Ok(Self {
            base,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Value for `ApiClientOptions::api_base`.
    pub fn feed_url(&self) -> String {
        format!("{}/feed/", self.base)
    }

    /// Value for `ApiClientOptions::token_url`.
    pub fn token_url(&self) -> String {
        format!("{}/token", self.base)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    feed: MockFeed,
    base: String,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = query_map(req.uri());

    if method == Method::POST && path == "/token" {
        feed.token_requests.fetch_add(1, Ordering::SeqCst);
        return Ok(json_response(
            StatusCode::OK,
            json!({
                "token_type": "Bearer",
                "access_token": TEST_TOKEN,
                "expires_in": "3599",
            }),
        ));
    }

    // Everything under the feed requires the bearer token issued above.
    let authorized = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {TEST_TOKEN}"))
        .unwrap_or(false);
    if !authorized {
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            "AF10001",
            "missing or invalid bearer token",
        ));
    }

    match (method, path.as_str()) {
        (Method::GET, "/feed/subscriptions/list") => {
            let state = feed.inner.read().expect("mock feed poisoned");
            Ok(json_response(
                StatusCode::OK,
                Value::Array(state.subscriptions.clone()),
            ))
        }
        (Method::GET, "/feed/subscriptions/content") => {
            let content_type = query.get("contentType").cloned().unwrap_or_default();
            let page: usize = query
                .get("page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);

            let mut state = feed.inner.write().expect("mock feed poisoned");
            if page == 0 {
                state.content_queries.push(ContentQuery {
                    content_type: content_type.clone(),
                    start_time: query.get("startTime").cloned().unwrap_or_default(),
                    end_time: query.get("endTime").cloned().unwrap_or_default(),
                    publisher: query
                        .get("PublisherIdentifier")
                        .cloned()
                        .unwrap_or_default(),
                });
            }

            if let Some((status, code, message)) = state.content_failures.get(&content_type) {
                let status =
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return Ok(error_response(status, code, message));
            }

            let pages = state.content_pages.get(&content_type);
            let body = pages
                .and_then(|pages| pages.get(page))
                .cloned()
                .unwrap_or_default();
            let has_next = pages.map(|pages| page + 1 < pages.len()).unwrap_or(false);
            drop(state);

            let mut response = json_response(StatusCode::OK, Value::Array(body));
            if has_next {
                let next = format!(
                    "{base}/feed/subscriptions/content?contentType={content_type}&page={}",
                    page + 1
                );
                response.headers_mut().insert(
                    "NextPageUri",
                    next.parse().expect("next page uri should be a valid header"),
                );
            }
            Ok(response)
        }
        (Method::POST, "/feed/subscriptions/start") => {
            let content_type = query.get("contentType").cloned().unwrap_or_default();
            let body = hyper::body::to_bytes(req.into_body()).await.ok();
            let webhook = body
                .filter(|bytes| !bytes.is_empty())
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
            let mut state = feed.inner.write().expect("mock feed poisoned");
            state.started.push((content_type.clone(), webhook));
            Ok(json_response(
                StatusCode::OK,
                json!({ "contentType": content_type, "status": "enabled" }),
            ))
        }
        (Method::POST, "/feed/subscriptions/stop") => {
            let content_type = query.get("contentType").cloned().unwrap_or_default();
            let mut state = feed.inner.write().expect("mock feed poisoned");
            state.stopped.push(content_type);
            Ok(Response::new(Body::empty()))
        }
        (Method::GET, path) if path.starts_with("/feed/audit/") => {
            let content_id = path.trim_start_matches("/feed/audit/").to_owned();
            let mut state = feed.inner.write().expect("mock feed poisoned");
            state.audit_queries.push(content_id.clone());
            let records = state.audits.get(&content_id).cloned().unwrap_or_default();
            Ok(json_response(StatusCode::OK, Value::Array(records)))
        }
        _ => Ok(error_response(
            StatusCode::NOT_FOUND,
            "AF40400",
            "unknown route",
        )),
    }
}

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response<Body> {
    json_response(
        status,
        json!({ "error": { "code": code, "message": message } }),
    )
}

fn query_map(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((percent_decode(key), percent_decode(value)))
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = &s[i + 1..i + 3];
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
