//! End-to-end tests of the facade: chains, the http adapter and the
//! ready-made routes.

use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use portico::config::ProjectSettings;
use portico::core::invocation::StaticInvocation;
use portico::routes::{status_message, UNHANDLED_MESSAGE};
use portico::telemetry::{Level, Logger, MemorySink};
use portico::{
    echo, error_route, http_route, log_route, unhandled_route, Chain, EchoRoutes, HandlerConfig,
    LogProbe, Next, Project, Request, Response, Step,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn project() -> (Project, MemorySink) {
    let sink = MemorySink::new();
    let settings = ProjectSettings {
        environment: Some("sandbox".to_string()),
        ..Default::default()
    };
    let project = Project::new(settings)
        .with_logger(Logger::new(sink.clone()))
        .with_invocation(StaticInvocation("feedface-0000-7000-8000-000000000000".to_string()));
    (project, sink)
}

fn get(path: &'static str) -> (Request, Response) {
    (Request::new(Method::GET, Uri::from_static(path)), Response::new())
}

async fn body_json(response: http::Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn passing(project: &Project, journal: &Arc<Mutex<Vec<String>>>, name: &str) -> portico::WrappedHandler<Next> {
    let journal = Arc::clone(journal);
    let label = name.to_string();
    project.wrap(
        move |_req, _res, next: Next| {
            journal.lock().push(label.clone());
            next.proceed();
            Box::pin(async { Ok(()) })
        },
        HandlerConfig::named(name),
    )
}

// =============================================================================
// Chain
// =============================================================================

#[tokio::test]
async fn chain_stops_at_the_handler_that_does_not_proceed() {
    let (project, _sink) = project();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let chain = Chain::new()
        .with(passing(&project, &journal, "first"))
        .with(http_route(&project, StatusCode::OK, HandlerConfig::named("ok")))
        .with(passing(&project, &journal, "never"));
    let (mut req, mut res) = get("/");

    let ran = chain.run(&mut req, &mut res).await;

    assert_eq!(ran, 2);
    assert_eq!(chain.len(), 3);
    assert_eq!(*journal.lock(), vec!["first".to_string()]);
    assert_eq!(res.body_json(), Some(json!({ "res": { "statusCode": 200, "statusMessage": "OK" } })));
}

#[tokio::test]
async fn chain_continues_after_teardown_of_previous_handler() {
    let (project, _sink) = project();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let teardown_journal = Arc::clone(&journal);
    let config = HandlerConfig::builder()
        .name("first")
        .teardown(Step::sync(move |_req, _res| {
            teardown_journal.lock().push("first teardown".to_string());
            Ok(())
        }))
        .build();
    let first_journal = Arc::clone(&journal);
    let first = project.wrap(
        move |_req, _res, next: Next| {
            first_journal.lock().push("first".to_string());
            next.proceed();
            Box::pin(async { Ok(()) })
        },
        config,
    );

    let chain = Chain::new()
        .with(first)
        .with(passing(&project, &journal, "second"));
    let (mut req, mut res) = get("/");

    chain.run(&mut req, &mut res).await;

    assert_eq!(*journal.lock(), vec!["first", "first teardown", "second"]);
}

#[tokio::test]
async fn chained_handlers_share_once_per_request_effects() {
    let (project, sink) = project();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let chain = Chain::new()
        .with(passing(&project, &journal, "gate"))
        .with(echo(&project));
    let response = chain
        .handle(
            http::Request::builder()
                .uri("/geese?name=gerald")
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.headers()["x-project-handler"], "gate");
    assert_eq!(response.headers()["x-project-environment"], "sandbox");
    let body = body_json(response).await;
    assert_eq!(body["req"]["query"]["name"], "gerald");

    let info = sink.vars(Level::Info);
    assert_eq!(info.iter().filter(|v| v.get("req").is_some()).count(), 1);
    assert_eq!(info.iter().filter(|v| v.get("res").is_some()).count(), 1);
}

#[tokio::test]
async fn handle_classifies_json_bodies() {
    let (project, _sink) = project();
    let chain = Chain::new().with(echo(&project));

    let response = chain
        .handle(
            http::Request::builder()
                .method(Method::POST)
                .uri("/honk")
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from_static(br#"{"goose":"honk"}"#)))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["req"]["method"], "POST");
    assert_eq!(body["req"]["body"], json!({ "goose": "honk" }));
}

// =============================================================================
// Routes
// =============================================================================

#[tokio::test]
async fn http_route_known_status() {
    let (project, sink) = project();
    let handler = http_route(&project, StatusCode::IM_A_TEAPOT, HandlerConfig::named("teapot"));
    let (mut req, mut res) = get("/");

    handler.call(&mut req, &mut res, ()).await;

    assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        res.body_json(),
        Some(json!({ "res": { "statusCode": 418, "statusMessage": "I'm a teapot" } }))
    );
    assert_eq!(sink.count(Level::Warn), 0);
}

#[tokio::test]
async fn http_route_unknown_status_omits_message() {
    let (project, sink) = project();
    let status = StatusCode::from_u16(299).unwrap();
    let handler = http_route(&project, status, HandlerConfig::named("odd"));
    let (mut req, mut res) = get("/");

    handler.call(&mut req, &mut res, ()).await;

    assert_eq!(res.status_code().as_u16(), 299);
    assert_eq!(res.body_json(), Some(json!({ "res": { "statusCode": 299 } })));
    assert!(sink.contains(Level::Warn, "Status code 299 not found in statusMessage map"));
    assert!(sink.contains(Level::Debug, "Continuing..."));
    assert!(sink
        .vars(Level::Trace)
        .iter()
        .any(|v| v["204"] == "No Content"));
}

#[tokio::test]
async fn echo_reflects_the_request() {
    let (project, _sink) = project();
    let handler = echo(&project);
    let mut req = Request::new(Method::PUT, Uri::from_static("/geese/gerald?loud=true"))
        .with_header("x-goose", "honk");
    let mut res = Response::new();

    handler.call(&mut req, &mut res, ()).await;

    let body = res.body_json().unwrap();
    assert_eq!(body["req"]["method"], "PUT");
    assert_eq!(body["req"]["url"], "/geese/gerald?loud=true");
    assert_eq!(body["req"]["headers"]["x-goose"], "honk");
    assert_eq!(res.header("x-project-handler"), Some("echo"));
}

#[tokio::test]
async fn error_route_answers_each_status() {
    let (project, _sink) = project();
    for status in portico::routes::ERROR_ROUTE_STATUSES {
        let handler = error_route(&project, status);
        let (mut req, mut res) = get("/");

        handler.call(&mut req, &mut res, ()).await;

        assert_eq!(res.status_code().as_u16(), status);
        assert_eq!(res.body_json().unwrap()["errors"][0]["status"], status);
        assert_eq!(res.header("x-project-handler"), Some("error"));
    }
}

#[tokio::test]
async fn error_route_unknown_status_is_not_found() {
    let (project, _sink) = project();
    let handler = error_route(&project, 999);
    let (mut req, mut res) = get("/");

    handler.call(&mut req, &mut res, ()).await;

    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unhandled_route_hides_its_message() {
    let (project, sink) = project();
    let handler = unhandled_route(&project);
    let (mut req, mut res) = get("/");

    handler.call(&mut req, &mut res, ()).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(res.body().to_vec()).unwrap();
    assert!(!text.contains(UNHANDLED_MESSAGE));
    assert_eq!(sink.vars(Level::Fatal)[0]["unhandledError"]["message"], UNHANDLED_MESSAGE);
}

#[tokio::test]
async fn log_routes_write_their_levels() {
    let cases = [
        (LogProbe::Warn, "Logged test warn"),
        (LogProbe::Error, "Logged test error"),
        (LogProbe::Fatal, "Logged test fatal"),
        (LogProbe::Both, "Logged test warn and error"),
    ];

    for (probe, message) in cases {
        let (project, sink) = project();
        let handler = log_route(&project, probe);
        let (mut req, mut res) = get("/");

        handler.call(&mut req, &mut res, ()).await;

        assert_eq!(res.body_json(), Some(json!({ "message": message })), "{probe}");
        let warned = sink.contains(Level::Warn, "Logging test warn");
        let errored = sink.contains(Level::Error, "Logging test error");
        let fatal = sink.contains(Level::Fatal, "Logging test fatal");
        match probe {
            LogProbe::Warn => assert!(warned && !errored && !fatal),
            LogProbe::Error => assert!(!warned && errored && !fatal),
            LogProbe::Fatal => assert!(!warned && !errored && fatal),
            LogProbe::Both => assert!(warned && errored && !fatal),
        }

        let record = sink
            .records()
            .into_iter()
            .find(|r| r.message.as_deref().is_some_and(|m| m.starts_with("Logging test")))
            .unwrap();
        assert_eq!(record.tags["handler"], "log");
    }
}

#[tokio::test]
async fn echo_routes_dispatch_by_path() {
    let (project, _sink) = project();
    let routes: EchoRoutes<()> = EchoRoutes::new(&project);

    let cases: [(&'static str, u16); 6] = [
        ("/error/401", 401),
        ("/error/504", 504),
        ("/error/unhandled", 500),
        ("/error/whatever/else", 404),
        ("/log/warn", 200),
        ("/anything", 200),
    ];

    for (path, expected) in cases {
        let (mut req, mut res) = get(path);
        routes.route(path).call(&mut req, &mut res, ()).await;
        assert_eq!(res.status_code().as_u16(), expected, "{path}");
    }
}

#[tokio::test]
async fn routed_handler_through_the_http_adapter() {
    let (project, sink) = project();
    let routes: EchoRoutes<Next> = EchoRoutes::new(&project);
    let request = http::Request::builder()
        .uri("/error/418")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let chain = Chain::new().with(routes.route(request.uri().path()).clone());
    let response = chain.handle(request).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.headers()["x-project-handler"], "error");
    assert_eq!(body_json(response).await["errors"][0]["status"], 418);
    assert!(sink.vars(Level::Info).iter().any(|v| v.get("res").is_some()));
}

#[test]
fn status_messages_match_the_route_table() {
    assert_eq!(status_message(404), Some("Not Found"));
    assert_eq!(status_message(500), Some("Internal Error"));
    assert_eq!(status_message(302), None);
}
