use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use shared::{
    domain::{WebLink, WebLinkId},
    error::{ApiError, ErrorCode},
    protocol::{ServiceCall, ServiceReply},
};
use tokio::{net::TcpListener, sync::Mutex};

use super::HttpRemoteService;
use crate::{error::ServiceError, service::RemoteService, service::ServiceClient};

#[derive(Clone, Default)]
struct Received {
    calls: Arc<Mutex<Vec<(String, ServiceCall)>>>,
}

async fn handle_rpc(
    axum::extract::State(state): axum::extract::State<Received>,
    Path(canister): Path<String>,
    Json(call): Json<ServiceCall>,
) -> axum::response::Response {
    state.calls.lock().await.push((canister, call.clone()));
    match call {
        ServiceCall::GetOrderedWebLinks => Json(ServiceReply::WebLinks(vec![WebLink {
            id: WebLinkId(7),
            url: "https://example.com".into(),
            title: "Example".into(),
            description: String::new(),
        }]))
        .into_response(),
        ServiceCall::ReorderWebLinks { .. } => (
            StatusCode::FORBIDDEN,
            Json(ApiError::new(ErrorCode::Forbidden, "only admins can reorder links")),
        )
            .into_response(),
        ServiceCall::GetVisitCount => (StatusCode::OK, "not json").into_response(),
        _ => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
    }
}

async fn spawn_rpc_server() -> (String, Received) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Received::default();
    let app = Router::new()
        .route("/rpc/:canister", post(handle_rpc))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[test]
fn endpoint_requires_http_scheme() {
    assert!(matches!(
        HttpRemoteService::new("localhost:4943", "abc"),
        Err(ServiceError::Transport(_))
    ));
    let service = HttpRemoteService::new("http://127.0.0.1:4943/", "rrkah-fqaaa-aaaaa-aaaaq-cai")
        .expect("service");
    assert_eq!(
        service.endpoint().as_str(),
        "http://127.0.0.1:4943/rpc/rrkah-fqaaa-aaaaa-aaaaq-cai"
    );
}

#[tokio::test]
async fn posts_tagged_call_and_decodes_reply() {
    let (host, received) = spawn_rpc_server().await;
    let client = ServiceClient::new(Arc::new(
        HttpRemoteService::new(&host, "site-canister").expect("service"),
    ));

    let links = client.get_ordered_web_links().await.expect("links");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].id, WebLinkId(7));

    let calls = received.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "site-canister");
    assert_eq!(calls[0].1, ServiceCall::GetOrderedWebLinks);
}

#[tokio::test]
async fn non_success_status_maps_to_rejection_or_transport() {
    let (host, _received) = spawn_rpc_server().await;
    let service = HttpRemoteService::new(&host, "site-canister").expect("service");

    let rejected = service
        .call(ServiceCall::ReorderWebLinks {
            new_order: vec![WebLinkId(1)],
        })
        .await
        .expect_err("forbidden");
    assert!(matches!(rejected, ServiceError::Rejected(api) if api.code == ErrorCode::Forbidden));

    let transport = service
        .call(ServiceCall::GetAllBlogPosts)
        .await
        .expect_err("bad gateway");
    assert!(matches!(transport, ServiceError::Transport(msg) if msg.contains("getAllBlogPosts")));

    let decode = service
        .call(ServiceCall::GetVisitCount)
        .await
        .expect_err("garbage body");
    assert!(matches!(decode, ServiceError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_reads_as_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let service = HttpRemoteService::new(&format!("http://{addr}"), "c").expect("service");
    let client = ServiceClient::new(Arc::new(service));
    assert_eq!(client.get_visit_count().await, Ok(0));
    assert_eq!(
        client.increment_visit_count().await,
        Err(ServiceError::Unavailable)
    );
}
