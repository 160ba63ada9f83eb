//! Full relay exchanges over loopback TCP: discovery, message/send, gateway adapters and the
//! failure modes a requester can observe.

use std::time::Duration;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use orderlink_core::config::{AppConfig, RelayMode};
use orderlink_core::{
    CapabilityDescriptor, CatalogItem, Commitment, FulfillmentRequest, OrderResult, OrderStatus,
    RelayError, Requirements, TaskSpecification,
};
use orderlink_relay::{respond, RelayClient};
use orderlink_server::bootstrap::bootstrap_with_config;
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let address = format!("http://{}", listener.local_addr().expect("local addr"));
    (listener, address)
}

fn serve(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
}

async fn closed_address() -> String {
    let (listener, address) = listen().await;
    drop(listener);
    address
}

/// Catalog and fulfillment backends speaking the HTTP gateway contract.
async fn spawn_backends() -> (String, String) {
    async fn catalog() -> Json<Vec<CatalogItem>> {
        Json(vec![
            CatalogItem::new("margherita", 1800, "tomato, mozzarella, basil"),
            CatalogItem::new("pepperoni", 2200, "spicy pepperoni"),
            CatalogItem::new("seafood", 1900, "prawns and squid"),
            CatalogItem::new("marinara", 1200, "tomato, garlic, oregano"),
        ])
    }

    async fn orders(Json(request): Json<FulfillmentRequest>) -> Json<Commitment> {
        Json(Commitment {
            ordered_item: request.item_name,
            price: request.price,
            estimated_delivery: "2026-10-18T12:35:00Z".to_string(),
        })
    }

    let (listener, address) = listen().await;
    serve(listener, Router::new().route("/catalog", get(catalog)).route("/orders", post(orders)));
    (format!("{address}/catalog"), format!("{address}/orders"))
}

async fn spawn_relay(mut config: AppConfig) -> String {
    let (listener, address) = listen().await;
    config.server.public_url = Some(format!("{address}/"));
    let app = bootstrap_with_config(config).expect("bootstrap");
    serve(listener, app.router());
    address
}

async fn spawn_fulfiller() -> String {
    let (catalog_url, fulfillment_url) = spawn_backends().await;
    let mut config = AppConfig::default();
    config.gateways.catalog_url = Some(catalog_url);
    config.gateways.fulfillment_url = Some(fulfillment_url);
    spawn_relay(config).await
}

/// A peer with a valid descriptor whose relay endpoint is handled by `relay`.
async fn spawn_peer(relay: Router<CapabilityDescriptor>) -> String {
    async fn serve_descriptor(
        State(descriptor): State<CapabilityDescriptor>,
    ) -> Json<CapabilityDescriptor> {
        Json(descriptor)
    }

    let (listener, address) = listen().await;
    let descriptor = CapabilityDescriptor::new("Peer", "test peer", format!("{address}/"), vec![]);
    serve(
        listener,
        relay.route("/.well-known/agent-card.json", get(serve_descriptor)).with_state(descriptor),
    );
    address
}

fn scenario_task() -> TaskSpecification {
    TaskSpecification::new(Some("t-1"), Requirements::new(Some("margherita"), Some(2000)))
}

#[tokio::test]
async fn scenario_task_is_confirmed_end_to_end() {
    let fulfiller = spawn_fulfiller().await;

    let result = RelayClient::new(Duration::from_secs(5))
        .send(&fulfiller, &scenario_task())
        .await
        .expect("relay exchange");

    assert_eq!(result.status(), OrderStatus::Confirmed);
    assert_eq!(result.task_id(), Some("t-1"));
    assert_eq!(result.ordered_item(), Some("margherita"));
    assert_eq!(result.price(), Some(1800));
    assert_eq!(result.estimated_delivery(), Some("2026-10-18T12:35:00Z"));
    assert_eq!(result.reason(), None);
}

#[tokio::test]
async fn budget_only_task_picks_best_affordable_item() {
    let fulfiller = spawn_fulfiller().await;
    let task = TaskSpecification::new(Some("t-2"), Requirements::new(Some("calzone"), Some(2000)));

    let result =
        RelayClient::new(Duration::from_secs(5)).send(&fulfiller, &task).await.expect("relay");

    assert_eq!(result.ordered_item(), Some("seafood"));
    assert_eq!(result.price(), Some(1900));
}

#[tokio::test]
async fn static_gateways_serve_the_pizza_menu() {
    let fulfiller = spawn_relay(AppConfig::default()).await;
    let task = TaskSpecification::new(None, Requirements::default());

    let result =
        RelayClient::new(Duration::from_secs(5)).send(&fulfiller, &task).await.expect("relay");

    assert_eq!(result.status(), OrderStatus::Confirmed);
    assert_eq!(result.task_id(), None);
    assert_eq!(result.ordered_item(), Some("marinara"));
    assert!(result.estimated_delivery().is_some_and(|at| at.ends_with('Z')));
}

#[tokio::test]
async fn discover_returns_the_advertised_descriptor() {
    let fulfiller = spawn_fulfiller().await;

    let descriptor =
        RelayClient::default().discover(&format!("{fulfiller}/")).await.expect("descriptor");

    assert_eq!(descriptor.url, format!("{fulfiller}/"));
    assert!(descriptor.offers("resolve_order_spec"));
}

#[tokio::test]
async fn unreachable_peer_is_a_hard_fault() {
    let address = closed_address().await;

    let error = RelayClient::new(Duration::from_secs(2))
        .send(&address, &scenario_task())
        .await
        .expect_err("nothing is listening");

    assert!(matches!(error, RelayError::PeerUnreachable { .. }));
    assert!(error.is_hard_fault());
}

#[tokio::test]
async fn missing_descriptor_is_invalid_descriptor() {
    let (listener, address) = listen().await;
    serve(listener, Router::new());

    let error = RelayClient::new(Duration::from_secs(2))
        .send(&address, &scenario_task())
        .await
        .expect_err("404 descriptor");

    assert_eq!(error.kind(), "invalid_descriptor");
}

#[tokio::test]
async fn slow_peer_times_out() {
    async fn stall() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Json(json!({}))
    }
    let peer = spawn_peer(Router::new().route("/", post(stall))).await;

    let error = RelayClient::new(Duration::from_millis(300))
        .send(&peer, &scenario_task())
        .await
        .expect_err("deadline exceeded");

    assert_eq!(error, RelayError::Timeout { deadline_ms: 300 });
}

#[tokio::test]
async fn descriptor_pointing_at_a_dead_relay_url_is_a_transport_fault() {
    let (listener, address) = listen().await;
    let stale = CapabilityDescriptor::new("Stale", "moved away", closed_address().await, vec![]);
    let card = get(move || async move { Json(stale) });
    serve(listener, Router::new().route("/.well-known/agent-card.json", card));

    let error = RelayClient::new(Duration::from_secs(2))
        .send(&address, &scenario_task())
        .await
        .expect_err("relay endpoint refuses connections");

    assert!(matches!(error, RelayError::Transport(_)));
    assert_eq!(error.kind(), "relay_transport_error");
    assert!(error.is_hard_fault());
}

#[tokio::test]
async fn non_json_reply_becomes_error_result() {
    async fn garbled(Json(request): Json<Value>) -> Json<Value> {
        Json(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "result": {
                "role": "agent",
                "parts": [{"kind": "text", "text": "not json"}],
                "messageId": "m-1"
            }
        }))
    }
    let peer = spawn_peer(Router::new().route("/", post(garbled))).await;

    let result = RelayClient::new(Duration::from_secs(5))
        .send(&peer, &scenario_task())
        .await
        .expect("decode failures are not hard faults");

    assert_eq!(result.status(), OrderStatus::Error);
    assert_eq!(result.task_id(), Some("t-1"));
    assert!(result.reason().is_some());
}

#[tokio::test]
async fn proxy_forwards_to_its_peer() {
    let proxy = spawn_proxy_to(spawn_fulfiller().await).await;

    let descriptor = RelayClient::default().discover(&proxy).await.expect("proxy descriptor");
    let result = RelayClient::new(Duration::from_secs(5))
        .send(&proxy, &scenario_task())
        .await
        .expect("relay through proxy");

    assert!(descriptor.offers("forward_order_spec"));
    assert_eq!(result.status(), OrderStatus::Confirmed);
    assert_eq!(result.task_id(), Some("t-1"));
    assert_eq!(result.ordered_item(), Some("margherita"));
}

/// A `message/send` reply confirming margherita under whatever task id the peer chooses.
fn confirmed_reply(request: &Value, task_id: Option<&str>) -> Json<Value> {
    let result = OrderResult::confirmed(
        task_id.map(str::to_owned),
        Commitment {
            ordered_item: "margherita".to_string(),
            price: 1800,
            estimated_delivery: "2026-10-18T12:35:00Z".to_string(),
        },
    );
    Json(json!({"jsonrpc": "2.0", "id": request["id"], "result": respond(&result)}))
}

async fn spawn_proxy_to(peer: String) -> String {
    let mut config = AppConfig::default();
    config.relay.mode = RelayMode::Proxy;
    config.relay.peer_url = Some(peer);
    spawn_relay(config).await
}

#[tokio::test]
async fn proxy_restores_task_id_a_peer_leaves_out() {
    async fn unlabelled(Json(request): Json<Value>) -> Json<Value> {
        confirmed_reply(&request, None)
    }
    let peer = spawn_peer(Router::new().route("/", post(unlabelled))).await;
    let proxy = spawn_proxy_to(peer).await;

    let result = RelayClient::new(Duration::from_secs(5))
        .send(&proxy, &scenario_task())
        .await
        .expect("relay through proxy");

    assert_eq!(result.status(), OrderStatus::Confirmed);
    assert_eq!(result.task_id(), Some("t-1"));
    assert_eq!(result.ordered_item(), Some("margherita"));
}

#[tokio::test]
async fn proxy_echoes_the_requesters_task_id_not_the_peers() {
    async fn mislabelled(Json(request): Json<Value>) -> Json<Value> {
        confirmed_reply(&request, Some("peer-9"))
    }
    let peer = spawn_peer(Router::new().route("/", post(mislabelled))).await;
    let proxy = spawn_proxy_to(peer).await;
    let anonymous =
        TaskSpecification::new(None, Requirements::new(Some("margherita"), Some(2000)));
    let client = RelayClient::new(Duration::from_secs(5));

    let labelled = client.send(&proxy, &scenario_task()).await.expect("relay through proxy");
    let unlabelled = client.send(&proxy, &anonymous).await.expect("relay through proxy");

    assert_eq!(labelled.task_id(), Some("t-1"));
    assert_eq!(unlabelled.status(), OrderStatus::Confirmed);
    assert_eq!(unlabelled.task_id(), None);
}

#[tokio::test]
async fn proxy_reports_dead_peer_as_error_result() {
    let mut config = AppConfig::default();
    config.relay.mode = RelayMode::Proxy;
    config.relay.peer_url = Some(closed_address().await);
    config.relay.timeout_secs = 2;
    let proxy = spawn_relay(config).await;

    let result = RelayClient::new(Duration::from_secs(5))
        .send(&proxy, &scenario_task())
        .await
        .expect("proxy stays lenient");

    assert_eq!(result.status(), OrderStatus::Error);
    assert_eq!(result.task_id(), Some("t-1"));
}

#[tokio::test]
async fn unreachable_catalog_becomes_error_result() {
    let mut config = AppConfig::default();
    config.gateways.catalog_url = Some(format!("{}/catalog", closed_address().await));
    config.gateways.timeout_secs = 2;
    let fulfiller = spawn_relay(config).await;

    let result = RelayClient::new(Duration::from_secs(5))
        .send(&fulfiller, &scenario_task())
        .await
        .expect("gateway failures are not hard faults");

    assert_eq!(result.status(), OrderStatus::Error);
    assert!(result.reason().is_some_and(|reason| reason.contains("catalog gateway")));
}

#[tokio::test]
async fn cancel_is_rejected_over_the_wire() {
    let fulfiller = spawn_fulfiller().await;

    let body: Value = reqwest::Client::new()
        .post(format!("{fulfiller}/"))
        .json(&json!({
            "jsonrpc": "2.0",
            "id": "c-1",
            "method": "tasks/cancel",
            "params": {"id": "t-1"}
        }))
        .send()
        .await
        .expect("cancel request")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["error"]["code"], json!(-32004));
    assert_eq!(body["error"]["data"]["kind"], json!("cancel_unsupported"));
}

#[tokio::test]
async fn health_reports_executor_mode() {
    let fulfiller = spawn_fulfiller().await;

    let body: Value = reqwest::get(format!("{fulfiller}/health"))
        .await
        .expect("health request")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["status"], json!("ready"));
    assert_eq!(body["executor"]["detail"], json!("executing tasks in fulfiller mode"));
}
