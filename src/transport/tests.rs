#![allow(clippy::unwrap_used, clippy::panic)]

use std::{collections::HashMap, net::SocketAddr};

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    routing::get,
};

use super::{Endpoints, HttpRequester, Item, Requester, VersionId, endpoints::redact};
use crate::{RccError, config::Conf};

fn conf(server_url: &str) -> Conf {
    Conf {
        server_url: server_url.to_string(),
        project_name: "shop".to_string(),
        env_name: "prod".to_string(),
        api_password: "s3cret".to_string(),
        request_timeout_secs: 2,
        ..Conf::default()
    }
    .normalize()
    .unwrap()
}

fn query_of(url: &reqwest::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn authorized(params: &HashMap<String, String>) -> bool {
    params.get("token").map(String::as_str) == Some("s3cret")
        && params.get("project").map(String::as_str) == Some("shop")
        && params.get("env").map(String::as_str) == Some("prod")
}

fn authority() -> Router {
    Router::new()
        .route(
            "/api/v1/config/version",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if !authorized(&params) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(serde_json::json!({ "versionId": 42 })))
            }),
        )
        .route(
            "/api/v1/config/items",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if !authorized(&params) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                match params.get("versionId").map(String::as_str) {
                    Some("42") => Ok(Json(vec![Item::new("a", "1"), Item::new("b", "2")])),
                    _ => Err(StatusCode::NOT_FOUND),
                }
            }),
        )
}

#[test]
fn version_url_carries_binding() {
    let endpoints = Endpoints::new(&conf("http://rcc.local:8080/")).unwrap();
    let url = endpoints.version();

    assert_eq!(url.path(), "/api/v1/config/version");
    let query = query_of(&url);
    assert_eq!(query["project"], "shop");
    assert_eq!(query["env"], "prod");
    assert_eq!(query["version"], "default");
    assert_eq!(query["token"], "s3cret");
}

#[test]
fn items_url_carries_version_id() {
    let endpoints = Endpoints::new(&conf("http://rcc.local:8080")).unwrap();
    let url = endpoints.items(VersionId(7));

    assert_eq!(url.path(), "/api/v1/config/items");
    assert_eq!(query_of(&url)["versionId"], "7");
}

#[test]
fn base_path_prefix_is_kept() {
    let endpoints = Endpoints::new(&conf("https://gateway.local/rcc")).unwrap();
    assert_eq!(endpoints.version().path(), "/rcc/api/v1/config/version");
}

#[test]
fn query_values_are_encoded() {
    let mut c = conf("http://rcc.local");
    c.project_name = "a&b c".to_string();
    let url = Endpoints::new(&c).unwrap().version();

    assert_eq!(query_of(&url)["project"], "a&b c");
}

#[test]
fn redact_hides_token() {
    let endpoints = Endpoints::new(&conf("http://rcc.local")).unwrap();
    let shown = redact(&endpoints.version());

    assert!(!shown.contains("s3cret"));
    assert!(shown.contains("project=shop"));
}

#[test]
fn item_json_shape() {
    let items: Vec<Item> =
        serde_json::from_str(r#"[{"key":"k","value":"v"},{"key":"k2","value":""}]"#).unwrap();
    assert_eq!(items, vec![Item::new("k", "v"), Item::new("k2", "")]);
}

#[tokio::test]
async fn http_requester_fetches_version_and_items() {
    let addr = serve(authority()).await;
    let requester = HttpRequester::new(&conf(&format!("http://{addr}"))).unwrap();

    let version = requester.active_version().await.unwrap();
    assert_eq!(version, VersionId(42));

    let items = requester.items(version).await.unwrap();
    assert_eq!(items, vec![Item::new("a", "1"), Item::new("b", "2")]);
}

#[tokio::test]
async fn http_requester_maps_error_status_to_transport() {
    let addr = serve(authority()).await;
    let requester = HttpRequester::new(&conf(&format!("http://{addr}"))).unwrap();

    let err = requester.items(VersionId(1)).await.unwrap_err();
    match err {
        RccError::Transport { url, .. } => assert!(!url.contains("s3cret")),
        other => panic!("Expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_requester_rejects_wrong_credential() {
    let addr = serve(authority()).await;
    let mut c = conf(&format!("http://{addr}"));
    c.api_password = "wrong".to_string();
    let requester = HttpRequester::new(&c).unwrap();

    let err = requester.active_version().await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn http_requester_maps_bad_body_to_decode() {
    let router = Router::new().route("/api/v1/config/version", get(|| async { "not json" }));
    let addr = serve(router).await;
    let requester = HttpRequester::new(&conf(&format!("http://{addr}"))).unwrap();

    let err = requester.active_version().await.unwrap_err();
    assert!(matches!(err, RccError::Decode { .. }));
}

#[tokio::test]
async fn http_requester_unreachable_authority() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let requester = HttpRequester::new(&conf(&format!("http://{addr}"))).unwrap();
    let err = requester.active_version().await.unwrap_err();
    assert!(matches!(err, RccError::Transport { .. }));
}
