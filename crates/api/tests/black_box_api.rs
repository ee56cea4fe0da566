use std::sync::Arc;

use catalog_api::app::services::AppServices;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by the in-memory store on an ephemeral port.
        let app = catalog_api::app::build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/products{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.url("")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED, "create failed for {body}");
    res.json().await.unwrap()
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

fn codes(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_lifecycle_create_duplicate_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        json!({"code": "SKU1", "name": "Widget", "price": 9.99}),
    )
    .await;
    assert_eq!(created["id"], 1);
    assert_eq!(created["price"], "9.99");
    assert_eq!(created["stockQuantity"], 0);
    assert_eq!(created["isActive"], true);
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let dup = client
        .post(srv.url(""))
        .json(&json!({"code": "SKU1", "name": "Other", "price": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    let body: Value = dup.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_code");

    let updated = client
        .put(srv.url("/1"))
        .json(&json!({"code": "SKU1", "name": "Widget2", "price": "12.00"}))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["name"], "Widget2");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    let timestamp = |v: &Value| chrono::DateTime::parse_from_rfc3339(v.as_str().unwrap()).unwrap();
    let (before, after) = (timestamp(&created["updatedAt"]), timestamp(&updated["updatedAt"]));
    assert!(after >= before);

    let by_code = client.get(srv.url("/code/SKU1")).send().await.unwrap();
    assert_eq!(by_code.status(), StatusCode::OK);

    let deleted = client.delete(srv.url("/1")).send().await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = client.get(srv.url("/1")).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let body: Value = gone.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let again = client.delete(srv.url("/1")).send().await.unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_errors_list_every_field() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url(""))
        .json(&json!({"code": " ", "price": -1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["code", "name", "price"]);

    let list: Value = get_json(&client, srv.url("")).await;
    assert_eq!(list["totalElements"], 0);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = client
        .post(srv.url(""))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let res = client.get(srv.url("?page=-1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_query");

    let res = client.get(srv.url("?sortBy=secret")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "sortBy");

    let res = client.get(srv.url("?size=0")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_without_term_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create(&client, &srv, json!({"code": "W", "name": "Widget", "price": "1.00"})).await;
    create(&client, &srv, json!({"code": "G", "name": "Gadget", "price": "1.00"})).await;

    let res = client.get(srv.url("/search")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_query");

    let res = client.get(srv.url("/search?q=")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_pages_and_sorts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (code, price) in [
        ("A", "3.00"),
        ("B", "1.00"),
        ("C", "2.00"),
        ("D", "5.00"),
        ("E", "4.00"),
    ] {
        create(&client, &srv, json!({"code": code, "name": code, "price": price})).await;
    }

    let page: Value = get_json(&client, srv.url("?page=1&size=2&sortBy=price&sortDir=desc")).await;
    assert_eq!(codes(&page["items"]), vec!["A", "C"]);
    assert_eq!(page["page"], 1);
    assert_eq!(page["size"], 2);
    assert_eq!(page["totalElements"], 5);
    assert_eq!(page["totalPages"], 3);
}

#[tokio::test]
async fn query_endpoints_filter_as_expected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let seed = [
        json!({"code": "W", "name": "Widget", "price": "10.00", "category": "Tools", "stockQuantity": 3}),
        json!({"code": "G", "name": "Gadget", "price": "20.00", "category": "tools", "stockQuantity": 50}),
        json!({
            "code": "H",
            "name": "Hose",
            "price": "20.01",
            "category": "Garden",
            "stockQuantity": 1,
            "isActive": false
        }),
    ];
    for body in seed {
        create(&client, &srv, body).await;
    }

    let found: Value = get_json(&client, srv.url("/search?q=wid")).await;
    assert_eq!(codes(&found["items"]), vec!["W"]);

    let ranged: Value = get_json(&client, srv.url("/price-range?minPrice=10&maxPrice=20")).await;
    assert_eq!(codes(&ranged["items"]), vec!["W", "G"]);

    let inverted = client
        .get(srv.url("/price-range?minPrice=30&maxPrice=20"))
        .send()
        .await
        .unwrap();
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);

    let tools: Value = get_json(&client, srv.url("/category/TOOLS")).await;
    assert_eq!(tools["totalElements"], 2);

    let count: Value = get_json(&client, srv.url("/category/tools/active-count")).await;
    assert_eq!(count, json!({"category": "tools", "count": 2}));

    let active: Value = get_json(&client, srv.url("/active")).await;
    assert_eq!(codes(&active["items"]), vec!["G", "W"]);

    let categories: Value = get_json(&client, srv.url("/categories")).await;
    assert_eq!(categories, json!(["Garden", "Tools", "tools"]));

    let low: Value = get_json(&client, srv.url("/low-stock?threshold=5")).await;
    assert_eq!(codes(&low), vec!["W"]);

    let stocked: Value = get_json(&client, srv.url("/in-stock?above=2")).await;
    assert_eq!(codes(&stocked), vec!["G", "W"]);
}
