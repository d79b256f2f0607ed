use std::sync::Arc;

use adt_compiler::{CatalogEntry, RawRule};
use adt_core::AdCampaign;
use adt_server::{build_router, DeliveryEngine, DeliveryMetrics, ErrorResponse, MemoryCatalog};

fn entry(id: &str, rules: Vec<RawRule>) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        name: format!("Campaign {}", id),
        image: format!("img{}", id),
        cta: "Download".to_string(),
        status: "ACTIVE".to_string(),
        rules,
    }
}

fn rule(dimension: &str, is_inclusion: bool, values: &[&str]) -> RawRule {
    RawRule::new(dimension, is_inclusion, values.iter().map(|v| v.to_string()).collect())
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(catalog: Vec<CatalogEntry>) -> String {
    let engine = Arc::new(DeliveryEngine::new());
    engine
        .build_snapshot(&MemoryCatalog::new(catalog))
        .await
        .unwrap();

    let app = build_router(engine, Arc::new(DeliveryMetrics::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn scenario_c() -> Vec<CatalogEntry> {
    vec![
        entry("1", vec![rule("country", true, &["US"]), rule("os", true, &["android"])]),
        entry("2", vec![rule("os", true, &["android"]), rule("country", false, &["CA"])]),
    ]
}

#[tokio::test]
async fn delivery_returns_matches_in_id_order() {
    let base = spawn_test_server(scenario_c()).await;
    let resp = reqwest::get(format!("{}/v1/delivery?app=com.any&country=us&os=android", base))
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));

    let body: Vec<AdCampaign> = resp.json().await.unwrap();
    let ids: Vec<&str> = body.iter().map(|ad| ad.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(body[0].image, "img1");
    assert_eq!(body[0].cta, "Download");
}

#[tokio::test]
async fn delivery_uses_wire_field_names() {
    let base = spawn_test_server(vec![entry("7", Vec::new())]).await;
    let body: serde_json::Value = reqwest::get(format!("{}/v1/delivery?app=a&country=b&os=c", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        serde_json::json!([{"cid": "7", "img": "img7", "cta": "Download"}])
    );
}

#[tokio::test]
async fn no_match_returns_no_content() {
    let base = spawn_test_server(vec![entry("1", vec![rule("country", true, &["US"])])]).await;
    let resp = reqwest::get(format!("{}/v1/delivery?app=com.any&country=ca&os=android", base))
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 204);
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_catalog_returns_no_content() {
    let base = spawn_test_server(Vec::new()).await;
    let resp = reqwest::get(format!("{}/v1/delivery?app=a&country=b&os=c", base))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}

#[tokio::test]
async fn missing_params_return_bad_request() {
    let base = spawn_test_server(scenario_c()).await;

    for (query, missing) in [
        ("country=us&os=android", "app"),
        ("app=com.any&os=android", "country"),
        ("app=com.any&country=us", "os"),
        ("app=%20&country=us&os=android", "app"),
        ("", "app"),
    ] {
        let resp = reqwest::get(format!("{}/v1/delivery?{}", base, query))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "query {:?}", query);

        let body: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(body.error, format!("missing {} param", missing));
    }
}

#[tokio::test]
async fn health_endpoint() {
    let base = spawn_test_server(Vec::new()).await;
    let resp = reqwest::get(format!("{}/healthz", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server(Vec::new()).await;
    let resp = reqwest::get(format!("{}/v1/nonexistent", base))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

/// Value of the first sample whose series (name plus labels) is `series`.
fn sample(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.rsplit_once(' ')?;
            (name == series).then(|| value.parse().ok()).flatten()
        })
}

#[tokio::test]
async fn metrics_count_delivery_requests_by_status() {
    let base = spawn_test_server(scenario_c()).await;
    let delivery = format!("{}/v1/delivery", base);

    for query in [
        "app=com.any&country=us&os=android",
        "app=com.any&country=us&os=android",
        "app=com.any&country=ca&os=ios",
        "country=us&os=android",
    ] {
        reqwest::get(format!("{}?{}", delivery, query)).await.unwrap();
    }
    reqwest::get(format!("{}/healthz", base)).await.unwrap();

    let resp = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));

    let text = resp.text().await.unwrap();
    let expected = [
        (r#"delivery_requests_total{code="200"}"#, 2.0),
        (r#"delivery_requests_total{code="204"}"#, 1.0),
        (r#"delivery_requests_total{code="400"}"#, 1.0),
        (r#"delivery_request_errors_total{type="missing_param"}"#, 1.0),
        ("delivery_request_duration_seconds_count", 4.0),
        ("delivery_in_flight", 0.0),
    ];
    for (series, value) in expected {
        assert_eq!(sample(&text, series), Some(value), "{}\n{}", series, text);
    }
}
