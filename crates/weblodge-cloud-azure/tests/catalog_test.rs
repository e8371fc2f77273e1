//! Price list client against a mocked retail price API

use serde_json::json;
use weblodge_cloud::{CloudError, RetryConfig};
use weblodge_cloud_azure::{PriceCatalog, TierCatalog};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn price(sku: &str, retail_price: f64) -> serde_json::Value {
    json!({
        "skuName": sku,
        "armRegionName": "northeurope",
        "retailPrice": retail_price,
        "currencyCode": "USD",
        "unitOfMeasure": "1 Hour",
    })
}

fn catalog(server: &MockServer) -> PriceCatalog {
    PriceCatalog::with_base_url(format!("{}/prices", server.uri()))
        .unwrap()
        .with_retry(RetryConfig::immediate().with_max_attempts(3))
}

#[tokio::test]
async fn test_tiers_follow_next_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .and(query_param("$filter", PriceCatalog::filter("northeurope")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("S1", 0.1), price("B1", 0.018)],
            "NextPageLink": format!("{}/prices/next", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prices/next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("P1v3", 0.2), price("Y1", 0.0)],
            "NextPageLink": null,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tiers = catalog(&server).tiers("northeurope").await.unwrap();

    let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["F1", "B1", "S1", "P1v3"]);
    assert!(tiers[0].is_free());
    assert_eq!(tiers[3].cores, 2);
}

#[tokio::test]
async fn test_free_tier_listed_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("F1", 0.0), price("B1", 0.018)],
        })))
        .mount(&server)
        .await;

    let tiers = catalog(&server).tiers("northeurope").await.unwrap();

    assert_eq!(tiers.iter().filter(|t| t.is_free()).count(), 1);
}

#[tokio::test]
async fn test_server_errors_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("B1", 0.018)],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tiers = catalog(&server).tiers("northeurope").await.unwrap();
    assert_eq!(tiers.len(), 2);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = catalog(&server).tiers("northeurope").await.unwrap_err();
    assert!(matches!(err, CloudError::InvalidSku(_)));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = catalog(&server).tiers("northeurope").await.unwrap_err();
    assert!(matches!(err, CloudError::InvalidSku(_)));
}

#[tokio::test]
async fn test_garbage_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = catalog(&server).tiers("northeurope").await.unwrap_err();
    assert!(matches!(err, CloudError::InvalidSku(_)));
}

#[tokio::test]
async fn test_unknown_location() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": [] })))
        .mount(&server)
        .await;

    let err = catalog(&server).tiers("atlantis").await.unwrap_err();
    assert!(matches!(err, CloudError::InvalidLocation(location) if location == "atlantis"));
}

#[tokio::test]
async fn test_malformed_location_not_queried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": [] })))
        .expect(0)
        .mount(&server)
        .await;

    for location in ["north'europe", "North Europe", ""] {
        let err = catalog(&server).tiers(location).await.unwrap_err();
        assert!(matches!(err, CloudError::InvalidLocation(l) if l == location));
    }
}
