//! Proxy layer tests

use super::mock::MockProxyTransport;
use super::rotator::ProxyRotator;
use super::traits::ProxyTransport;
use super::ProxyHealthChecker;
use crate::bot::ProxyUpstream;
use std::sync::Arc;

fn pool() -> Vec<ProxyUpstream> {
    vec![
        ProxyUpstream::new("us-east.proxy.test", 8080),
        ProxyUpstream::new("eu-west.proxy.test", 8080),
        ProxyUpstream::new("ap-south.proxy.test", 8080),
    ]
}

#[tokio::test]
async fn test_round_robin_wraps() {
    let rotator = ProxyRotator::new(pool());

    let hosts: Vec<String> = [
        rotator.next_proxy(None).await.unwrap(),
        rotator.next_proxy(None).await.unwrap(),
        rotator.next_proxy(None).await.unwrap(),
        rotator.next_proxy(None).await.unwrap(),
    ]
    .iter()
    .map(|p| p.host.clone())
    .collect();

    assert_eq!(hosts[0], "us-east.proxy.test");
    assert_eq!(hosts[1], "eu-west.proxy.test");
    assert_eq!(hosts[2], "ap-south.proxy.test");
    assert_eq!(hosts[3], "us-east.proxy.test");
}

#[tokio::test]
async fn test_location_affinity() {
    let rotator = ProxyRotator::new(pool());

    let proxy = rotator.next_proxy(Some("eu-west")).await.unwrap();
    assert_eq!(proxy.host, "eu-west.proxy.test");

    // Affinity does not advance the rotation cursor.
    let next = rotator.next_proxy(None).await.unwrap();
    assert_eq!(next.host, "us-east.proxy.test");
}

#[tokio::test]
async fn test_location_miss_falls_back_to_rotation() {
    let rotator = ProxyRotator::new(pool());
    let proxy = rotator.next_proxy(Some("antarctica")).await.unwrap();
    assert_eq!(proxy.host, "us-east.proxy.test");
}

#[tokio::test]
async fn test_disabled_proxies_are_skipped() {
    let mut proxies = pool();
    proxies[0].enabled = false;

    let rotator = ProxyRotator::new(proxies);
    let proxy = rotator.next_proxy(None).await.unwrap();
    assert_eq!(proxy.host, "eu-west.proxy.test");

    // Even when the location hint matches a disabled proxy.
    let proxy = rotator.next_proxy(Some("us-east")).await.unwrap();
    assert_ne!(proxy.host, "us-east.proxy.test");
}

#[tokio::test]
async fn test_empty_pool_errors() {
    let rotator = ProxyRotator::new(Vec::new());
    let result = rotator.next_proxy(None).await;
    assert!(matches!(result, Err(crate::Error::Configuration(_))));
}

#[tokio::test]
async fn test_request_rotates_on_failure() {
    let rotator = ProxyRotator::with_policy(pool(), 3, 1);
    let transport = MockProxyTransport::new();
    transport.fail_host("us-east.proxy.test").await;

    let transport_dyn = Arc::clone(&transport) as Arc<dyn ProxyTransport>;
    let body = rotator
        .request(&transport_dyn, "https://example.com")
        .await
        .unwrap();

    assert_eq!(body, "203.0.113.7");
    let hosts = transport.used_hosts().await;
    assert_eq!(hosts, ["us-east.proxy.test", "eu-west.proxy.test"]);
}

#[tokio::test]
async fn test_request_exhausts_after_max_retries() {
    let rotator = ProxyRotator::with_policy(pool(), 3, 1);
    let transport = MockProxyTransport::new();
    for proxy in pool() {
        transport.fail_host(&proxy.host).await;
    }

    let transport_dyn = Arc::clone(&transport) as Arc<dyn ProxyTransport>;
    let result = rotator.request(&transport_dyn, "https://example.com").await;

    match result {
        Err(crate::Error::ProxyExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(last.contains("connection refused"));
        }
        other => panic!("expected ProxyExhausted, got {:?}", other.map(|_| ())),
    }
    assert_eq!(transport.used_hosts().await.len(), 3);
}

#[tokio::test]
async fn test_add_and_remove_proxy() {
    let rotator = ProxyRotator::new(Vec::new());
    rotator.add_proxy(ProxyUpstream::new("solo.proxy.test", 3128)).await;
    assert_eq!(rotator.proxies().await.len(), 1);

    rotator.remove_proxy("solo.proxy.test", 3128).await;
    assert!(rotator.proxies().await.is_empty());
}

#[tokio::test]
async fn test_health_checker_filters_dead_proxies() {
    let transport = MockProxyTransport::new();
    transport.fail_host("eu-west.proxy.test").await;

    let checker = ProxyHealthChecker::new(Arc::clone(&transport) as Arc<dyn ProxyTransport>);
    let healthy = checker.healthy_proxies(&pool()).await;

    let hosts: Vec<&str> = healthy.iter().map(|p| p.host.as_str()).collect();
    assert_eq!(hosts, ["us-east.proxy.test", "ap-south.proxy.test"]);
}
