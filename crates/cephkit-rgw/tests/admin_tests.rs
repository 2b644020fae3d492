//! Admin API tests against a mock gateway
//!
//! Run with: cargo test --package cephkit-rgw --test admin_tests

use cephkit_rgw::{
    AdminClient, AdminError, Config, ParamPlacement, QuotaSpec, RateLimitScope, RateLimitSpec,
    UNMARSHAL_ERROR,
};
use rstest::rstest;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use wiremock::matchers::{any, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn client_for(server: &MockServer) -> AdminClient {
    AdminClient::with_endpoint(&server.uri()).unwrap()
}

/// Mount a mock that fails the test if any request arrives
async fn expect_no_requests(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn only_request(server: &MockServer) -> Request {
    let mut requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests.remove(0)
}

fn limits() -> RateLimitSpec {
    RateLimitSpec::default()
        .with_enabled(true)
        .with_max_read_bytes(1024)
        .with_max_write_bytes(2048)
        .with_max_read_ops(100)
        .with_max_write_ops(50)
}

// ============================================================================
// Validation
// ============================================================================

#[rstest]
#[case::get_user("get_user")]
#[case::set_user("set_user")]
#[tokio::test]
async fn test_missing_uid_never_reaches_network(#[case] op: &str) {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;
    let client = client_for(&server);

    let err = match op {
        "get_user" => client
            .get_user_rate_limit(RateLimitSpec::default())
            .await
            .unwrap_err(),
        _ => client
            .set_user_rate_limit(RateLimitSpec::default())
            .await
            .unwrap_err(),
    };
    assert!(matches!(err, AdminError::MissingUserId));
    assert_eq!(err.to_string(), "missing user ID");
}

#[rstest]
#[case::get_bucket("get_bucket")]
#[case::set_bucket("set_bucket")]
#[tokio::test]
async fn test_missing_bucket_never_reaches_network(#[case] op: &str) {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;
    let client = client_for(&server);

    let spec = RateLimitSpec::for_user("alice");
    let err = match op {
        "get_bucket" => client.get_bucket_rate_limit(spec).await.unwrap_err(),
        _ => client.set_bucket_rate_limit(spec).await.unwrap_err(),
    };
    assert!(matches!(err, AdminError::MissingBucket));
}

#[rstest]
#[case::absent(None)]
#[case::explicit_false(Some(false))]
#[tokio::test]
async fn test_global_setters_require_true_flag(#[case] global: Option<bool>) {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;
    let client = client_for(&server);

    let spec = RateLimitSpec {
        global,
        ..limits()
    };
    for result in [
        client.set_global_user_rate_limit(spec.clone()).await,
        client.set_global_bucket_rate_limit(spec.clone()).await,
        client.set_global_anonymous_rate_limit(spec.clone()).await,
    ] {
        assert!(matches!(result, Err(AdminError::GlobalFlagMustBeTrue)));
    }
}

#[tokio::test]
async fn test_quota_validation_never_reaches_network() {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;
    let client = client_for(&server);

    assert!(matches!(
        client.get_user_quota(QuotaSpec::default()).await,
        Err(AdminError::MissingUserId)
    ));
    assert!(matches!(
        client.set_bucket_quota(QuotaSpec::default()).await,
        Err(AdminError::MissingUserId)
    ));
    assert!(matches!(
        client
            .set_individual_bucket_quota(QuotaSpec::for_bucket("", "photos"))
            .await,
        Err(AdminError::MissingUserId)
    ));
    assert!(matches!(
        client
            .set_individual_bucket_quota(QuotaSpec::for_user("alice"))
            .await,
        Err(AdminError::MissingBucket)
    ));
}

// ============================================================================
// Wire format
// ============================================================================

#[tokio::test]
async fn test_operation_scope_overrides_caller_scope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/ratelimit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_ratelimit": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut spec = RateLimitSpec::for_user("alice");
    spec.scope = Some(RateLimitScope::Anon);
    client_for(&server).get_user_rate_limit(spec).await.unwrap();

    let request = only_request(&server).await;
    assert_eq!(request.url.query(), Some("uid=alice&ratelimit-scope=user"));
}

#[tokio::test]
async fn test_get_global_sends_only_global_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/ratelimit"))
        .and(query_param("global", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucket_ratelimit": {"enabled": false},
            "user_ratelimit": {"max_read_ops": 10, "enabled": true},
            "anonymous_ratelimit": {"max_write_ops": 1, "enabled": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let limits = client_for(&server).get_global_rate_limit().await.unwrap();
    assert_eq!(limits.user_ratelimit.max_read_ops, Some(10));
    assert_eq!(limits.anonymous_ratelimit.max_write_ops, Some(1));
    assert_eq!(limits.bucket_ratelimit.enabled, Some(false));

    let request = only_request(&server).await;
    assert_eq!(request.url.query(), Some("global=true"));
}

#[rstest]
#[case::user("user", "uid=alice&ratelimit-scope=user")]
#[case::bucket("bucket", "bucket=photos&ratelimit-scope=bucket")]
#[case::global_user("global_user", "global=true&ratelimit-scope=user")]
#[case::global_bucket("global_bucket", "global=true&ratelimit-scope=bucket")]
#[case::global_anon("global_anon", "global=true&ratelimit-scope=anon")]
#[tokio::test]
async fn test_set_rate_limit_query(#[case] target: &str, #[case] prefix: &str) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/ratelimit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    // Both identifiers set: the allow-list decides which one is sent.
    let spec = RateLimitSpec {
        uid: "alice".to_string(),
        bucket: "photos".to_string(),
        global: Some(true),
        ..limits()
    };
    match target {
        "user" => client.set_user_rate_limit(spec).await,
        "bucket" => client.set_bucket_rate_limit(spec).await,
        "global_user" => client.set_global_user_rate_limit(spec).await,
        "global_bucket" => client.set_global_bucket_rate_limit(spec).await,
        _ => client.set_global_anonymous_rate_limit(spec).await,
    }
    .unwrap();

    let request = only_request(&server).await;
    let expected = format!(
        "{}&enabled=true&max-read-bytes=1024&max-write-bytes=2048&max-read-ops=100&max-write-ops=50",
        prefix
    );
    assert_eq!(request.url.query(), Some(expected.as_str()));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_unset_limits_are_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client_for(&server)
        .set_bucket_rate_limit(RateLimitSpec::for_bucket("photos").with_max_write_ops(0))
        .await
        .unwrap();

    let request = only_request(&server).await;
    assert_eq!(
        request.url.query(),
        Some("bucket=photos&ratelimit-scope=bucket&max-write-ops=0")
    );
}

#[tokio::test]
async fn test_body_placement_moves_params_out_of_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/ratelimit"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdminClient::new(
        Config::new(server.uri()).with_param_placement(ParamPlacement::Body),
    )
    .unwrap();
    client
        .set_user_rate_limit(RateLimitSpec::for_user("alice").with_enabled(false))
        .await
        .unwrap();

    let request = only_request(&server).await;
    assert_eq!(request.url.query(), None);
    assert_eq!(
        String::from_utf8(request.body).unwrap(),
        "uid=alice&ratelimit-scope=user&enabled=false"
    );
}

#[tokio::test]
async fn test_user_quota_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enabled": true,
            "check_on_raw": false,
            "max_size": 1048576,
            "max_size_kb": 1024,
            "max_objects": -1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quota = client_for(&server)
        .get_user_quota(QuotaSpec::for_user("alice"))
        .await
        .unwrap();
    assert_eq!(quota.enabled, Some(true));
    assert_eq!(quota.max_size_kb, Some(1024));
    assert_eq!(quota.max_objects, Some(-1));

    let request = only_request(&server).await;
    assert_eq!(request.url.query(), Some("quota&uid=alice&quota-type=user"));
}

#[tokio::test]
async fn test_set_bucket_quotas() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    let client = client_for(&server);

    client
        .set_bucket_quota(QuotaSpec::for_user("alice").with_max_objects(10))
        .await
        .unwrap();
    client
        .set_individual_bucket_quota(
            QuotaSpec::for_bucket("alice", "photos")
                .with_enabled(true)
                .with_max_size(4096),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.path(), "/admin/user");
    assert_eq!(
        requests[0].url.query(),
        Some("quota&uid=alice&quota-type=bucket&max-objects=10")
    );
    assert_eq!(requests[1].url.path(), "/admin/bucket");
    assert_eq!(
        requests[1].url.query(),
        Some("quota&bucket=photos&uid=alice&enabled=true&max-size=4096")
    );
}

// ============================================================================
// Responses and errors
// ============================================================================

/// Gateway stand-in that remembers the last limits written per user
#[derive(Default)]
struct RateLimitStore {
    users: Mutex<HashMap<String, serde_json::Value>>,
}

impl Respond for RateLimitStore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let uid = params.get("uid").cloned().unwrap_or_default();
        let number = |name: &str| params.get(name).and_then(|v| v.parse::<i64>().ok());

        match request.method.as_str() {
            "POST" => {
                let limit = json!({
                    "max_read_ops": number("max-read-ops").unwrap_or(0),
                    "max_write_ops": number("max-write-ops").unwrap_or(0),
                    "max_read_bytes": number("max-read-bytes").unwrap_or(0),
                    "max_write_bytes": number("max-write-bytes").unwrap_or(0),
                    "enabled": params.get("enabled").map(|v| v == "true").unwrap_or(false),
                });
                self.users.lock().unwrap().insert(uid, limit);
                ResponseTemplate::new(200)
            }
            _ => match self.users.lock().unwrap().get(&uid) {
                Some(limit) => {
                    ResponseTemplate::new(200).set_body_json(json!({ "user_ratelimit": limit }))
                }
                None => ResponseTemplate::new(404).set_body_json(json!({
                    "Code": "NoSuchUser",
                    "RequestId": "tx0000001",
                    "HostId": "rgw-default"
                })),
            },
        }
    }
}

#[test_log::test(tokio::test)]
async fn test_user_rate_limit_round_trip() {
    let server = MockServer::start().await;
    Mock::given(path("/admin/ratelimit"))
        .respond_with(RateLimitStore::default())
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = client
        .get_user_rate_limit(RateLimitSpec::for_user("alice"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    client
        .set_user_rate_limit(RateLimitSpec {
            uid: "alice".to_string(),
            ..limits()
        })
        .await
        .unwrap();

    let got = client
        .get_user_rate_limit(RateLimitSpec::for_user("alice"))
        .await
        .unwrap();
    assert_eq!(got.user_ratelimit.max_read_ops, Some(100));
    assert_eq!(got.user_ratelimit.max_write_ops, Some(50));
    assert_eq!(got.user_ratelimit.max_read_bytes, Some(1024));
    assert_eq!(got.user_ratelimit.max_write_bytes, Some(2048));
    assert_eq!(got.user_ratelimit.enabled, Some(true));
}

#[tokio::test]
async fn test_malformed_body_reports_raw_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_bucket_rate_limit(RateLimitSpec::for_bucket("photos"))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Unmarshal { .. }));
    let message = err.to_string();
    assert!(message.starts_with(UNMARSHAL_ERROR));
    assert!(message.contains("<html>proxy error</html>"));
}

#[tokio::test]
async fn test_error_document_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "Code": "AccessDenied",
            "RequestId": "tx0000abc",
            "HostId": "rgw-a"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .set_global_bucket_rate_limit(RateLimitSpec::global().with_enabled(true))
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    match err {
        AdminError::Api {
            status,
            request_id,
            host_id,
            ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(request_id.as_deref(), Some("tx0000abc"));
            assert_eq!(host_id.as_deref(), Some("rgw-a"));
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_proxy_error_page_keeps_status_code() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(
            ResponseTemplate::new(502).set_body_string("<html>NoSuchHost upstream</html>"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_user_rate_limit(RateLimitSpec::for_user("alice"))
        .await
        .unwrap_err();

    assert!(!err.is_not_found());
    match err {
        AdminError::Api { code, body, .. } => {
            assert_eq!(code, "HTTP502");
            assert_eq!(body.as_deref(), Some("<html>NoSuchHost upstream</html>"));
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_signed_requests_carry_sigv4_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("x-amz-content-sha256"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_ratelimit": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdminClient::new(
        Config::new(server.uri())
            .with_credentials("ADMINKEY", "adminsecret")
            .with_region("zone-a"),
    )
    .unwrap();
    client
        .get_user_rate_limit(RateLimitSpec::for_user("alice"))
        .await
        .unwrap();

    let request = only_request(&server).await;
    let auth = request
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=ADMINKEY/"));
    assert!(auth.contains("/zone-a/s3/aws4_request"));
    assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
}

#[tokio::test]
async fn test_unsigned_client_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client_for(&server)
        .set_user_quota(QuotaSpec::for_user("alice").with_enabled(false))
        .await
        .unwrap();

    let request = only_request(&server).await;
    assert!(request.headers.get("authorization").is_none());
}
