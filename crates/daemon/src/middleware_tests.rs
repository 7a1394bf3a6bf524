use axum::http::HeaderMap;

use super::*;

#[test]
fn login_path_maps_to_login_bucket() {
    assert!(matches!(bucket_for("/api/auth/login"), Bucket::Login));
}

#[test]
fn permission_path_maps_to_strict_bucket() {
    assert!(matches!(bucket_for("/api/permission/pending"), Bucket::Strict));
}

#[test]
fn orchestrator_create_maps_to_its_own_bucket() {
    assert!(matches!(bucket_for("/api/orchestrator/create"), Bucket::OrchestratorCreate));
}

#[test]
fn other_paths_map_to_general_bucket() {
    assert!(matches!(bucket_for("/api/sessions"), Bucket::General));
}

#[test]
fn bearer_token_strips_prefix() {
    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
    assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
}

#[test]
fn bearer_token_absent_without_header() {
    assert_eq!(bearer_token(&HeaderMap::new()), None);
}
