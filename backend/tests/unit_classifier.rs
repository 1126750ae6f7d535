use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use smart_task_backend::application::classifier::{
    classify_gateway, classify_project, gateway_app_error, project_app_error, ProjectFailure,
    UpstreamFailure,
};
use smart_task_backend::domain::ports::GatewayError;
use smart_task_backend::domain::{ErrorCode, StoreError};

fn status(status: u16) -> GatewayError {
    GatewayError::Status {
        status,
        message: "upstream said no".into(),
    }
}

#[test]
fn gateway_errors_map_to_upstream_kinds() {
    let cases = [
        (GatewayError::Timeout("deadline".into()), UpstreamFailure::Timeout),
        (GatewayError::cancelled(), UpstreamFailure::Timeout),
        (status(429), UpstreamFailure::RateLimited),
        (status(401), UpstreamFailure::AuthError),
        (status(503), UpstreamFailure::Unavailable),
        (status(500), UpstreamFailure::Unavailable),
        (status(400), UpstreamFailure::Unavailable),
        (GatewayError::Transport("connection refused".into()), UpstreamFailure::Unavailable),
        (GatewayError::Decode("bad json".into()), UpstreamFailure::Unavailable),
        (GatewayError::Stream("reset".into()), UpstreamFailure::Unavailable),
    ];
    for (error, expected) in cases {
        assert_eq!(classify_gateway(&error), expected, "{error}");
    }
}

#[test]
fn gateway_app_error_hides_upstream_detail() {
    let error = gateway_app_error(&status(429));
    assert_eq!(error.code(), ErrorCode::UpstreamRateLimited);
    assert_eq!(error.code_str(), "upstream_rate_limited");
    assert_eq!(error.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(!error.message().contains("upstream said no"));

    let timeout = gateway_app_error(&GatewayError::cancelled());
    assert_eq!(timeout.code_str(), "upstream_timeout");
    assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

    let auth = gateway_app_error(&status(401));
    assert_eq!(auth.code_str(), "upstream_auth_error");
    assert_eq!(auth.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let down = gateway_app_error(&GatewayError::Transport("refused".into()));
    assert_eq!(down.code_str(), "upstream_unavailable");
    assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn project_lookup_failures_split_not_found_from_internal() {
    assert_eq!(
        classify_project(&StoreError::NotFound("project".into())),
        ProjectFailure::NotFound
    );
    assert_eq!(
        classify_project(&StoreError::Internal("lock poisoned".into())),
        ProjectFailure::Internal
    );

    let missing = project_app_error(&StoreError::NotFound("project".into()));
    assert_eq!(missing.code_str(), "project_not_found");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let broken = project_app_error(&StoreError::Invalid("bad row".into()));
    assert_eq!(broken.code_str(), "internal_error");
    assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
