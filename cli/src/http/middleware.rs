//! HTTP中间件配置

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, Uri},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// 创建中间件栈
///
/// `request_timeout` 应大于脚本的最大执行时间，
/// 以便脚本超时能以 408 JSON 响应返回，而不是被中间件截断。
pub fn create_middleware_stack(
    request_timeout: Duration,
) -> tower::layer::util::Stack<CorsLayer, TimeoutLayer> {
    tower::layer::util::Stack::new(create_cors_layer(), TimeoutLayer::new(request_timeout))
}

/// 仅接受 `http(s)://localhost[:port]` 与 `http(s)://127.0.0.1[:port]`，主机名必须完全匹配
fn is_local_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    let scheme_ok = matches!(uri.scheme_str(), Some("http") | Some("https"));
    let plain_authority = uri
        .authority()
        .is_some_and(|a| !a.as_str().contains('@'));
    let no_path = matches!(uri.path(), "" | "/") && uri.query().is_none();

    scheme_ok
        && plain_authority
        && no_path
        && matches!(uri.host(), Some("localhost") | Some("127.0.0.1"))
}

/// 创建CORS中间件 - 仅允许localhost（前端开发服务器）
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            |origin: &HeaderValue, _| origin.to_str().map(is_local_origin).unwrap_or(false),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// 创建请求日志layer（用于HTTP请求追踪）
pub fn create_trace_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
}

/// 请求日志中间件
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_origins() {
        assert!(is_local_origin("http://localhost:5173"));
        assert!(is_local_origin("http://127.0.0.1:8765"));
        assert!(!is_local_origin("http://example.com"));
        assert!(!is_local_origin("null"));
    }

    #[test]
    fn test_lookalike_origins_rejected() {
        assert!(is_local_origin("https://localhost"));
        assert!(!is_local_origin("http://localhost.evil.example"));
        assert!(!is_local_origin("http://127.0.0.1.evil.com:8080"));
        assert!(!is_local_origin("http://localhost@evil.com"));
        assert!(!is_local_origin("http://localhostx:5173"));
        assert!(!is_local_origin("ftp://localhost"));
        assert!(!is_local_origin("http://localhost/app"));
    }
}
