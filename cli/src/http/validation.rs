//! 基础请求验证逻辑

use c3d_core::api::ExecutionRequest;

use super::models::{HttpServerError, RenderRequest};

/// 验证render请求并转换为网关请求
pub fn validate_render_request(req: RenderRequest) -> Result<ExecutionRequest, HttpServerError> {
    if req.script.trim().is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "Script cannot be empty".to_string(),
        ));
    }

    let timeout_secs = match req.timeout_secs {
        None => None,
        Some(t) if t <= 0 => {
            return Err(HttpServerError::InvalidRequest(format!(
                "timeout_secs must be a positive integer (got {t})"
            )));
        }
        Some(t) => Some(t as u64),
    };

    // 前端在未指定文件名时可能发送空字符串；其余名称原样传给网关
    let output_filename = match req.output_filename {
        Some(name) if name.trim().is_empty() => None,
        Some(name) if name.trim() != name => {
            return Err(HttpServerError::InvalidRequest(
                "output_filename must not have leading or trailing whitespace".to_string(),
            ))
        }
        other => other,
    };

    Ok(ExecutionRequest {
        script: req.script,
        output_filename,
        timeout_secs,
    })
}

/// 验证load-stl的文件路径参数
pub fn validate_file_path(file_path: &str) -> Result<(), HttpServerError> {
    if file_path.trim().is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "file_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(script: &str, timeout: Option<i64>, name: Option<&str>) -> RenderRequest {
        RenderRequest {
            script: script.to_string(),
            output_filename: name.map(str::to_string),
            timeout_secs: timeout,
        }
    }

    #[test]
    fn test_validate_render_success() {
        let out = validate_render_request(req("print(1)", Some(30), Some("a.stl"))).unwrap();
        assert_eq!(out.timeout_secs, Some(30));
        assert_eq!(out.output_filename.as_deref(), Some("a.stl"));
    }

    #[test]
    fn test_validate_render_empty_script() {
        match validate_render_request(req("  ", None, None)) {
            Err(HttpServerError::InvalidRequest(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected InvalidRequest error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_render_non_positive_timeout() {
        for t in [0, -5] {
            match validate_render_request(req("x = 1", Some(t), None)) {
                Err(HttpServerError::InvalidRequest(msg)) => assert!(msg.contains("positive")),
                other => panic!("Expected InvalidRequest error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_render_blank_filename_dropped() {
        let out = validate_render_request(req("x = 1", None, Some(""))).unwrap();
        assert!(out.output_filename.is_none());
        assert!(out.timeout_secs.is_none());

        let out = validate_render_request(req("x = 1", None, Some("   "))).unwrap();
        assert!(out.output_filename.is_none());
    }

    #[test]
    fn test_validate_render_padded_filename_rejected() {
        for name in [" part.brep", "part.brep ", "part.stl\n"] {
            match validate_render_request(req("x = 1", None, Some(name))) {
                Err(HttpServerError::InvalidRequest(msg)) => assert!(msg.contains("whitespace")),
                other => panic!("Expected InvalidRequest for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_file_path() {
        assert!(validate_file_path("/models/cube.stl").is_ok());
        assert!(validate_file_path(" ").is_err());
    }
}
