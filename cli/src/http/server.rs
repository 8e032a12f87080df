//! HTTP服务器生命周期管理

use super::{
    middleware::{create_middleware_stack, create_trace_layer, request_logger},
    routes::create_router,
    AppState,
};
use crate::commands::cli::ServeArgs;
use axum::middleware;
use c3d_core::api::{
    spawn_sweeper, AppConfig, CliError, RetentionPolicy, LIBRARY_PREFIX,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 解析固定端口：`PORT` 环境变量优先，其次 `--port`
///
/// 返回 `None` 时由调用方从配置的起始端口开始探测。
pub fn resolve_port(env_port: Option<&str>, cli_port: Option<u16>) -> Result<Option<u16>, CliError> {
    match env_port.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<u16>()
            .map(Some)
            .map_err(|e| CliError::Config(format!("invalid PORT {raw:?}: {e}"))),
        None => Ok(cli_port),
    }
}

/// 从 `start` 开始依次尝试绑定，返回第一个可用端口的监听器
pub async fn bind_first_available(
    host: &str,
    start: u16,
    span: u16,
) -> Result<(TcpListener, u16), CliError> {
    let end = (start as u32 + span.max(1) as u32).min(u16::MAX as u32 + 1);
    for port in start as u32..end {
        let port = port as u16;
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => tracing::debug!(port, error = %e, "port unavailable"),
        }
    }
    Err(CliError::Command(format!(
        "no available port in range {start}..{end} on {host}"
    )))
}

/// 处理 serve 命令
pub async fn handle_serve(args: ServeArgs, cfg: &AppConfig) -> Result<(), CliError> {
    let mut cfg = cfg.clone();
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(dir) = args.frontend_dir {
        cfg.frontend.dir = Some(dir.to_string_lossy().into_owned());
    }
    if let Some(root) = args.temp_root {
        cfg.gateway.temp_root = Some(root.to_string_lossy().into_owned());
    }

    let gateway = c3d_plugins::factory::build_gateway(&cfg);
    tokio::fs::create_dir_all(gateway.temp_root())
        .await
        .map_err(|e| {
            CliError::Command(format!(
                "create temp root {} failed: {e}",
                gateway.temp_root().display()
            ))
        })?;

    let fixed = resolve_port(std::env::var("PORT").ok().as_deref(), args.port)?;
    let host = cfg.server.host.clone();
    let (listener, port) = match fixed {
        Some(port) => {
            let listener = TcpListener::bind((host.as_str(), port))
                .await
                .map_err(|e| CliError::Command(format!("bind {host}:{port} failed: {e}")))?;
            (listener, port)
        }
        None => bind_first_available(&host, cfg.server.port, cfg.server.port_scan_span).await?,
    };

    let (shutdown_tx, _) = broadcast::channel(1);
    let state = AppState::new(gateway.clone(), cfg.frontend.dir_path(), shutdown_tx.clone());

    let sweeper = match cfg.gateway.retention {
        RetentionPolicy::Retain => Some(spawn_sweeper(
            gateway.temp_root().to_path_buf(),
            vec![cfg.gateway.workdir_prefix.clone(), LIBRARY_PREFIX.to_string()],
            Duration::from_secs(cfg.gateway.retain_ttl_secs),
            Duration::from_secs(cfg.gateway.sweep_interval_secs),
            shutdown_tx.subscribe(),
        )),
        RetentionPolicy::Delete => None,
    };

    println!("Starting C3D server on port {port}");
    match state.frontend_dir.as_deref() {
        Some(dir) if state.frontend_available() => {
            println!("Frontend available: {}", dir.display());
            println!("Web viewer: http://localhost:{port}");
        }
        _ => println!("Frontend not found; serving API only"),
    }
    println!("API: http://localhost:{port}/api");

    info!(
        host = %host,
        port,
        interpreter = %cfg.gateway.interpreter,
        temp_root = %gateway.temp_root().display(),
        runner = gateway.runner_name(),
        "HTTP server listening"
    );

    // 留出余量，脚本超时应先于请求超时触发
    let request_timeout = Duration::from_secs(
        cfg.gateway.max_timeout_secs + cfg.server.request_timeout_margin_secs,
    ) + Duration::from_millis(cfg.gateway.kill_grace_ms);

    let app = create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack(request_timeout))
        .layer(create_trace_layer());

    let mut shutdown_rx = shutdown_tx.subscribe();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                }
                _ = wait_for_sigterm() => {
                    info!("Received SIGTERM signal");
                }
            }

            info!("Starting graceful shutdown...");
        })
        .await;

    // 停止保留目录清理任务
    let _ = shutdown_tx.send(());
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "retention sweeper did not stop cleanly");
        }
    }

    served.map_err(|e| CliError::Command(format!("server error: {e}")))?;
    info!("Server shutdown complete");
    Ok(())
}

/// 等待 SIGTERM 信号（Unix系统）
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

/// Windows 系统不支持 SIGTERM，使用空操作
#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
