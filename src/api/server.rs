//! Gateway server lifecycle: bind → spawn background task → return handle
//! with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::gateway_router;
use crate::api::types::ApiContext;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind gateway server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to get server address: {0}")]
    LocalAddr(std::io::Error),
}

/// Handle to a running gateway server.
pub struct GatewayServer {
    addr: SocketAddr,
    started_at: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GatewayServer {
    /// Bound address (the real port when started on port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// RFC 3339 start time.
    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Signal graceful shutdown. In-flight requests are allowed to finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Gateway server shutdown signal sent");
        }
    }

    /// Shut down and wait for the serve task to exit.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            tracing::error!("Gateway server task failed: {e}");
        }
    }
}

/// Bind `addr`, mount `gateway_router`, and serve in a background task.
pub async fn start_gateway_server_on(
    ctx: ApiContext,
    addr: SocketAddr,
) -> Result<GatewayServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = gateway_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Gateway server received shutdown signal");
        };

        tracing::info!(%addr, "Gateway server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Gateway server error: {e}");
        }

        tracing::info!("Gateway server stopped");
    });

    Ok(GatewayServer {
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::StaticCredentials;
    use crate::pipeline::summary::{MockLlmClient, SummaryPipeline};

    fn test_context() -> ApiContext {
        ApiContext::new(Arc::new(SummaryPipeline::new(
            Box::new(MockLlmClient::new(r#"{"symptoms": ["Sốt"]}"#)),
            Box::new(StaticCredentials::new("test-key")),
            "gemini-2.0-flash",
        )))
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let server = start_gateway_server_on(test_context(), loopback())
            .await
            .unwrap();
        assert_ne!(server.addr().port(), 0);
        assert!(!server.started_at().is_empty());

        let url = format!("http://{}/api/health", server.addr());
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "no-store"
        );
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["credentialConfigured"], true);

        server.stop().await;
    }

    #[tokio::test]
    async fn gateway_answers_over_tcp() {
        let server = start_gateway_server_on(test_context(), loopback())
            .await
            .unwrap();

        let url = format!("http://{}/api/gemini", server.addr());
        let response = reqwest::Client::new()
            .post(&url)
            .json(&serde_json::json!({"prompt": "Sốt cao"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["symptoms"], serde_json::json!(["Sốt"]));
        assert_eq!(json["clinical_note"], "");

        server.stop().await;
    }

    #[tokio::test]
    async fn stopped_server_refuses_connections() {
        let server = start_gateway_server_on(test_context(), loopback())
            .await
            .unwrap();
        let addr = server.addr();
        server.stop().await;

        let result = reqwest::get(format!("http://{addr}/api/health")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = start_gateway_server_on(test_context(), loopback())
            .await
            .unwrap();
        let err = start_gateway_server_on(test_context(), first.addr())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.stop().await;
    }
}
