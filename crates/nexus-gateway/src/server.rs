//! Axum gateway server.

use crate::channels::InboundMessage;
use crate::dispatch::{Dispatcher, GatewayServices};
use crate::stream::{keep_alive_frame, WsEventSink};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use nexus_core::config::BindMode;
use nexus_core::{ChannelKind, Config, Session};
use nexus_events::EventRouter;
use nexus_security::{Credentials, SecurityManager};
use nexus_sessions::{spawn_sweeper, SessionStore};
use nexus_store::{AuditRecords, MemoryStore, RunRecords, SessionRecords};
use nexus_workflows::{WorkflowExecutor, WorkflowRegistry, WorkflowRuntime};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// The gateway: composed services plus the HTTP/WebSocket surface.
pub struct Gateway {
    services: Arc<GatewayServices>,
    dispatcher: Arc<Dispatcher>,
}

#[derive(Clone)]
struct AppState {
    services: Arc<GatewayServices>,
    dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    /// Compose a gateway over explicit storage backends.
    pub fn with_stores(
        config: Config,
        runtime: Arc<dyn WorkflowRuntime>,
        session_records: Arc<dyn SessionRecords>,
        run_records: Arc<dyn RunRecords>,
        audit_records: Arc<dyn AuditRecords>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(session_records, &config.sessions));
        let security = Arc::new(SecurityManager::standard(
            &config.security,
            audit_records,
            sessions.clone(),
        ));
        let events = Arc::new(EventRouter::new(config.events.queue_capacity));
        let registry = Arc::new(WorkflowRegistry::new());
        let executor = Arc::new(WorkflowExecutor::new(
            registry,
            runtime,
            run_records,
            security.clone(),
            events.clone(),
            &config.executor,
        ));

        let services = Arc::new(GatewayServices {
            sessions,
            security,
            executor,
            events,
            config,
        });
        let dispatcher = Arc::new(Dispatcher::new(services.clone()));
        Self {
            services,
            dispatcher,
        }
    }

    /// Compose a gateway over the in-memory reference store.
    pub fn in_memory(config: Config, runtime: Arc<dyn WorkflowRuntime>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(config, runtime, store.clone(), store.clone(), store)
    }

    /// Shared services.
    pub fn services(&self) -> &Arc<GatewayServices> {
        &self.services
    }

    /// The dispatcher, for in-process callers and tests.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The workflow registry, for wiring deployments.
    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        self.services.executor.registry()
    }

    /// Run the server until shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.bind_address();
        let config = &self.services.config;

        if config.gateway.bind != BindMode::Loopback {
            warn!("Gateway binding to {addr}; it is reachable from the network");
            if config.security.principals.is_empty() {
                warn!("No principals configured; only anonymous operations are possible");
            }
        }

        let sweep = std::time::Duration::from_secs(config.sessions.sweep_interval_secs);
        spawn_sweeper(self.services.sessions.clone(), sweep);

        let app = self.router();
        info!("Starting Nexus gateway on {addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Build the router. Channel detection happens in the fallback, so
    /// every operation path flows through the dispatcher.
    pub fn router(&self) -> Router {
        let state = AppState {
            services: self.services.clone(),
            dispatcher: self.dispatcher.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/capabilities", get(capabilities_handler))
            .route("/events", get(events_handler))
            .fallback(dispatch_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        if self.services.config.gateway.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }

    fn bind_address(&self) -> SocketAddr {
        let ip = match self.services.config.gateway.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };
        SocketAddr::from((ip, self.services.config.gateway.port))
    }
}

/// All operation traffic lands here; the dispatcher detects the channel
/// and hands the message to the matched adapter.
async fn dispatch_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed = if body.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "success": false,
                        "error": {
                            "kind": "validation",
                            "message": "request body is not valid JSON",
                        },
                    })),
                )
                    .into_response()
            }
        }
    };

    let mut inbound = InboundMessage::new(uri.path(), parsed);
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            inbound = inbound.with_header(name.as_str(), value);
        }
    }

    let response = state.dispatcher.dispatch(inbound).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

/// Channel capability discovery.
async fn capabilities_handler(State(state): State<AppState>) -> Response {
    Json(state.dispatcher.capabilities()).into_response()
}

/// Health check.
async fn health_handler(State(state): State<AppState>) -> Response {
    let active_runs = state.services.executor.active_runs().await.unwrap_or(0);
    let stats = state.services.events.stats();
    Json(serde_json::json!({
        "status": "ok",
        "active_runs": active_runs,
        "subscriptions": state.services.events.subscription_count(),
        "events": {
            "delivered": stats.delivered,
            "dropped": stats.dropped,
        },
    }))
    .into_response()
}

/// WebSocket event stream: `GET /events?pattern=resource.*`.
///
/// The subscription is tenant-scoped by the authenticated session; each
/// frame carries the event id as a resumption cursor, and idle
/// connections receive periodic keep-alive frames with no payload.
async fn events_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let session = match authenticate_stream(&state, &headers).await {
        Ok(session) => session,
        Err(status) => return status.into_response(),
    };
    let pattern = params
        .get("pattern")
        .cloned()
        .unwrap_or_else(|| "*".to_string());

    ws.on_upgrade(move |socket| serve_events(socket, state, session, pattern))
}

async fn authenticate_stream(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Session, StatusCode> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) => state
            .services
            .security
            .authenticate(Credentials::Bearer(token), ChannelKind::Http)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED),
        None if state.services.config.gateway.require_auth => Err(StatusCode::UNAUTHORIZED),
        None => {
            let (session, _token) = state
                .services
                .sessions
                .anonymous(ChannelKind::Http)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(session)
        }
    }
}

async fn serve_events(socket: WebSocket, state: AppState, session: Session, pattern: String) {
    let capacity = state.services.config.events.queue_capacity;
    let keep_alive =
        std::time::Duration::from_secs(state.services.config.events.keep_alive_secs.max(1));

    let (tx, mut rx) = mpsc::channel::<String>(capacity);
    let sink = WsEventSink::new(tx);
    let subscription =
        match state
            .services
            .events
            .subscribe(sink, &pattern, session.tenant_id.clone())
        {
            Ok(id) => id,
            Err(e) => {
                let mut socket = socket;
                let _ = socket
                    .send(Message::Text(
                        serde_json::json!({
                            "type": "error",
                            "message": e.to_string(),
                        })
                        .to_string(),
                    ))
                    .await;
                return;
            }
        };

    info!(session_id = %session.id, pattern, "event stream connected");
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut ticker = tokio::time::interval(keep_alive);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it.
    ticker.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if ws_tx.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if ws_tx.send(Message::Text(keep_alive_frame())).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("event stream socket error: {e}");
                    break;
                }
                _ => {}
            },
        }
    }

    state.services.events.unsubscribe(&subscription);
    info!(session_id = %session.id, "event stream disconnected");
}
