//! HTTP API — the remote-control surface of the deck.
//!
//! Every interaction route only enqueues an [`EngineEvent`]; the page
//! inspection route reads the snapshot the engine publishes after each
//! processed event.  The search endpoint is served directly from the
//! [`SearchProvider`] — it is the backend the assistant's client posts to.

use axum::{extract::State, http::StatusCode, response::Json, routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use deck_proto::protocol::{CommandEvent, SearchRequest, SearchResponse};
use deck_proto::youtube;

use crate::backend::SearchProvider;
use crate::event::EngineEvent;
use crate::page::{ElementSpec, NodeId};

#[derive(Clone)]
pub struct HttpState {
    pub event_tx: mpsc::Sender<EngineEvent>,
    pub snapshot_rx: watch::Receiver<serde_json::Value>,
    pub provider: SearchProvider,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// Outcome of `/api/message` — the parsed command on success, mirroring the
/// wire shape of the command channel.
#[derive(Debug, Serialize)]
struct MessageOutcome {
    success: bool,
    #[serde(flatten)]
    command: Option<CommandEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertBody {
    parent: Option<u64>,
    element: ElementSpec,
}

#[derive(Debug, Deserialize)]
struct NodeBody {
    node: u64,
}

#[derive(Debug, Deserialize)]
struct InputBody {
    node: u64,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PasteBody {
    node: u64,
    text: String,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/page", get(get_page))
        .route("/api/command", post(post_command))
        .route("/api/message", post(post_message))
        .route("/youtube-search", post(youtube_search))
        .route("/api/page/insert", post(page_insert))
        .route("/api/page/click", post(page_click))
        .route("/api/page/input", post(page_input))
        .route("/api/page/submit", post(page_submit))
        .route("/api/page/paste", post(page_paste))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state: HttpState,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state);
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_page(State(state): State<HttpState>) -> Json<serde_json::Value> {
    Json(state.snapshot_rx.borrow().clone())
}

async fn post_command(
    State(state): State<HttpState>,
    Json(cmd): Json<CommandEvent>,
) -> StatusCode {
    info!("HTTP API: command {:?}", cmd);
    enqueue(&state, EngineEvent::Command(cmd)).await
}

async fn post_message(
    State(state): State<HttpState>,
    Json(body): Json<MessageBody>,
) -> Json<MessageOutcome> {
    match youtube::parse_media_message(&body.message) {
        Ok(cmd) => {
            info!("HTTP API: message parsed to {:?}", cmd);
            let _ = enqueue(&state, EngineEvent::Command(cmd.clone())).await;
            Json(MessageOutcome {
                success: true,
                command: Some(cmd),
                message: None,
            })
        }
        Err(e) => Json(MessageOutcome {
            success: false,
            command: None,
            message: Some(e.to_string()),
        }),
    }
}

async fn youtube_search(
    State(state): State<HttpState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    info!("HTTP API: search '{}'", request.query);
    Json(state.provider.search(&request.query).await)
}

async fn page_insert(State(state): State<HttpState>, Json(body): Json<InsertBody>) -> StatusCode {
    enqueue(
        &state,
        EngineEvent::PageInsert {
            parent: body.parent.map(NodeId),
            element: body.element,
        },
    )
    .await
}

async fn page_click(State(state): State<HttpState>, Json(body): Json<NodeBody>) -> StatusCode {
    enqueue(
        &state,
        EngineEvent::Click {
            node: NodeId(body.node),
        },
    )
    .await
}

async fn page_input(State(state): State<HttpState>, Json(body): Json<InputBody>) -> StatusCode {
    enqueue(
        &state,
        EngineEvent::Input {
            node: NodeId(body.node),
            value: body.value,
        },
    )
    .await
}

async fn page_submit(State(state): State<HttpState>, Json(body): Json<NodeBody>) -> StatusCode {
    enqueue(
        &state,
        EngineEvent::Submit {
            node: NodeId(body.node),
        },
    )
    .await
}

async fn page_paste(State(state): State<HttpState>, Json(body): Json<PasteBody>) -> StatusCode {
    enqueue(
        &state,
        EngineEvent::Paste {
            node: NodeId(body.node),
            text: body.text,
        },
    )
    .await
}

async fn enqueue(state: &HttpState, evt: EngineEvent) -> StatusCode {
    if state.event_tx.send(evt).await.is_err() {
        error!("Failed to enqueue engine event — engine gone");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}
