use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use yuedu_backend::models::Book;
use yuedu_backend::search::{SearchEvent, SearchRequest, SearchResult, SearchSession};
use yuedu_backend::{Error, Result};

use super::{respond, ApiResult};
use crate::state::AppState;

async fn find_book(state: &AppState, book_url: &str) -> Result<Book> {
    state
        .library
        .books
        .get_book(book_url)
        .await?
        .ok_or_else(|| Error::NotFound(format!("book {}", book_url)))
}

/// Run a scan to the end and return the final results / 正文搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Vec<SearchResult>> {
    let result = async {
        if req.query.trim().is_empty() {
            return Err(Error::InvalidInput("搜索关键词不能为空".to_string()));
        }
        let book = find_book(&state, &req.book_url).await?;
        state.search.search(book, req).collect_final().await
    }
    .await;
    respond(result)
}

pub async fn search_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Each text frame is a search request; a new request replaces the running scan
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<SearchEvent>(32);
    let session = Arc::new(SearchSession::new(state.search.clone()));

    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to encode search event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let request: SearchRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                let _ = out_tx.send(SearchEvent::Failed { search_id: 0, error: e.to_string() }).await;
                continue;
            }
        };

        if request.query.trim().is_empty() {
            session.stop();
            let _ = out_tx
                .send(SearchEvent::Batch { search_id: 0, results: Vec::new(), is_final: true })
                .await;
            continue;
        }

        let book = match find_book(&state, &request.book_url).await {
            Ok(book) => book,
            Err(e) => {
                session.stop();
                let _ = out_tx.send(SearchEvent::Failed { search_id: 0, error: e.to_string() }).await;
                continue;
            }
        };

        if let Some(handle) = session.start(book, request) {
            let out = out_tx.clone();
            let session = session.clone();
            tokio::spawn(async move {
                let mut stream = handle.into_stream();
                while let Some(event) = stream.next().await {
                    // drop batches of a replaced or stopped scan
                    if session.current_id() != Some(event.search_id()) || out.send(event).await.is_err() {
                        break;
                    }
                }
            });
        }
    }

    session.stop();
    drop(out_tx);
    let _ = writer.await;
    tracing::debug!("Search socket closed");
}
