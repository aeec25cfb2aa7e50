use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use matchbook::{
    Book, CancelError, ClientId, DepthLevel, Execution, OrderData, OrderId, Price, Quantity, Side,
    SubmitError, SubmitOutcome, Symbol,
};

#[derive(Debug, Deserialize)]
struct SubmitOrderRequest {
    client_id: u64,
    side: Side,
    price: u64,
    shares: u64,
}

#[derive(Debug, Serialize)]
struct SubmitOrderResponse {
    outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
struct BookStateResponse {
    symbol: Symbol,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
    pending_executions: usize,
}

#[derive(Debug, Deserialize)]
struct DepthParams {
    side: Side,
    #[serde(default = "default_depth_levels")]
    levels: usize,
}

fn default_depth_levels() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

struct AppState {
    book: Mutex<Book>,
}

type ErrorReply = (StatusCode, ResponseJson<ErrorResponse>);

fn error_reply(status: StatusCode, error: impl ToString) -> ErrorReply {
    (
        status,
        ResponseJson(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

async fn health() -> &'static str {
    "matchbook is running"
}

async fn get_book_state(State(state): State<Arc<AppState>>) -> ResponseJson<BookStateResponse> {
    let book = state.book.lock().unwrap();
    ResponseJson(BookStateResponse {
        symbol: book.symbol(),
        best_bid: book.best_bid(),
        best_ask: book.best_ask(),
        pending_executions: book.pending_executions(),
    })
}

async fn get_depth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DepthParams>,
) -> ResponseJson<Vec<DepthLevel>> {
    let book = state.book.lock().unwrap();
    ResponseJson(book.depth(params.side, params.levels))
}

async fn submit_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<ResponseJson<SubmitOrderResponse>, ErrorReply> {
    let intent = OrderData::new(
        ClientId::new(request.client_id),
        request.side,
        Price::new(request.price),
        Quantity::new(request.shares),
    );

    let mut book = state.book.lock().unwrap();
    match book.submit(intent) {
        Ok(outcome) => {
            info!(
                client_id = request.client_id,
                side = ?request.side,
                price = request.price,
                shares = request.shares,
                ?outcome,
                "order accepted"
            );
            Ok(ResponseJson(SubmitOrderResponse { outcome }))
        }
        Err(error @ SubmitError::InvalidOrder { .. }) => {
            warn!(client_id = request.client_id, %error, "order rejected");
            Err(error_reply(StatusCode::BAD_REQUEST, error))
        }
        Err(error @ SubmitError::SelfTradeRejected) => {
            warn!(client_id = request.client_id, %error, "order rejected");
            Err(error_reply(StatusCode::CONFLICT, error))
        }
    }
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<u64>,
) -> Result<StatusCode, ErrorReply> {
    let mut book = state.book.lock().unwrap();
    match book.cancel(OrderId::new(order_id)) {
        Ok(()) => {
            info!(order_id, "order cancelled");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(error @ CancelError::UnknownOrder(_)) => {
            warn!(order_id, %error, "cancel rejected");
            Err(error_reply(StatusCode::NOT_FOUND, error))
        }
    }
}

/// Hands all pending executions to the caller and empties the queue, the
/// pull half of execution reporting.
async fn drain_executions(State(state): State<Arc<AppState>>) -> ResponseJson<Vec<Execution>> {
    let mut book = state.book.lock().unwrap();
    let executions = book.drain_executions();
    if !executions.is_empty() {
        info!(count = executions.len(), "executions drained");
    }
    ResponseJson(executions)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let symbol = std::env::var("MATCHBOOK_SYMBOL").unwrap_or_else(|_| "AAPL".to_string());
    let symbol = Symbol::try_from_str(&symbol)
        .unwrap_or_else(|| panic!("MATCHBOOK_SYMBOL {symbol:?} is not a valid symbol"));
    let addr = std::env::var("MATCHBOOK_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let state = Arc::new(AppState {
        book: Mutex::new(Book::new(symbol)),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/book", get(get_book_state))
        .route("/book/depth", get(get_depth))
        .route("/orders", post(submit_order))
        .route("/orders/:order_id", delete(cancel_order))
        .route("/executions", get(drain_executions))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    info!(%symbol, %addr, "matchbook server listening");
    axum::serve(listener, app).await.unwrap();
}
