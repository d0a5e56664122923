use crate::{
    app::{AppContext, AppError, Health},
    resolver::QueryPayload,
    semantic::RankedResult,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::set_header::SetResponseHeaderLayer;

#[derive(Clone)]
struct SharedState {
    app: Arc<AppContext>,
}

pub fn router(app: Arc<AppContext>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    let recommend_routes = get(health)
        .post(recommend)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/recommend", recommend_routes)
        .route("/health", get(health).fallback(method_not_allowed))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: Arc<AppContext>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("listening on {bind}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Serve `app` until Ctrl+C or SIGTERM.
///
/// The index should already be built; see [`AppContext::warm_up`].
pub fn start_daemon(app: Arc<AppContext>, bind: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app, bind))
}

#[derive(Debug)]
struct HttpError(AppError);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::Resolution(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Embedding(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentRow {
    #[serde(rename = "Assessment name")]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub results: Vec<AssessmentRow>,
}

impl From<Vec<RankedResult>> for RecommendResponse {
    fn from(results: Vec<RankedResult>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|r| AssessmentRow {
                    name: r.assessment_name,
                    url: r.url,
                })
                .collect(),
        }
    }
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<Health> {
    Json(state.app.health())
}

async fn recommend(
    State(state): State<Arc<SharedState>>,
    body: Bytes,
) -> Result<Json<RecommendResponse>, HttpError> {
    // an empty body is treated as `{}`
    let payload: QueryPayload = if body.iter().all(u8::is_ascii_whitespace) {
        QueryPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| AppError::BadRequest(format!("invalid request body: {err}")))?
    };

    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.recommend(&payload)
            .map(|results| Json(results.into()))
            .map_err(Into::into)
    })
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        ],
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method not allowed"})),
    )
}
