use super::clipboard::{Clipboard, SystemClipboard};
use super::controller::{UiController, FEEDBACK_DISPLAY};
use super::page;
use crate::client::DescriptionClient;
use crate::config::AppSettings;
use crate::encoder::{media_type_of, ImageEncoder};
use crate::error::ClipboardError;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::{net::TcpListener, sync::Mutex};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::instrument;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    controller: Mutex<UiController>,
    encoder: ImageEncoder,
    client: DescriptionClient,
    clipboard: Arc<dyn Clipboard>,
}

impl AppState {
    pub fn new(encoder: ImageEncoder, client: DescriptionClient, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            controller: Mutex::new(UiController::new()),
            encoder,
            client,
            clipboard,
        }
    }

    pub async fn snapshot(&self) -> UiController {
        self.controller.lock().await.clone()
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid upload: {0}")]
    Upload(#[from] MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "rejected request");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct LengthForm {
    max_words: Option<u32>,
}

#[derive(Serialize)]
struct Status {
    status: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(healthcheck))
        .route("/image", post(upload_image))
        .route("/length", post(set_length))
        .route("/describe", post(describe))
        .route("/copy", post(copy))
        .route("/clear", post(clear))
        .route("/dismiss", post(dismiss_error))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

async fn index(State(state): State<SharedState>) -> Html<String> {
    let ui = state.controller.lock().await;
    Html(page::render(&ui))
}

async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        status: "Available".into(),
    })
}

#[instrument(skip(state, multipart))]
async fn upload_image(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        // Browsers send octet-stream for files whose type they cannot guess.
        let mime_type = match declared.as_deref() {
            Some(mime) if mime != "application/octet-stream" => mime.to_string(),
            _ => media_type_of(&data).unwrap_or("application/octet-stream").to_string(),
        };

        let accepted = state
            .controller
            .lock()
            .await
            .select_image(file_name.as_deref(), &mime_type, &data);
        tracing::info!(%mime_type, bytes = data.len(), accepted, "image selected");
        break;
    }

    Ok(Redirect::to("/"))
}

async fn set_length(State(state): State<SharedState>, Form(form): Form<LengthForm>) -> Redirect {
    if let Some(max_words) = form.max_words {
        state.controller.lock().await.set_max_words(max_words);
    }
    Redirect::to("/")
}

#[instrument(skip(state, form))]
async fn describe(State(state): State<SharedState>, Form(form): Form<LengthForm>) -> Redirect {
    let job = {
        let mut ui = state.controller.lock().await;
        if let Some(max_words) = form.max_words {
            ui.set_max_words(max_words);
        }
        ui.begin_describe()
    };

    match job {
        Ok(job) => {
            tracing::info!(max_words = job.max_words, "describing image");
            tokio::spawn(async move {
                let result = job.run(&state.encoder, &state.client).await;
                state.controller.lock().await.finish_describe(result);
            });
        }
        Err(e) => tracing::warn!(error = %e, "describe ignored"),
    }

    Redirect::to("/")
}

#[instrument(skip(state))]
async fn copy(State(state): State<SharedState>) -> Redirect {
    let Some(text) = state.controller.lock().await.copy_text() else {
        return Redirect::to("/");
    };

    let clipboard = state.clipboard.clone();
    let result = tokio::task::spawn_blocking(move || clipboard.write_text(&text))
        .await
        .unwrap_or_else(|e| Err(ClipboardError(e.to_string())));

    let generation = state.controller.lock().await.apply_copy_result(result);
    if let Some(generation) = generation {
        spawn_feedback_revert(state, generation);
    }

    Redirect::to("/")
}

fn spawn_feedback_revert(state: SharedState, generation: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(FEEDBACK_DISPLAY).await;
        state.controller.lock().await.revert_copy_feedback(generation);
    });
}

async fn clear(State(state): State<SharedState>) -> Redirect {
    state.controller.lock().await.clear();
    Redirect::to("/")
}

async fn dismiss_error(State(state): State<SharedState>) -> Redirect {
    state.controller.lock().await.dismiss_error();
    Redirect::to("/")
}

pub async fn serve(settings: AppSettings) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let state = Arc::new(AppState::new(
        ImageEncoder::new(http.clone()),
        DescriptionClient::new(http, settings.proxy_url.clone()),
        Arc::new(SystemClipboard),
    ));

    let listener = TcpListener::bind(settings.get_address()).await?;

    tracing::info!("Image describer running on http://{}", listener.local_addr()?);
    tracing::info!("Describe requests go to {}", settings.proxy_url);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(crate::signal::shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::controller::{CopyFeedback, COPY_LABEL};
    use std::time::Duration;

    struct NoopClipboard;

    impl Clipboard for NoopClipboard {
        fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            Ok(())
        }
    }

    async fn described_state() -> SharedState {
        let state = Arc::new(AppState::new(
            ImageEncoder::default(),
            DescriptionClient::new(reqwest::Client::new(), "http://127.0.0.1:9/"),
            Arc::new(NoopClipboard),
        ));
        {
            let mut ui = state.controller.lock().await;
            ui.select_image(None, "image/png", b"\x89PNG");
            ui.begin_describe().unwrap();
            ui.finish_describe(Ok("A dog.".into()));
        }
        state
    }

    async fn label(state: &SharedState) -> &'static str {
        // Lets spawned revert timers register or fire.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        state.snapshot().await.copy_feedback().label()
    }

    #[tokio::test(start_paused = true)]
    async fn copy_feedback_lasts_three_seconds() {
        assert_eq!(FEEDBACK_DISPLAY, Duration::from_millis(3000));
        let state = described_state().await;

        let _ = copy(State(state.clone())).await;
        assert_eq!(label(&state).await, "😄 Copied");

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert_eq!(label(&state).await, "😄 Copied");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(label(&state).await, COPY_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn second_copy_restarts_the_feedback_window() {
        let state = described_state().await;

        let first = state.controller.lock().await.apply_copy_result(Ok(())).unwrap();
        spawn_feedback_revert(state.clone(), first);
        assert_eq!(label(&state).await, "😄 Copied");

        tokio::time::advance(Duration::from_millis(2000)).await;
        let second = state.controller.lock().await.apply_copy_result(Ok(())).unwrap();
        spawn_feedback_revert(state.clone(), second);
        assert_eq!(label(&state).await, "😄 Copied");

        // The first timer fires here but no longer owns the feedback.
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(label(&state).await, "😄 Copied");

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(label(&state).await, COPY_LABEL);
        assert_eq!(state.snapshot().await.copy_feedback(), CopyFeedback::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_after_clear_leaves_no_feedback() {
        let state = described_state().await;
        state.controller.lock().await.clear();

        let _ = copy(State(state.clone())).await;

        assert_eq!(state.snapshot().await.copy_feedback(), CopyFeedback::Idle);
    }
}
