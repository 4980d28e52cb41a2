mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    clock::SystemClock,
    config::{Concentration, VisualizationConfig},
    engine::{Engine, EngineBuilder, Frame},
    panel::AirQualityReport,
    presentation::VisualHandle,
    scene::Scene,
};

type SharedEngine = Arc<Mutex<Engine<Scene, SystemClock>>>;

#[derive(Clone)]
struct AppState {
    engine: SharedEngine,
    concentration: Concentration,
    broadcaster: broadcast::Sender<String>,
    latest_frame: Arc<Mutex<Option<Frame>>>,
}

pub struct WebServerConfig {
    pub config: VisualizationConfig,
    pub host: String,
    pub port: u16,
    /// How often the driver polls the particle scheduler.
    pub poll_interval: Duration,
}

#[derive(Serialize)]
struct StateEnvelope {
    frame: Option<Frame>,
}

#[derive(Deserialize)]
struct ConcentrationUpdate {
    value: f64,
}

#[derive(Serialize)]
struct KeyResponse {
    key: String,
    applied: Option<f64>,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        config,
        host,
        port,
        poll_interval,
    } = config;

    let concentration = Concentration::new(config.current_value);
    let mut engine = EngineBuilder::new(config)
        .with_concentration(concentration.clone())
        .build(SystemClock);
    engine.start();
    let engine: SharedEngine = Arc::new(Mutex::new(engine));

    let (tx, _) = broadcast::channel::<String>(64);
    let latest_frame: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));

    let ticker = tokio::spawn(drive(
        engine.clone(),
        latest_frame.clone(),
        tx.clone(),
        poll_interval,
    ));

    let state = AppState {
        engine: engine.clone(),
        concentration,
        broadcaster: tx,
        latest_frame,
    };

    let router = Router::new()
        .route("/", get(index))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/events", get(stream_events))
        .route("/api/concentration", post(set_concentration))
        .route("/api/keys/:key", post(press_key))
        .route("/api/select/:handle", post(select_particle))
        .route("/api/panel/close", post(close_panel))
        .layer(middleware::map_response(allow_cross_origin))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(target: "web", "PM2.5 visualization live at http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    let released = engine.lock().expect("engine lock poisoned").stop();
    info!(target: "web", "server stopped, released {released} particles");
    Ok(())
}

async fn drive(
    engine: SharedEngine,
    latest_frame: Arc<Mutex<Option<Frame>>>,
    broadcaster: broadcast::Sender<String>,
    poll_interval: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    loop {
        interval.tick().await;
        let frame = {
            let mut engine = engine.lock().expect("engine lock poisoned");
            engine.advance();
            engine.frame()
        };
        match serde_json::to_string(&frame) {
            Ok(payload) => {
                // No subscribers is not an error.
                let _ = broadcaster.send(payload);
            }
            Err(err) => warn!(target: "web", "failed to encode frame: {err}"),
        }
        *latest_frame.lock().expect("latest frame lock poisoned") = Some(frame);
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target: "web", "shutting down");
}

async fn allow_cross_origin(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        assets::APP_JS,
    )
}

async fn latest_state(State(state): State<AppState>) -> Json<StateEnvelope> {
    let frame = state
        .latest_frame
        .lock()
        .expect("latest frame lock poisoned")
        .clone();
    Json(StateEnvelope { frame })
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

async fn set_concentration(
    State(state): State<AppState>,
    Json(update): Json<ConcentrationUpdate>,
) -> Result<Json<AirQualityReport>, (StatusCode, String)> {
    if !update.value.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            "concentration must be a finite number".into(),
        ));
    }
    state.concentration.set(update.value);
    info!(target: "web", "concentration set to {}", update.value);
    Ok(Json(AirQualityReport::for_concentration(update.value)))
}

async fn press_key(State(state): State<AppState>, Path(key): Path<String>) -> Json<KeyResponse> {
    let applied = state
        .engine
        .lock()
        .expect("engine lock poisoned")
        .press_key(&key);
    debug!(target: "web", "key {key} -> {applied:?}");
    Json(KeyResponse { key, applied })
}

async fn select_particle(
    State(state): State<AppState>,
    Path(handle): Path<u64>,
) -> Result<Json<AirQualityReport>, StatusCode> {
    let mut engine = state.engine.lock().expect("engine lock poisoned");
    let report = engine.select(VisualHandle::new(handle)).cloned();
    report.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn close_panel(State(state): State<AppState>) -> StatusCode {
    state
        .engine
        .lock()
        .expect("engine lock poisoned")
        .close_panel();
    StatusCode::NO_CONTENT
}
