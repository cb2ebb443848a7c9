#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use handlebars::Handlebars;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::app::{App, UpdateRequest};
use crate::error::{DashError, Result};
use crate::export;
use crate::figure::Figure;
use crate::table::DataTable;

const INDEX_TEMPLATE: &str = include_str!("./static/index.hbs");
const RENDERER_JS: &str = include_str!("./static/renderer.js");

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ServerState {
    app: App,
    templates: Handlebars<'static>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

#[derive(Deserialize)]
struct ImageQuery {
    width: Option<u32>,
    height: Option<u32>,
}

fn error_response(status: StatusCode, e: &DashError) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: e.to_string(),
        }),
    )
        .into_response()
}

/// JSON embedded in a `<script>` element must not close it early
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

/// Builds the router serving `app` under its configured url base
pub fn router(app: App) -> Result<Router> {
    let mut templates = Handlebars::new();
    templates.set_strict_mode(true);
    templates
        .register_template_string("index", INDEX_TEMPLATE)
        .map_err(|e| DashError::Config(format!("index template: {}", e)))?;

    let config = app.config().clone();
    let state = Arc::new(ServerState { app, templates });

    let mut router = Router::new()
        .route(&config.route(""), get(serve_index))
        .route(&config.route("_dash-layout"), get(get_layout))
        .route(&config.route("_dash-dependencies"), get(get_dependencies))
        .route(&config.route("_dash-update-component"), post(update_component))
        .route(&config.route("_dash-renderer.js"), get(serve_renderer))
        .route(&config.route("_dash-export/table.csv"), post(export_csv))
        .route(&config.route("_dash-export/table.xlsx"), post(export_xlsx))
        .route(&config.route("_dash-export/figure.png"), post(export_png))
        .nest_service(&config.route("assets"), ServeDir::new(&config.assets_dir))
        .with_state(state);

    if config.cors {
        router = router.layer(CorsLayer::permissive());
    }
    Ok(router)
}

/// Serves `app` until the process is stopped
pub async fn serve(app: App) -> Result<()> {
    let address = app.config().address();
    let base = app.config().url_base.clone();
    let router = router(app)?;

    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}{}", address, base);
    axum::serve(listener, router).await?;

    Ok(())
}

async fn serve_index(State(state): State<Arc<ServerState>>) -> Response {
    let app = &state.app;
    let config = app.config();
    let data = json!({
        "title": config.title,
        "url_base": config.url_base,
        "layout_html": app.layout().to_html(),
        "layout_json": script_json(&app.layout().to_value()),
        "config_json": script_json(&json!({ "url_base": config.url_base })),
    });

    match state.templates.render("index", &data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("index template failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &DashError::Config(e.to_string()),
            )
        }
    }
}

async fn get_layout(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.app.layout().clone())
}

async fn get_dependencies(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.app.dependencies())
}

async fn update_component(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpdateRequest>,
) -> impl IntoResponse {
    Json(state.app.update(&request))
}

async fn serve_renderer() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], RENDERER_JS)
}

async fn export_csv(Json(table): Json<DataTable>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"table.csv\""),
        ],
        table.to_csv(),
    )
}

async fn export_xlsx(Json(table): Json<DataTable>) -> Response {
    match table.to_xlsx() {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_MIME),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"table.xlsx\""),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn export_png(Query(size): Query<ImageQuery>, Json(figure): Json<Figure>) -> Response {
    let width = size.width.unwrap_or(800);
    let height = size.height.unwrap_or(600);

    // plotters renders synchronously
    let rendered = tokio::task::spawn_blocking(move || export::figure_to_png(&figure, width, height)).await;

    match rendered {
        Ok(Ok(png)) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, &e),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &DashError::Export(e.to_string()),
        ),
    }
}
