use crate::commands::{Command, CommandDispatcher};
use crate::dashboard::{
    gallery_page, watering_page, Dashboard, DashboardView, ListPage, WateringSummary,
};
use crate::filter::{ListEndpoint, ListFilter};
use crate::view::GalleryItem;
use crate::errors::Error;
use crate::metrics;
use crate::model::Ack;
use crate::settings::{SettingField, SettingsForm};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
    commands: CommandDispatcher,
}

#[derive(Debug, Deserialize)]
pub struct DurationRequest {
    duration: Option<u32>,
}

/// Filters for the image and watering list pages
#[derive(Debug, Default, Deserialize)]
pub struct ListRequest {
    category: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    skip: Option<u32>,
    limit: Option<u32>,
}

impl ListRequest {
    fn filter(self, endpoint: ListEndpoint) -> ListFilter {
        let mut filter = ListFilter::new(self.limit.unwrap_or_else(|| endpoint.default_limit()).max(1))
            .dates(self.start_date, self.end_date);
        if let Some(category) = self.category {
            filter = filter.category(category);
        }
        filter.skip = self.skip.unwrap_or(0);
        filter
    }
}

#[derive(Debug, Serialize)]
pub struct SettingView {
    field: SettingField,
    label: &'static str,
    description: &'static str,
    value: String,
}

const DEFAULT_WATER_SECS: u32 = 5;
const DEFAULT_CHIRP_SECS: u32 = 3;

pub fn create_router(dashboard: Arc<Dashboard>, commands: CommandDispatcher) -> Router {
    let state = AppState {
        dashboard,
        commands,
    };

    Router::new()
        .route("/api/view", get(get_view))
        .route("/api/view/settings", get(get_settings).put(put_settings))
        .route("/api/view/images", get(images_view))
        .route("/api/view/watering", get(watering_view))
        .route("/api/actions/capture", post(capture))
        .route("/api/actions/water", post(water))
        .route("/api/actions/chirp", post(chirp))
        .route("/api/actions/refresh", post(refresh))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn get_view(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.render())
}

async fn images_view(
    State(state): State<AppState>,
    Query(request): Query<ListRequest>,
) -> Json<ListPage<Vec<GalleryItem>>> {
    let filter = request.filter(ListEndpoint::Images);
    Json(gallery_page(state.commands.client(), &filter, &Local).await)
}

async fn watering_view(
    State(state): State<AppState>,
    Query(request): Query<ListRequest>,
) -> Json<ListPage<WateringSummary>> {
    let filter = request.filter(ListEndpoint::Watering);
    Json(watering_page(state.commands.client(), &filter, &Local).await)
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Vec<SettingView>>, AppError> {
    let form = SettingsForm::load(state.commands.client()).await?;
    Ok(Json(setting_views(&form)))
}

/// Applies the submitted inputs on top of the server's current settings and PUTs the result
async fn put_settings(
    State(state): State<AppState>,
    Json(inputs): Json<HashMap<SettingField, String>>,
) -> Result<Json<Vec<SettingView>>, AppError> {
    let mut form = SettingsForm::load(state.commands.client()).await?;
    for (field, value) in inputs {
        form.set(field, value);
    }
    form.save(state.commands.client()).await?;
    Ok(Json(setting_views(&form)))
}

async fn capture(State(state): State<AppState>) -> Result<Json<Ack>, AppError> {
    Ok(Json(state.commands.dispatch(Command::Capture).await?))
}

async fn water(
    State(state): State<AppState>,
    body: Option<Json<DurationRequest>>,
) -> Result<Json<Ack>, AppError> {
    let duration = body
        .and_then(|Json(req)| req.duration)
        .unwrap_or(DEFAULT_WATER_SECS);
    Ok(Json(state.commands.dispatch(Command::Water { duration }).await?))
}

async fn chirp(
    State(state): State<AppState>,
    body: Option<Json<DurationRequest>>,
) -> Result<Json<Ack>, AppError> {
    let duration = body
        .and_then(|Json(req)| req.duration)
        .unwrap_or(DEFAULT_CHIRP_SECS);
    Ok(Json(state.commands.dispatch(Command::Chirp { duration }).await?))
}

async fn refresh(State(state): State<AppState>) -> StatusCode {
    let dashboard = Arc::clone(&state.dashboard);
    tokio::spawn(async move {
        dashboard.refresh().await;
    });
    StatusCode::ACCEPTED
}

async fn metrics_handler() -> Result<String, AppError> {
    Ok(metrics::gather_metrics()?)
}

fn setting_views(form: &SettingsForm) -> Vec<SettingView> {
    SettingField::ALL
        .iter()
        .map(|field| SettingView {
            field: *field,
            label: field.label(),
            description: field.description(),
            value: form.input(*field).to_string(),
        })
        .collect()
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        let status = match self.0.downcast_ref::<Error>() {
            Some(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(Error::Status { .. }) | Some(Error::Http(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("{}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
