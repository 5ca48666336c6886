use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::alert::LOW_READINESS_ALERT;
use crate::models::{Client, CreateAlert, SaveCheckin};
use crate::readiness::{low_readiness_average, LOW_READINESS_WINDOW};
use crate::repositories::checkin_repo::{HistoryFilter, DEFAULT_HISTORY_LIMIT};
use crate::repositories::{AlertRepository, CheckinRepository, ClientRepository};

pub const DEFAULT_AVERAGE_DAYS: i64 = 7;

#[derive(Clone)]
pub struct ReadinessState {
    pub client_repo: ClientRepository,
    pub checkin_repo: CheckinRepository,
    pub alert_repo: AlertRepository,
}

impl ReadinessState {
    /// Resolve a client the caller may see. Staff see every client of their
    /// tenant; a client user only their own record.
    async fn authorized_client(&self, user: &AuthUser, client_id: &str) -> Result<Client> {
        let client = self
            .client_repo
            .find_in_tenant(&user.tenant_id, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

        if !user.role.is_staff() && client.user_id.as_deref() != Some(user.id.as_str()) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(client)
    }

    /// Raise a low-readiness alert when the mean of the latest check-ins
    /// falls under the threshold. Returns whether an alert was created.
    pub async fn check_alerts(&self, tenant_id: &str, client_id: &str) -> Result<bool> {
        let recent = self
            .checkin_repo
            .recent_scores(tenant_id, client_id, LOW_READINESS_WINDOW as i64)
            .await?;

        let Some(average) = low_readiness_average(&recent) else {
            return Ok(false);
        };

        tracing::info!(client_id, average, "Low readiness detected");
        self.alert_repo
            .create(
                tenant_id,
                client_id,
                CreateAlert {
                    alert_type: LOW_READINESS_ALERT.to_string(),
                    severity: "warning".to_string(),
                    title: "Low readiness".to_string(),
                    message: "The client has shown a low readiness score over the last 3 days. Consider a deload."
                        .to_string(),
                    data: Some(json!({ "avgReadiness": average })),
                },
            )
            .await?;
        Ok(true)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AverageQuery {
    pub days: Option<i64>,
}

pub async fn today(
    State(state): State<ReadinessState>,
    user: AuthUser,
    Path(client_id): Path<String>,
) -> Result<Json<Value>> {
    let client = state.authorized_client(&user, &client_id).await?;
    let today = Utc::now().date_naive();

    let checkin = state
        .checkin_repo
        .find_by_date(&user.tenant_id, &client.id, today)
        .await?;

    Ok(Json(json!({ "success": true, "data": { "checkin": checkin } })))
}

pub async fn history(
    State(state): State<ReadinessState>,
    user: AuthUser,
    Path(client_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    let client = state.authorized_client(&user, &client_id).await?;

    let filter = HistoryFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        limit: Some(
            query
                .limit
                .filter(|l| *l > 0)
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
        ),
    };
    let checkins = state
        .checkin_repo
        .history(&user.tenant_id, &client.id, filter)
        .await?;

    Ok(Json(json!({ "success": true, "data": { "checkins": checkins } })))
}

pub async fn average(
    State(state): State<ReadinessState>,
    user: AuthUser,
    Path(client_id): Path<String>,
    Query(query): Query<AverageQuery>,
) -> Result<Json<Value>> {
    let client = state.authorized_client(&user, &client_id).await?;

    let days = query
        .days
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_AVERAGE_DAYS);
    let since = Utc::now().date_naive() - Duration::days(days);

    let average = state
        .checkin_repo
        .average_since(&user.tenant_id, &client.id, since)
        .await?;

    Ok(Json(json!({ "success": true, "data": { "average": average } })))
}

pub async fn save(
    State(state): State<ReadinessState>,
    user: AuthUser,
    Path(client_id): Path<String>,
    payload: std::result::Result<Json<SaveCheckin>, JsonRejection>,
) -> Result<Json<Value>> {
    let client = state.authorized_client(&user, &client_id).await?;

    // Malformed bodies answer in the usual error envelope instead of axum's 422.
    let Json(form) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    form.validate().map_err(AppError::Validation)?;

    let date = form.checkin_date.unwrap_or_else(|| Utc::now().date_naive());
    let checkin = state
        .checkin_repo
        .save(&user.tenant_id, &client.id, date, &form)
        .await?;

    let alert_raised = state.check_alerts(&user.tenant_id, &client.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Check-in saved",
        "data": { "checkin": checkin, "alertRaised": alert_raised }
    })))
}
