use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{DailyCheckin, FromSqliteRow, ReadinessAverage, SaveCheckin};
use crate::readiness;

pub const DEFAULT_HISTORY_LIMIT: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct CheckinRepository {
    pool: DbPool,
}

impl CheckinRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_date(
        &self,
        tenant_id: &str,
        client_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyCheckin>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM daily_checkins
                 WHERE client_id = ? AND tenant_id = ? AND checkin_date = ?",
            )?;
            let result = stmt
                .query_row(
                    rusqlite::params![client_id, tenant_id, date],
                    DailyCheckin::from_row,
                )
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Check-ins newest first, optionally bounded by date.
    pub async fn history(
        &self,
        tenant_id: &str,
        client_id: &str,
        filter: HistoryFilter,
    ) -> Result<Vec<DailyCheckin>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;

            let mut sql = String::from(
                "SELECT * FROM daily_checkins WHERE client_id = ? AND tenant_id = ?",
            );
            let mut params: Vec<Box<dyn rusqlite::ToSql>> =
                vec![Box::new(client_id), Box::new(tenant_id)];

            if let Some(start) = filter.start_date {
                sql.push_str(" AND checkin_date >= ?");
                params.push(Box::new(start));
            }
            if let Some(end) = filter.end_date {
                sql.push_str(" AND checkin_date <= ?");
                params.push(Box::new(end));
            }

            sql.push_str(" ORDER BY checkin_date DESC LIMIT ?");
            params.push(Box::new(filter.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)));

            let mut stmt = conn.prepare(&sql)?;
            let checkins = stmt
                .query_map(
                    rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                    DailyCheckin::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(checkins)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Create or replace the check-in for `date`, recomputing the readiness
    /// score from the submitted answers.
    pub async fn save(
        &self,
        tenant_id: &str,
        client_id: &str,
        date: NaiveDate,
        form: &SaveCheckin,
    ) -> Result<DailyCheckin> {
        let score = readiness::calculate_score(&form.readiness_input());
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        let form = form.clone();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO daily_checkins
                    (id, tenant_id, client_id, checkin_date, sleep_quality, sleep_hours,
                     energy_level, stress_level, soreness_level, motivation_level,
                     readiness_score, mood, notes, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (tenant_id, client_id, checkin_date) DO UPDATE SET
                    sleep_quality = excluded.sleep_quality,
                    sleep_hours = excluded.sleep_hours,
                    energy_level = excluded.energy_level,
                    stress_level = excluded.stress_level,
                    soreness_level = excluded.soreness_level,
                    motivation_level = excluded.motivation_level,
                    readiness_score = excluded.readiness_score,
                    mood = excluded.mood,
                    notes = excluded.notes,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    id,
                    tenant_id,
                    client_id,
                    date,
                    form.sleep_quality,
                    form.sleep_hours,
                    form.energy_level,
                    form.stress_level,
                    form.muscle_soreness,
                    form.motivation,
                    score,
                    form.mood,
                    form.notes,
                    now,
                    now
                ],
            )?;

            let checkin = conn.query_row(
                "SELECT * FROM daily_checkins
                 WHERE client_id = ? AND tenant_id = ? AND checkin_date = ?",
                rusqlite::params![client_id, tenant_id, date],
                DailyCheckin::from_row,
            )?;
            Ok(checkin)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Averages over check-ins dated on or after `since`.
    pub async fn average_since(
        &self,
        tenant_id: &str,
        client_id: &str,
        since: NaiveDate,
    ) -> Result<ReadinessAverage> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let average = conn.query_row(
                "SELECT AVG(readiness_score), AVG(sleep_quality), AVG(energy_level), AVG(stress_level)
                 FROM daily_checkins
                 WHERE client_id = ? AND tenant_id = ? AND checkin_date >= ?",
                rusqlite::params![client_id, tenant_id, since],
                |row| {
                    Ok(ReadinessAverage {
                        avg_readiness: row.get(0)?,
                        avg_sleep: row.get(1)?,
                        avg_energy: row.get(2)?,
                        avg_stress: row.get(3)?,
                    })
                },
            )?;
            Ok(average)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Most recent scores, newest first.
    pub async fn recent_scores(
        &self,
        tenant_id: &str,
        client_id: &str,
        limit: i64,
    ) -> Result<Vec<f64>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT readiness_score FROM daily_checkins
                 WHERE client_id = ? AND tenant_id = ?
                 ORDER BY checkin_date DESC LIMIT ?",
            )?;
            let scores = stmt
                .query_map(rusqlite::params![client_id, tenant_id, limit], |row| {
                    row.get(0)
                })?
                .collect::<rusqlite::Result<Vec<f64>>>()?;
            Ok(scores)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
