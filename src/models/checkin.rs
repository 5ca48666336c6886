use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;
use crate::readiness::ReadinessInput;

pub const MAX_NOTES_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCheckin {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub checkin_date: NaiveDate,
    pub sleep_quality: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub soreness_level: Option<i32>,
    pub motivation_level: Option<i32>,
    pub readiness_score: f64,
    pub mood: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromSqliteRow for DailyCheckin {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            checkin_date: row.get("checkin_date")?,
            sleep_quality: row.get("sleep_quality")?,
            sleep_hours: row.get("sleep_hours")?,
            energy_level: row.get("energy_level")?,
            stress_level: row.get("stress_level")?,
            soreness_level: row.get("soreness_level")?,
            motivation_level: row.get("motivation_level")?,
            readiness_score: row.get("readiness_score")?,
            mood: row.get("mood")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Body of a daily check-in submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCheckin {
    pub checkin_date: Option<NaiveDate>,
    pub sleep_quality: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub muscle_soreness: Option<i32>,
    pub motivation: Option<i32>,
    pub mood: Option<i32>,
    pub notes: Option<String>,
}

impl SaveCheckin {
    /// Validate the scored answers, then mood and notes.
    pub fn validate(&self) -> Result<(), String> {
        self.readiness_input().validate()?;

        if let Some(mood) = self.mood {
            if !(1..=5).contains(&mood) {
                return Err("mood must be between 1 and 5".to_string());
            }
        }

        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_CHARS {
                return Err(format!(
                    "notes must be at most {} characters",
                    MAX_NOTES_CHARS
                ));
            }
        }

        Ok(())
    }

    pub fn readiness_input(&self) -> ReadinessInput {
        ReadinessInput {
            sleep_quality: self.sleep_quality,
            sleep_hours: self.sleep_hours,
            energy_level: self.energy_level,
            stress_level: self.stress_level,
            muscle_soreness: self.muscle_soreness,
            motivation: self.motivation,
        }
    }
}

/// Period averages; every field is `None` when there are no check-ins.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReadinessAverage {
    pub avg_readiness: Option<f64>,
    pub avg_sleep: Option<f64>,
    pub avg_energy: Option<f64>,
    pub avg_stress: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_checkin_deserializes_camel_case() {
        let body = r#"{
            "checkinDate": "2024-03-01",
            "sleepQuality": 4,
            "sleepHours": 7.5,
            "energyLevel": 3,
            "stressLevel": 2,
            "muscleSoreness": 1,
            "motivation": 5,
            "mood": 4
        }"#;
        let form: SaveCheckin = serde_json::from_str(body).unwrap();
        assert_eq!(
            form.checkin_date,
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(form.muscle_soreness, Some(1));
        assert_eq!(form.sleep_hours, Some(7.5));
        assert_eq!(form.mood, Some(4));
        assert!(form.notes.is_none());

        let input = form.readiness_input();
        assert_eq!(input.muscle_soreness, Some(1));
        assert_eq!(input.motivation, Some(5));
    }

    #[test]
    fn test_validate_mood_and_notes() {
        let mut form = SaveCheckin {
            mood: Some(5),
            notes: Some("x".repeat(MAX_NOTES_CHARS)),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        form.mood = Some(0);
        assert_eq!(form.validate().unwrap_err(), "mood must be between 1 and 5");

        form.mood = None;
        form.notes = Some("é".repeat(MAX_NOTES_CHARS + 1));
        assert_eq!(
            form.validate().unwrap_err(),
            "notes must be at most 1000 characters"
        );

        form.notes = None;
        form.energy_level = Some(9);
        assert!(form.validate().is_err());
    }
}
