/// JSON shapes exchanged with the web client
///
/// The client speaks camelCase, calls a task's id `_id` and sometimes sends
/// `completed` as the string `"Yes"`/`"No"`. Those quirks are decoded here so
/// the services only ever see typed values.

use axum::extract::FromRequest;
use chrono::{DateTime, NaiveDate, Utc};
use rtask_shared::models::task::{Task, TaskPriority, TaskStatus};
use rtask_shared::models::user::User;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// `axum::Json` whose rejections render as the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Task as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskBody {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            completed: task.completed,
            due_date: task.due_date,
            owner: task.owner_id,
            created_at: task.created_at,
        }
    }
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar_path,
        }
    }
}

/// Decodes a client completion flag
///
/// `true` and `"Yes"` mean done; any other supplied value means not done.
/// Absent or `null` stays `None`.
pub fn deserialize_completed<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::String(s)) => Some(s.trim() == "Yes"),
        Some(_) => Some(false),
    })
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Decodes an optional due date for updates
///
/// Use with `#[serde(default)]`: an absent field stays `None` (unchanged),
/// while `null` or `""` becomes `Some(None)` (cleared).
pub fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(Some(None)),
        Some(s) if s.trim().is_empty() => Ok(Some(None)),
        Some(s) => parse_due_date(&s)
            .map(|d| Some(Some(d)))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid dueDate: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[serde(default, deserialize_with = "deserialize_completed")]
        completed: Option<bool>,

        #[serde(default, deserialize_with = "deserialize_due_date")]
        due_date: Option<Option<DateTime<Utc>>>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_completed_decoding() {
        assert_eq!(probe(r#"{"completed": "Yes"}"#).completed, Some(true));
        assert_eq!(probe(r#"{"completed": true}"#).completed, Some(true));
        assert_eq!(probe(r#"{"completed": "No"}"#).completed, Some(false));
        assert_eq!(probe(r#"{"completed": false}"#).completed, Some(false));
        assert_eq!(probe(r#"{"completed": "yes please"}"#).completed, Some(false));
        assert_eq!(probe(r#"{"completed": 1}"#).completed, Some(false));
        assert_eq!(probe(r#"{"completed": null}"#).completed, None);
        assert_eq!(probe("{}").completed, None);
    }

    #[test]
    fn test_due_date_decoding() {
        assert_eq!(probe("{}").due_date, None);
        assert_eq!(probe(r#"{"dueDate": null}"#).due_date, Some(None));
        assert_eq!(probe(r#"{"dueDate": ""}"#).due_date, Some(None));

        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(probe(r#"{"dueDate": "2025-03-01"}"#).due_date, Some(Some(midnight)));

        let offset = Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(
            probe(r#"{"dueDate": "2025-03-01T12:30:00+02:00"}"#).due_date,
            Some(Some(offset))
        );
    }

    #[test]
    fn test_invalid_due_date_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"dueDate": "next tuesday"}"#).is_err());
    }

    #[test]
    fn test_task_body_shape() {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Write report".to_string(),
            description: String::new(),
            priority: TaskPriority::High,
            status: TaskStatus::InProgress,
            completed: false,
            due_date: None,
            created_at: now,
        };

        let json = serde_json::to_value(TaskBody::from(task.clone())).unwrap();
        assert_eq!(json["_id"], task.id.to_string());
        assert_eq!(json["owner"], task.owner_id.to_string());
        assert_eq!(json["priority"], "High");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert!(json["dueDate"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
