//! Events that trigger a notification run.

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use utoipa::ToSchema;

/// Someone the person raising an alert wants informed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// An emergency raised from the app.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlertEvent {
    /// Client-side identifier, echoed back untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub id: Option<serde_json::Value>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    /// Numbers or numeric strings. Anything else is dropped rather than
    /// rejecting the alert.
    #[serde(default, deserialize_with = "lenient_coordinate")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<f64>,
    pub maps_link: Option<String>,
    /// RFC 3339 timestamp set by the client. Epoch milliseconds are accepted
    /// and converted to RFC 3339 (UTC).
    #[serde(default, deserialize_with = "lenient_time")]
    #[schema(value_type = Option<String>)]
    pub time: Option<String>,
    /// URL (or data URI) of a photo of the person.
    pub photo: Option<String>,
    pub emergency_contacts: Option<Vec<Contact>>,
}

impl AlertEvent {
    pub fn contacts(&self) -> &[Contact] {
        self.emergency_contacts.as_deref().unwrap_or_default()
    }

    /// The name of the person needing help, trimmed. Empty if missing.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().map(str::trim).unwrap_or_default()
    }
}

fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let coordinate = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(coordinate.filter(|c| c.is_finite()))
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(epoch_millis_to_rfc3339),
        _ => None,
    })
}

fn epoch_millis_to_rfc3339(millis: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// An admin-initiated message to an explicit list of addresses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub title: String,
    pub body: String,
    pub admin_email: String,
    pub explicit_recipients: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Alert(AlertEvent),
    Broadcast(BroadcastEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Alert(_) => "alert",
            Event::Broadcast(_) => "broadcast",
        }
    }

    /// Rejects events that lack the fields identifying them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Event::Alert(alert) => {
                if alert.display_name().is_empty() {
                    return Err(ValidationError("Alert is missing a name".into()));
                }
            }
            Event::Broadcast(broadcast) => {
                if broadcast.title.trim().is_empty() || broadcast.body.trim().is_empty() {
                    return Err(ValidationError("Missing title, body, or email list".into()));
                }
                if broadcast.admin_email.trim().is_empty() {
                    return Err(ValidationError("Missing adminEmail".into()));
                }
            }
        }
        Ok(())
    }

    /// Addresses carried by the event itself: contact emails for alerts, the
    /// explicit list for broadcasts. Blank entries are skipped.
    pub fn inline_addresses(&self) -> Vec<&str> {
        let addresses: Vec<&str> = match self {
            Event::Alert(alert) => alert
                .contacts()
                .iter()
                .filter_map(|c| c.email.as_deref())
                .collect(),
            Event::Broadcast(broadcast) => broadcast
                .explicit_recipients
                .iter()
                .map(String::as_str)
                .collect(),
        };
        addresses
            .into_iter()
            .filter(|a| !a.trim().is_empty())
            .collect()
    }
}
