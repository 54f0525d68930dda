//! Google Calendar tool: read-only access to upcoming events.
//!
//! Authenticates with a ready OAuth access token (`GOOGLE_CALENDAR_TOKEN`);
//! obtaining and refreshing that token is left to the operator.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Upcoming events on the primary calendar.
pub struct CalendarEvents {
    access_token: String,
}

impl CalendarEvents {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }
}

#[async_trait]
impl Tool for CalendarEvents {
    fn name(&self) -> &str {
        "get_calendar_events"
    }

    fn description(&self) -> &str {
        "Fetch upcoming events from the user's primary Google Calendar."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": {
                    "type": "integer",
                    "description": "Number of days ahead to look (default: 1 = today only)."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let days = args["days"].as_i64().unwrap_or(1).clamp(1, 366);
        let now = Utc::now();
        let end = now + chrono::Duration::days(days);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let response = client
            .get(EVENTS_URL)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", rfc3339(now)),
                ("timeMax", rfc3339(end)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Calendar error: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Calendar error: HTTP {}: {}", status, body));
        }

        let events: EventList = response.json().await?;
        Ok(format_events(&events.items, days))
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_events(events: &[Event], days: i64) -> String {
    if events.is_empty() {
        return format!("No events found in the next {} day(s).", days);
    }

    let mut lines = vec![format!("Events in the next {} day(s):\n", days)];
    for event in events {
        let mut line = format!(
            "• {}\n  {} → {}",
            event.summary.as_deref().unwrap_or("(No title)"),
            event.start.display(),
            event.end.display()
        );
        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            line.push_str(&format!("\n  Location: {}", location));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    summary: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
}

/// Timed events carry `dateTime`; all-day events only `date`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn display(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_with_optional_location() {
        let list: EventList = serde_json::from_value(json!({
            "items": [
                {
                    "summary": "Standup",
                    "start": {"dateTime": "2024-05-01T09:00:00Z"},
                    "end": {"dateTime": "2024-05-01T09:15:00Z"},
                    "location": "Room 4"
                },
                {
                    "start": {"date": "2024-05-02"},
                    "end": {"date": "2024-05-03"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(
            format_events(&list.items, 2),
            "Events in the next 2 day(s):\n\n\
             • Standup\n  2024-05-01T09:00:00Z → 2024-05-01T09:15:00Z\n  Location: Room 4\n\
             • (No title)\n  2024-05-02 → 2024-05-03"
        );
    }

    #[test]
    fn empty_calendar_has_friendly_message() {
        let list: EventList = serde_json::from_value(json!({})).unwrap();
        assert_eq!(format_events(&list.items, 1), "No events found in the next 1 day(s).");
    }

    #[test]
    fn time_bounds_are_rfc3339_utc() {
        let t = DateTime::parse_from_rfc3339("2024-05-01T09:00:00.123+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(rfc3339(t), "2024-05-01T09:00:00Z");
    }
}
