//! Google Calendar client for the visible month, and its refresh task.
//!
//! The task refetches on its own cadence and whenever the UI asks for a
//! month (navigation, the Refresh button, the Sunday snap). Results are
//! published as [`CalendarSnapshot`]s over a watch channel, newest wins.

use std::time::Duration;

use glance_ui::EventMarker;
use log::{debug, warn};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::auth::{AuthError, Session};
use crate::clock::Clock;
use crate::config::CalendarConfig;

/// Background refetch cadence for the last requested month.
pub const CALENDAR_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar request failed")]
    Http(#[from] reqwest::Error),

    #[error("calendar provider answered {status}")]
    Status { status: reqwest::StatusCode },

    /// An event start that is neither RFC 3339 nor a plain date.
    #[error("unreadable event start {raw:?}")]
    BadStart {
        raw: String,
        #[source]
        source: time::error::Parse,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// The UI's "show me this month" message to the fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub year: i32,
    pub month: u8,
}

/// One event placed in the fetched month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub day: u8,
    /// Start as minutes past midnight, local to the event; `None` for
    /// all-day events.
    pub minutes: Option<u16>,
    pub summary: String,
}

/// Everything fetched for one month. The default snapshot covers no
/// real month, so a fresh UI renders bare day numbers until the first
/// fetch lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarSnapshot {
    pub year: i32,
    pub month: u8,
    pub events: Vec<CalendarEvent>,
}

impl CalendarSnapshot {
    /// Does this snapshot describe the given month?
    pub fn covers(&self, year: i32, month: u8) -> bool {
        self.year == year && self.month == month
    }

    /// Borrowed markers for `glance_ui::fill_cells`.
    pub fn markers(&self) -> Vec<EventMarker<'_>> {
        self.events
            .iter()
            .map(|event| EventMarker {
                day: event.day,
                minutes: event.minutes,
                summary: &event.summary,
            })
            .collect()
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, serde::Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: String,
    start: Option<EventStart>,
}

#[derive(Debug, serde::Deserialize)]
struct EventStart {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

/// Sorts fetched items into events on the requested month. The fetch
/// window is open ended past the month (`timeMin` only), so items that
/// land in a later month are dropped here.
fn snapshot_from(items: Vec<EventItem>, year: i32, month: u8) -> Result<CalendarSnapshot, CalendarError> {
    let date_only = time::macros::format_description!("[year]-[month]-[day]");
    let mut events = Vec::new();
    for item in items {
        let Some(start) = item.start else {
            continue;
        };
        let (date, minutes) = if let Some(raw) = start.date_time.as_deref() {
            let start = OffsetDateTime::parse(raw, &Rfc3339).map_err(|source| CalendarError::BadStart {
                raw: raw.to_string(),
                source,
            })?;
            // Wall time in the event's own zone, not converted.
            (start.date(), Some(start.hour() as u16 * 60 + start.minute() as u16))
        } else if let Some(raw) = start.date.as_deref() {
            let date = Date::parse(raw, &date_only).map_err(|source| CalendarError::BadStart {
                raw: raw.to_string(),
                source,
            })?;
            (date, None)
        } else {
            continue;
        };
        if date.year() != year || u8::from(date.month()) != month {
            continue;
        }
        events.push(CalendarEvent {
            day: date.day(),
            minutes,
            summary: item.summary,
        });
    }
    Ok(CalendarSnapshot { year, month, events })
}

pub struct CalendarClient {
    http: reqwest::Client,
    config: CalendarConfig,
}

impl CalendarClient {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Events for one month. The session is revalidated (and the token
    /// refreshed when close to expiry) on every call.
    pub async fn fetch_month(&self, year: i32, month: u8) -> Result<CalendarSnapshot, CalendarError> {
        let session = Session::load_valid(&self.config).await?;
        let url = format!("{CALENDAR_API}/calendars/{}/events", self.config.calendar_id);
        let time_min = format!("{year:04}-{month:02}-01T00:00:00Z");
        let response = self
            .http
            .get(&url)
            .bearer_auth(session.access_token())
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", "31"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CalendarError::Status {
                status: response.status(),
            });
        }
        let list: EventList = response.json().await?;
        snapshot_from(list.items, year, month)
    }
}

/// Fetches the channel's latest request immediately, then again every
/// [`CALENDAR_REFRESH`], plus whenever the UI replaces it. On failure
/// the previous snapshot stays published.
pub async fn calendar_task(
    client: CalendarClient,
    clock: Clock,
    snapshots: watch::Sender<CalendarSnapshot>,
    mut requests: watch::Receiver<FetchRequest>,
) {
    let mut interval = tokio::time::interval(CALENDAR_REFRESH);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = requests.changed() => {
                // UI side dropped the sender, we are shutting down.
                if changed.is_err() {
                    return;
                }
            }
        }
        // A fast swipe burst collapses in the channel; the read always
        // sees the last visible month.
        let target = *requests.borrow_and_update();
        match client.fetch_month(target.year, target.month).await {
            Ok(snapshot) => {
                debug!(
                    "calendar: {} events for {:04}-{:02}",
                    snapshot.events.len(),
                    target.year,
                    target.month
                );
                snapshots.send_replace(snapshot);
            }
            Err(err) => warn!("{} could not gather calendar data: {err}", clock.stamp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"{
        "kind": "calendar#events",
        "items": [
            {"summary": "Standup", "start": {"dateTime": "2026-08-05T09:30:00-05:00"}},
            {"summary": "Flight home", "start": {"dateTime": "2026-08-21T16:05:00Z"}},
            {"summary": "Street fest", "start": {"date": "2026-08-12"}},
            {"summary": "Next month", "start": {"dateTime": "2026-09-02T10:00:00-05:00"}},
            {"summary": "No start"}
        ]
    }"#;

    #[test]
    fn snapshot_keeps_wall_times_and_drops_strays() {
        let list: EventList = serde_json::from_str(LIST).unwrap();
        let snapshot = snapshot_from(list.items, 2026, 8).unwrap();
        assert!(snapshot.covers(2026, 8));
        assert_eq!(snapshot.events.len(), 3);

        assert_eq!(snapshot.events[0].day, 5);
        assert_eq!(snapshot.events[0].minutes, Some(9 * 60 + 30));
        assert_eq!(snapshot.events[0].summary, "Standup");

        assert_eq!(snapshot.events[1].day, 21);
        assert_eq!(snapshot.events[1].minutes, Some(16 * 60 + 5));

        assert_eq!(snapshot.events[2].day, 12);
        assert_eq!(snapshot.events[2].minutes, None);
    }

    #[test]
    fn year_filter_keeps_decembers_apart() {
        let list: EventList = serde_json::from_str(
            r#"{"items": [
                {"summary": "This year", "start": {"date": "2026-12-24"}},
                {"summary": "Next year", "start": {"date": "2027-12-24"}}
            ]}"#,
        )
        .unwrap();
        let snapshot = snapshot_from(list.items, 2026, 12).unwrap();
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.events[0].summary, "This year");
    }

    #[test]
    fn malformed_start_fails_the_fetch() {
        let list: EventList = serde_json::from_str(
            r#"{"items": [{"summary": "Bad", "start": {"dateTime": "yesterday-ish"}}]}"#,
        )
        .unwrap();
        match snapshot_from(list.items, 2026, 8) {
            Err(CalendarError::BadStart { raw, .. }) => assert_eq!(raw, "yesterday-ish"),
            other => panic!("expected BadStart, got {other:?}"),
        }
    }

    #[test]
    fn markers_borrow_the_snapshot() {
        let snapshot = CalendarSnapshot {
            year: 2026,
            month: 8,
            events: vec![CalendarEvent {
                day: 5,
                minutes: Some(570),
                summary: "Standup".into(),
            }],
        };
        let markers = snapshot.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].day, 5);
        assert_eq!(markers[0].minutes, Some(570));
        assert_eq!(markers[0].summary, "Standup");
    }

    #[test]
    fn default_snapshot_covers_no_month() {
        let snapshot = CalendarSnapshot::default();
        assert!(!snapshot.covers(2026, 8));
        assert!(snapshot.markers().is_empty());
    }
}
