use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Attributes shared by every device event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    pub id: Uuid,

    /// Owning entity (site) the event belongs to
    pub site: String,

    /// Assignment that was active on the device when the event was produced
    pub assignment: String,

    /// Device that originated the event
    pub device: String,

    pub event_date: DateTime<Utc>,

    #[serde(default)]
    pub received_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(flatten)]
    pub header: EventHeader,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub header: EventHeader,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(flatten)]
    pub header: EventHeader,
    pub alert_type: String,
    pub level: AlertLevel,
    pub message: String,
    #[serde(default)]
    pub source: AlertSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "Info",
            AlertLevel::Warning => "Warning",
            AlertLevel::Error => "Error",
            AlertLevel::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    #[default]
    Device,
    System,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::Device => "Device",
            AlertSource::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Measurement,
    Location,
    Alert,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Measurement => "Measurement",
            EventType::Location => "Location",
            EventType::Alert => "Alert",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device event that passed upstream filtering and is ready for indexing.
///
/// Serialized as internally tagged JSON, e.g.
/// `{"type": "measurement", "id": "...", "name": "temp", "value": 21.5, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Measurement(Measurement),
    Location(Location),
    Alert(Alert),
}

impl Event {
    pub fn header(&self) -> &EventHeader {
        match self {
            Event::Measurement(m) => &m.header,
            Event::Location(l) => &l.header,
            Event::Alert(a) => &a.header,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Event::Measurement(_) => EventType::Measurement,
            Event::Location(_) => EventType::Location,
            Event::Alert(_) => EventType::Alert,
        }
    }

    pub fn id(&self) -> Uuid {
        self.header().id
    }
}

impl From<Measurement> for Event {
    fn from(value: Measurement) -> Self {
        Event::Measurement(value)
    }
}

impl From<Location> for Event {
    fn from(value: Location) -> Self {
        Event::Location(value)
    }
}

impl From<Alert> for Event {
    fn from(value: Alert) -> Self {
        Event::Alert(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> EventHeader {
        EventHeader {
            id: Uuid::new_v4(),
            site: "site-1".to_string(),
            assignment: "assign-1".to_string(),
            device: "device-1".to_string(),
            event_date: Utc.with_ymd_and_hms(2026, 1, 28, 10, 0, 0).unwrap(),
            received_date: None,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_event_type_follows_variant() {
        let event: Event = Alert {
            header: header(),
            alert_type: "engine.overheat".to_string(),
            level: AlertLevel::Critical,
            message: "too hot".to_string(),
            source: AlertSource::Device,
        }
        .into();

        assert_eq!(event.event_type(), EventType::Alert);
        assert_eq!(event.header().device, "device-1");
    }

    #[test]
    fn test_deserialize_tagged_measurement() {
        let json = r#"{
            "type": "measurement",
            "id": "7f1c4a52-2f7e-4a55-9a0c-3b1d3e1f0a11",
            "site": "plant-a",
            "assignment": "a-17",
            "device": "sensor-17",
            "event_date": "2026-01-28T10:00:00Z",
            "name": "temperature",
            "value": 21.5
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Measurement(m) => {
                assert_eq!(m.name, "temperature");
                assert_eq!(m.value, 21.5);
                assert_eq!(m.header.site, "plant-a");
                assert!(m.header.metadata.is_empty());
                assert!(m.header.received_date.is_none());
            }
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_alert_defaults_source() {
        let json = r#"{
            "type": "alert",
            "id": "7f1c4a52-2f7e-4a55-9a0c-3b1d3e1f0a12",
            "site": "plant-a",
            "assignment": "a-17",
            "device": "sensor-17",
            "event_date": "2026-01-28T10:00:00Z",
            "alert_type": "battery.low",
            "level": "warning",
            "message": "battery at 5%"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Alert(a) => {
                assert_eq!(a.level, AlertLevel::Warning);
                assert_eq!(a.source, AlertSource::Device);
            }
            other => panic!("expected alert, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type": "command", "id": "7f1c4a52-2f7e-4a55-9a0c-3b1d3e1f0a13"}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }
}
