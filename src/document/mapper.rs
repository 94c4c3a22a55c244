use super::Document;
use crate::event::{Alert, Event, EventHeader, Location, Measurement};

/// Converts an event into an index-ready document.
///
/// Implementations must be pure: the same event always maps to the same
/// document, and mapping never blocks.
pub trait DocumentMapper: Send + Sync {
    fn map(&self, event: &Event) -> Document;
}

/// Field names used by [`SolrDocumentMapper`]
pub mod fields {
    pub const ID: &str = "id";
    pub const EVENT_TYPE: &str = "eventType";
    pub const SITE: &str = "site";
    pub const ASSIGNMENT: &str = "assignment";
    pub const DEVICE: &str = "device";
    pub const EVENT_DATE: &str = "eventDate";
    pub const RECEIVED_DATE: &str = "receivedDate";
    pub const LOCATION: &str = "location";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ELEVATION: &str = "elevation";
    pub const ALERT_TYPE: &str = "alertType";
    pub const ALERT_LEVEL: &str = "alertLevel";
    pub const ALERT_SOURCE: &str = "alertSource";
    pub const ALERT_MESSAGE: &str = "message";

    /// Measurements are stored as dynamic fields, `mx_<name>`
    pub const MEASUREMENT_PREFIX: &str = "mx_";
    /// Event metadata is stored as dynamic fields, `meta_<key>`
    pub const METADATA_PREFIX: &str = "meta_";
}

/// Maps events onto the Solr schema used for device event analytics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolrDocumentMapper;

impl SolrDocumentMapper {
    fn add_header(doc: &mut Document, event: &Event, header: &EventHeader) {
        doc.insert(fields::ID, header.id.to_string());
        doc.insert(fields::EVENT_TYPE, event.event_type().as_str());
        doc.insert(fields::SITE, header.site.as_str());
        doc.insert(fields::ASSIGNMENT, header.assignment.as_str());
        doc.insert(fields::DEVICE, header.device.as_str());
        doc.insert(fields::EVENT_DATE, header.event_date);
        if let Some(received) = header.received_date {
            doc.insert(fields::RECEIVED_DATE, received);
        }
    }

    fn add_metadata(doc: &mut Document, header: &EventHeader) {
        for (key, value) in &header.metadata {
            doc.insert(format!("{}{}", fields::METADATA_PREFIX, key), value.as_str());
        }
    }

    fn add_measurement(doc: &mut Document, m: &Measurement) {
        doc.insert(format!("{}{}", fields::MEASUREMENT_PREFIX, m.name), m.value);
    }

    fn add_location(doc: &mut Document, l: &Location) {
        // LatLonPointSpatialField expects "lat,lon"
        doc.insert(fields::LOCATION, format!("{},{}", l.latitude, l.longitude));
        doc.insert(fields::LATITUDE, l.latitude);
        doc.insert(fields::LONGITUDE, l.longitude);
        if let Some(elevation) = l.elevation {
            doc.insert(fields::ELEVATION, elevation);
        }
    }

    fn add_alert(doc: &mut Document, a: &Alert) {
        doc.insert(fields::ALERT_TYPE, a.alert_type.as_str());
        doc.insert(fields::ALERT_LEVEL, a.level.as_str());
        doc.insert(fields::ALERT_SOURCE, a.source.as_str());
        doc.insert(fields::ALERT_MESSAGE, a.message.as_str());
    }
}

impl DocumentMapper for SolrDocumentMapper {
    fn map(&self, event: &Event) -> Document {
        let mut doc = Document::new();
        Self::add_header(&mut doc, event, event.header());

        match event {
            Event::Measurement(m) => Self::add_measurement(&mut doc, m),
            Event::Location(l) => Self::add_location(&mut doc, l),
            Event::Alert(a) => Self::add_alert(&mut doc, a),
        }

        Self::add_metadata(&mut doc, event.header());
        doc
    }
}
