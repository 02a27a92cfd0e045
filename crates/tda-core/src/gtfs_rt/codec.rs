use prost::Message;
use serde_json::Value;

use super::bindings::{FeedMessage, StopTimeUpdate, TripDescriptor};
use super::extensions::{Extension, ExtensionSet};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid protobuf: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("message is missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// Turns a raw feed body into a message and renders it for storage.
pub trait FeedParser: Send + Sync {
    /// Decode a `FeedMessage`.
    ///
    /// Strict parsing rejects messages missing schema-required fields; partial
    /// parsing accepts them.
    fn parse(&self, bytes: &[u8], partial: bool) -> Result<FeedMessage, ParseError>;

    /// Render a message as JSON, omitting absent fields.
    fn to_json(&self, message: &FeedMessage) -> serde_json::Result<Value>;
}

/// Parser and JSON renderer for one combination of enabled extensions.
#[derive(Debug, Clone)]
pub struct FeedCodec {
    extensions: ExtensionSet,
}

impl FeedCodec {
    pub fn new(extensions: ExtensionSet) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> ExtensionSet {
        self.extensions
    }

    /// Which schema `FeedHeader` field 1001 is read as; LMM wins when both are enabled.
    fn header_slot(&self) -> HeaderSlot {
        if self.extensions.contains(Extension::Lmm) {
            HeaderSlot::Mercury
        } else if self.extensions.contains(Extension::Nyct) {
            HeaderSlot::Nyct
        } else {
            HeaderSlot::Unused
        }
    }

    fn strip_disabled_extensions(&self, message: &mut FeedMessage) {
        let enabled = Enabled::from(self.extensions);

        if let Some(header) = message.header.as_mut() {
            if !enabled.oba {
                header.oba_feed_header = None;
            }
            if self.header_slot() == HeaderSlot::Unused {
                header.extension_1001 = None;
            }
        }

        for entity in &mut message.entity {
            if !enabled.oba {
                entity.oba_feed_entity = None;
            }
            if let Some(tu) = entity.trip_update.as_mut() {
                if !enabled.oba {
                    tu.oba_trip_update = None;
                }
                if !enabled.nyct {
                    clear_trip(tu.trip.as_mut());
                }
                for stu in &mut tu.stop_time_update {
                    clear_stop_time_update(stu, &enabled);
                }
            }
            if let Some(vp) = entity.vehicle.as_mut() {
                if !enabled.nyct {
                    clear_trip(vp.trip.as_mut());
                }
                if !enabled.crowding {
                    vp.crowding_descriptor = None;
                }
            }
            if let Some(alert) = entity.alert.as_mut() {
                if !enabled.lmm {
                    alert.mercury_alert = None;
                }
                for sel in &mut alert.informed_entity {
                    if !enabled.nyct {
                        clear_trip(sel.trip.as_mut());
                    }
                    if !enabled.lmm {
                        sel.mercury_entity_selector = None;
                    }
                }
            }
        }
    }

    fn missing_required_fields(&self, message: &FeedMessage) -> Result<Vec<String>, ParseError> {
        let mut missing = missing_required_fields(message);
        if let Some(header) = &message.header {
            match self.header_slot() {
                HeaderSlot::Nyct => {
                    if let Some(nyct) = header.nyct_feed_header()? {
                        if nyct.nyct_subway_version.is_none() {
                            missing.push("header.nyct_feed_header.nyct_subway_version".to_string());
                        }
                    }
                }
                HeaderSlot::Mercury => {
                    if let Some(mercury) = header.mercury_feed_header()? {
                        if mercury.mercury_version.is_none() {
                            missing.push("header.mercury_feed_header.mercury_version".to_string());
                        }
                    }
                }
                HeaderSlot::Unused => {}
            }
        }
        Ok(missing)
    }
}

impl FeedParser for FeedCodec {
    /// Extension fields not enabled for this codec are dropped after decoding.
    fn parse(&self, bytes: &[u8], partial: bool) -> Result<FeedMessage, ParseError> {
        let mut message = FeedMessage::decode(bytes)?;
        self.strip_disabled_extensions(&mut message);
        if !partial {
            let missing = self.missing_required_fields(&message)?;
            if !missing.is_empty() {
                return Err(ParseError::MissingRequired(missing));
            }
        } else if let Some(header) = &message.header {
            // The shared header slot must still decode under the chosen schema.
            match self.header_slot() {
                HeaderSlot::Nyct => {
                    let _ = header.nyct_feed_header()?;
                }
                HeaderSlot::Mercury => {
                    let _ = header.mercury_feed_header()?;
                }
                HeaderSlot::Unused => {}
            }
        }
        Ok(message)
    }

    fn to_json(&self, message: &FeedMessage) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(message)?;
        if let (Some(header), Some(Value::Object(rendered))) =
            (&message.header, value.get_mut("header"))
        {
            let slot = match self.header_slot() {
                HeaderSlot::Nyct => header
                    .nyct_feed_header()
                    .map_err(<serde_json::Error as serde::ser::Error>::custom)?
                    .map(|h| ("nyct_feed_header", serde_json::to_value(h))),
                HeaderSlot::Mercury => header
                    .mercury_feed_header()
                    .map_err(<serde_json::Error as serde::ser::Error>::custom)?
                    .map(|h| ("mercury_feed_header", serde_json::to_value(h))),
                HeaderSlot::Unused => None,
            };
            if let Some((name, ext)) = slot {
                rendered.insert(name.to_string(), ext?);
            }
        }
        prune_nulls(&mut value);
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderSlot {
    Nyct,
    Mercury,
    Unused,
}

/// Flattened view of an [`ExtensionSet`] for the strip pass.
struct Enabled {
    oba: bool,
    nyct: bool,
    railroad: bool,
    lmm: bool,
    crowding: bool,
}

impl From<ExtensionSet> for Enabled {
    fn from(set: ExtensionSet) -> Self {
        Self {
            oba: set.contains(Extension::Oba),
            nyct: set.contains(Extension::Nyct),
            railroad: set.contains_any(&[Extension::Lirr, Extension::Mnr, Extension::Mtarr]),
            lmm: set.contains(Extension::Lmm),
            crowding: set.contains(Extension::Crowding),
        }
    }
}

fn clear_trip(trip: Option<&mut TripDescriptor>) {
    if let Some(trip) = trip {
        trip.nyct_trip_descriptor = None;
    }
}

fn clear_stop_time_update(stu: &mut StopTimeUpdate, enabled: &Enabled) {
    if !enabled.nyct {
        stu.nyct_stop_time_update = None;
    }
    if !enabled.railroad {
        stu.mta_railroad_stop_time_update = None;
    }
}

fn missing_required_fields(message: &FeedMessage) -> Vec<String> {
    let mut missing = Vec::new();
    match &message.header {
        None => missing.push("header".to_string()),
        Some(h) => {
            if h.gtfs_realtime_version.is_none() {
                missing.push("header.gtfs_realtime_version".to_string());
            }
        }
    }

    for (i, entity) in message.entity.iter().enumerate() {
        if entity.id.is_none() {
            missing.push(format!("entity[{}].id", i));
        }
        if let Some(tu) = &entity.trip_update {
            if tu.trip.is_none() {
                missing.push(format!("entity[{}].trip_update.trip", i));
            }
        }
        if let Some(pos) = entity.vehicle.as_ref().and_then(|v| v.position.as_ref()) {
            if pos.latitude.is_none() || pos.longitude.is_none() {
                missing.push(format!("entity[{}].vehicle.position", i));
            }
        }
        if let Some(alert) = &entity.alert {
            let texts = [&alert.url, &alert.header_text, &alert.description_text];
            let untexted = texts
                .into_iter()
                .flatten()
                .flat_map(|ts| ts.translation.iter())
                .any(|t| t.text.is_none());
            if untexted {
                missing.push(format!("entity[{}].alert.translation.text", i));
            }
            if let Some(m) = &alert.mercury_alert {
                if m.created_at.is_none() || m.updated_at.is_none() || m.alert_type.is_none() {
                    missing.push(format!("entity[{}].alert.mercury_alert", i));
                }
            }
            for (j, sel) in alert.informed_entity.iter().enumerate() {
                if sel
                    .mercury_entity_selector
                    .as_ref()
                    .is_some_and(|m| m.sort_order.is_none())
                {
                    missing.push(format!(
                        "entity[{}].alert.informed_entity[{}].mercury_entity_selector.sort_order",
                        i, j
                    ));
                }
            }
        }
    }
    missing
}

fn prune_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(prune_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(prune_nulls),
        _ => {}
    }
}
