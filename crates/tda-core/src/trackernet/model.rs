//! Trackernet prediction documents.
//!
//! Fields deserialize from the API's terse XML attribute names and serialize
//! to JSON under descriptive snake_case names. Attributes the API omits are
//! left as `None`; unknown attributes and elements are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `PredictionSummary/{line}`: every station on a line with its platforms and approaching trains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionSummary {
    #[serde(rename(deserialize = "Time"), default)]
    pub time: Option<SummaryTime>,
    #[serde(rename(deserialize = "S"), default)]
    pub stations: Vec<SummaryStation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SummaryTime {
    #[serde(rename(deserialize = "@TimeStamp"), default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SummaryStation {
    #[serde(rename(deserialize = "@Code"))]
    pub code: String,
    #[serde(rename(deserialize = "@N"), default)]
    pub name: Option<String>,
    #[serde(rename(deserialize = "P"), default)]
    pub platforms: Vec<SummaryPlatform>,
}

impl SummaryStation {
    /// At least one platform has a train approaching.
    pub fn has_trains(&self) -> bool {
        self.platforms.iter().any(|p| !p.trains.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SummaryPlatform {
    #[serde(rename(deserialize = "@N"), default)]
    pub name: Option<String>,
    #[serde(rename(deserialize = "@Code"), default)]
    pub code: Option<String>,
    #[serde(rename(deserialize = "@Next"), default)]
    pub next: Option<String>,
    #[serde(rename(deserialize = "T"), default)]
    pub trains: Vec<SummaryTrain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SummaryTrain {
    #[serde(rename(deserialize = "@S"), default)]
    pub set_number: Option<String>,
    #[serde(rename(deserialize = "@T"), default)]
    pub trip_number: Option<String>,
    #[serde(rename(deserialize = "@D"), default)]
    pub destination_code: Option<String>,
    #[serde(rename(deserialize = "@C"), default)]
    pub time_to_station: Option<String>,
    #[serde(rename(deserialize = "@L"), default)]
    pub location: Option<String>,
    #[serde(rename(deserialize = "@DE"), default)]
    pub destination: Option<String>,
}

/// `PredictionDetailed/{line}/{station}`: one station's platforms with full train detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionDetail {
    #[serde(rename(deserialize = "WhenCreated"), default)]
    pub when_created: Option<String>,
    #[serde(rename(deserialize = "Line"), default)]
    pub line: String,
    #[serde(rename(deserialize = "LineName"), default)]
    pub line_name: Option<String>,
    #[serde(rename(deserialize = "S"), default)]
    pub station: DetailStation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetailStation {
    #[serde(rename(deserialize = "@Code"), default)]
    pub station_code: String,
    #[serde(rename(deserialize = "@Mess"), default)]
    pub message: Option<String>,
    #[serde(rename(deserialize = "@N"), default)]
    pub name: Option<String>,
    #[serde(rename(deserialize = "@CurTime"), default)]
    pub current_time: Option<String>,
    #[serde(rename(deserialize = "P"), default)]
    pub platforms: Vec<DetailPlatform>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetailPlatform {
    #[serde(rename(deserialize = "@N"), default)]
    pub name: Option<String>,
    #[serde(rename(deserialize = "@Num"), default)]
    pub number: Option<String>,
    #[serde(rename(deserialize = "@TrackCode"), default)]
    pub track_code: Option<String>,
    #[serde(rename(deserialize = "@NextTrain"), default)]
    pub next_train: Option<String>,
    #[serde(rename(deserialize = "T"), default)]
    pub trains: Vec<DetailTrain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetailTrain {
    #[serde(rename(deserialize = "@LCID"), default)]
    pub lcid: Option<String>,
    #[serde(rename(deserialize = "@SetNo"), default)]
    pub set_number: Option<String>,
    #[serde(rename(deserialize = "@TripNo"), default)]
    pub trip_number: Option<String>,
    #[serde(rename(deserialize = "@SecondsTo"), default)]
    pub seconds_to: Option<String>,
    #[serde(rename(deserialize = "@TimeTo"), default)]
    pub time_to: Option<String>,
    #[serde(rename(deserialize = "@Location"), default)]
    pub location: Option<String>,
    #[serde(rename(deserialize = "@Destination"), default)]
    pub destination: Option<String>,
    #[serde(rename(deserialize = "@DestCode"), default)]
    pub destination_code: Option<String>,
    #[serde(rename(deserialize = "@Order"), default)]
    pub order: Option<String>,
    #[serde(rename(deserialize = "@DepartTime"), default)]
    pub depart_time: Option<String>,
    #[serde(rename(deserialize = "@DepartInterval"), default)]
    pub depart_interval: Option<String>,
    #[serde(rename(deserialize = "@Departed"), default)]
    pub departed: Option<String>,
    #[serde(rename(deserialize = "@Direction"), default)]
    pub direction: Option<String>,
    #[serde(rename(deserialize = "@IsStalled"), default)]
    pub is_stalled: Option<String>,
    #[serde(rename(deserialize = "@TrackCode"), default)]
    pub track_code: Option<String>,
    #[serde(rename(deserialize = "@LN"), default)]
    pub line: Option<String>,
}

pub fn parse_summary(xml: &str) -> Result<PredictionSummary, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}

pub fn parse_detail(xml: &str) -> Result<PredictionDetail, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}

pub const SUMMARY_COLUMNS: [&str; 3] = ["fetch_time", "line_code", "prediction_summary_json"];

pub const DETAILS_COLUMNS: [&str; 4] = [
    "fetch_time",
    "line_code",
    "station_code",
    "prediction_details_json",
];

/// One `prediction_summary` row.
#[derive(Debug, Serialize)]
pub struct SummaryRow<'a> {
    #[serde(serialize_with = "epoch_seconds")]
    pub fetch_time: DateTime<Utc>,
    pub line_code: &'a str,
    pub prediction_summary_json: &'a PredictionSummary,
}

/// One `prediction_details` row.
#[derive(Debug, Serialize)]
pub struct DetailRow<'a> {
    #[serde(serialize_with = "epoch_seconds")]
    pub fetch_time: DateTime<Utc>,
    pub line_code: &'a str,
    pub station_code: &'a str,
    pub prediction_details_json: &'a PredictionDetail,
}

fn epoch_seconds<S: serde::Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(t.timestamp())
}

/// Newline-terminated `JSONEachRow` encoding of `rows`.
pub fn encode_rows<T: Serialize>(rows: &[T]) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.push(b'\n');
    }
    Ok(out)
}
