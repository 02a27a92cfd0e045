//! GTFS-realtime message types and the producer extensions the archiver understands.
//!
//! Proto2 extension fields are declared inline at their extension tag numbers
//! so a single decode picks them up; [`super::FeedCodec`] clears the ones a
//! feed has not enabled. Fields that are `required` in the schema are modeled
//! as `Option` so strict parsing can tell "absent" from "empty".
//!
//! | Extension         | Tag  | Extended messages                          |
//! |-------------------|------|--------------------------------------------|
//! | OBA               | 1000 | FeedHeader, FeedEntity, TripUpdate         |
//! | NYCT              | 1001 | FeedHeader, TripDescriptor, StopTimeUpdate |
//! | LMM               | 1001 | FeedHeader, Alert, EntitySelector          |
//! | LIRR, MNR, MTARR  | 1005 | StopTimeUpdate (one shared layout)         |
//! | CROWDING          | 1005 | VehiclePosition                            |
//!
//! NYCT and LMM both claim `FeedHeader` field 1001 with different messages, so
//! that slot is kept as raw bytes and decoded by the codec.

use prost::Message;
use serde::Serialize;

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct FeedHeader {
    #[prost(string, optional, tag = "1")]
    pub gtfs_realtime_version: Option<String>,
    #[prost(enumeration = "Incrementality", optional, tag = "2")]
    pub incrementality: Option<i32>,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
    #[prost(string, optional, tag = "4")]
    pub feed_version: Option<String>,
    #[prost(message, optional, tag = "1000")]
    pub oba_feed_header: Option<OneBusAwayFeedHeader>,
    /// Encoded `NyctFeedHeader` or `MercuryFeedHeader`, depending on the producer.
    #[prost(bytes = "vec", optional, tag = "1001")]
    #[serde(skip)]
    pub extension_1001: Option<Vec<u8>>,
}

impl FeedHeader {
    pub fn nyct_feed_header(&self) -> Result<Option<NyctFeedHeader>, prost::DecodeError> {
        self.extension_1001
            .as_deref()
            .map(NyctFeedHeader::decode)
            .transpose()
    }

    pub fn mercury_feed_header(&self) -> Result<Option<MercuryFeedHeader>, prost::DecodeError> {
        self.extension_1001
            .as_deref()
            .map(MercuryFeedHeader::decode)
            .transpose()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Incrementality {
    FullDataset = 0,
    Differential = 1,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct FeedEntity {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub is_deleted: Option<bool>,
    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<TripUpdate>,
    #[prost(message, optional, tag = "4")]
    pub vehicle: Option<VehiclePosition>,
    #[prost(message, optional, tag = "5")]
    pub alert: Option<Alert>,
    #[prost(message, optional, tag = "1000")]
    pub oba_feed_entity: Option<OneBusAwayFeedEntity>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TripUpdate {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, optional, tag = "3")]
    pub vehicle: Option<VehicleDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "5")]
    pub delay: Option<i32>,
    #[prost(message, optional, tag = "1000")]
    pub oba_trip_update: Option<OneBusAwayTripUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct StopTimeEvent {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,
    #[prost(int64, optional, tag = "2")]
    pub time: Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub uncertainty: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct StopTimeUpdate {
    #[prost(uint32, optional, tag = "1")]
    pub stop_sequence: Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub stop_id: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub arrival: Option<StopTimeEvent>,
    #[prost(message, optional, tag = "3")]
    pub departure: Option<StopTimeEvent>,
    #[prost(enumeration = "StopScheduleRelationship", optional, tag = "5")]
    pub schedule_relationship: Option<i32>,
    #[prost(message, optional, tag = "1001")]
    pub nyct_stop_time_update: Option<NyctStopTimeUpdate>,
    #[prost(message, optional, tag = "1005")]
    pub mta_railroad_stop_time_update: Option<MtaRailroadStopTimeUpdate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StopScheduleRelationship {
    Scheduled = 0,
    Skipped = 1,
    NoData = 2,
    Unscheduled = 3,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct VehiclePosition {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,
    #[prost(message, optional, tag = "8")]
    pub vehicle: Option<VehicleDescriptor>,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Position>,
    #[prost(uint32, optional, tag = "3")]
    pub current_stop_sequence: Option<u32>,
    #[prost(string, optional, tag = "7")]
    pub stop_id: Option<String>,
    #[prost(enumeration = "VehicleStopStatus", optional, tag = "4")]
    pub current_status: Option<i32>,
    #[prost(uint64, optional, tag = "5")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "6")]
    pub congestion_level: Option<i32>,
    #[prost(int32, optional, tag = "9")]
    pub occupancy_status: Option<i32>,
    #[prost(message, optional, tag = "1005")]
    pub crowding_descriptor: Option<CrowdingDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VehicleStopStatus {
    IncomingAt = 0,
    StoppedAt = 1,
    InTransitTo = 2,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Position {
    #[prost(float, optional, tag = "1")]
    pub latitude: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub longitude: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub bearing: Option<f32>,
    #[prost(double, optional, tag = "4")]
    pub odometer: Option<f64>,
    #[prost(float, optional, tag = "5")]
    pub speed: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Alert {
    #[prost(message, repeated, tag = "1")]
    pub active_period: Vec<TimeRange>,
    #[prost(message, repeated, tag = "5")]
    pub informed_entity: Vec<EntitySelector>,
    #[prost(int32, optional, tag = "6")]
    pub cause: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub effect: Option<i32>,
    #[prost(message, optional, tag = "8")]
    pub url: Option<TranslatedString>,
    #[prost(message, optional, tag = "10")]
    pub header_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "11")]
    pub description_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "1001")]
    pub mercury_alert: Option<MercuryAlert>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TimeRange {
    #[prost(uint64, optional, tag = "1")]
    pub start: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub end: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct EntitySelector {
    #[prost(string, optional, tag = "1")]
    pub agency_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub route_id: Option<String>,
    #[prost(int32, optional, tag = "3")]
    pub route_type: Option<i32>,
    #[prost(message, optional, tag = "4")]
    pub trip: Option<TripDescriptor>,
    #[prost(string, optional, tag = "5")]
    pub stop_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,
    #[prost(message, optional, tag = "1001")]
    pub mercury_entity_selector: Option<MercuryEntitySelector>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TranslatedString {
    #[prost(message, repeated, tag = "1")]
    pub translation: Vec<Translation>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Translation {
    #[prost(string, optional, tag = "1")]
    pub text: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub language: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub start_time: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub start_date: Option<String>,
    #[prost(enumeration = "TripScheduleRelationship", optional, tag = "4")]
    pub schedule_relationship: Option<i32>,
    #[prost(message, optional, tag = "1001")]
    pub nyct_trip_descriptor: Option<NyctTripDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TripScheduleRelationship {
    Scheduled = 0,
    Added = 1,
    Unscheduled = 2,
    Canceled = 3,
    Replacement = 5,
    Duplicated = 6,
    Deleted = 7,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct VehicleDescriptor {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub license_plate: Option<String>,
}

// NYCT subway extension (tag 1001).

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct NyctFeedHeader {
    #[prost(string, optional, tag = "1")]
    pub nyct_subway_version: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub trip_replacement_period: Vec<TripReplacementPeriod>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TripReplacementPeriod {
    #[prost(string, optional, tag = "1")]
    pub route_id: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub replacement_period: Option<TimeRange>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct NyctTripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub train_id: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub is_assigned: Option<bool>,
    #[prost(enumeration = "NyctDirection", optional, tag = "3")]
    pub direction: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NyctDirection {
    North = 1,
    East = 2,
    South = 3,
    West = 4,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct NyctStopTimeUpdate {
    #[prost(string, optional, tag = "1")]
    pub scheduled_track: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub actual_track: Option<String>,
}

// MTA railroad extension (tag 1005). LIRR and MNR publish the same layout.

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MtaRailroadStopTimeUpdate {
    #[prost(string, optional, tag = "1")]
    pub track: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub train_status: Option<String>,
}

// OneBusAway extension (tag 1000).

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct OneBusAwayFeedHeader {
    #[prost(int64, optional, tag = "1")]
    pub incremental_index: Option<i64>,
    #[prost(uint64, optional, tag = "2")]
    pub incremental_heartbeat_interval: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct OneBusAwayFeedEntity {
    #[prost(string, optional, tag = "1")]
    pub source: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct OneBusAwayTripUpdate {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,
}

// MTA service status ("Mercury") extension (tag 1001).

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MercuryFeedHeader {
    #[prost(string, optional, tag = "1")]
    pub mercury_version: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MercuryAlert {
    #[prost(uint64, optional, tag = "1")]
    pub created_at: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub updated_at: Option<u64>,
    #[prost(string, optional, tag = "3")]
    pub alert_type: Option<String>,
    #[prost(uint64, optional, tag = "7")]
    pub display_before_active: Option<u64>,
    #[prost(message, optional, tag = "8")]
    pub human_readable_active_period: Option<TranslatedString>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MercuryEntitySelector {
    #[prost(string, optional, tag = "1")]
    pub sort_order: Option<String>,
}

// MTA bus crowding extension (tag 1005).

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct CrowdingDescriptor {
    #[prost(int64, optional, tag = "1")]
    pub estimated_count: Option<i64>,
    #[prost(int64, optional, tag = "2")]
    pub estimated_capacity: Option<i64>,
}
