use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::config::{LineConfig, Secret, TrackernetConfig};
use crate::fetch::ConditionalGetState;
use crate::gtfs_rt::CodecCache;
use crate::http::HttpError;
use crate::scheduler::{Job, JobContext, JobError};
use crate::sink::PersistenceRouter;
use crate::test_support::{response, RecordingFallback, RecordingSink, ScriptedHttpClient};

const SUMMARY_W: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ROOT xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns="http://trackernet.lul.co.uk">
  <Time TimeStamp="2024/01/15 10:15:02" />
  <S Code="BNK" N="Bank.">
    <P N="Westbound - Platform 1" Code="0" Next="0">
      <T S="005" T="1" D="443" C="2:00" L="At Waterloo" DE="Waterloo" />
    </P>
  </S>
  <S Code="WLO" N="Waterloo.">
    <P N="Eastbound - Platform 2" Code="1" Next="0" />
  </S>
  <S Code="XYZ" N="Depot.">
    <P N="Platform 1" Code="0" Next="0">
      <T S="006" T="2" D="444" C="-" L="At Platform" DE="Bank" />
    </P>
  </S>
</ROOT>"#;

fn detail_xml(line: &str, station: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ROOT xmlns="http://trackernet.lul.co.uk">
  <WhenCreated>15 Jan 2024 10:15:03</WhenCreated>
  <Line>{line}</Line>
  <LineName>Waterloo &amp; City</LineName>
  <S Code="{station}" Mess="" N="Bank." CurTime="10:15:03">
    <P N="Westbound - Platform 1" Num="1" TrackCode="TW1" NextTrain="false">
      <T LCID="1234" SetNo="005" TripNo="1" SecondsTo="120" TimeTo="2:00" Location="At Waterloo" Destination="Waterloo" DestCode="443" Order="0" DepartTime="10:15:00" DepartInterval="0" Departed="0" Direction="0" IsStalled="0" TrackCode="TW2" LN="W" />
    </P>
  </S>
</ROOT>"#
    )
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn config(excluded: &[&str], max_requests_per_minute: u32) -> TrackernetConfig {
    TrackernetConfig {
        app_key: Secret::new("test-key"),
        base_url: "http://api.example/TrackerNet/".to_string(),
        max_requests_per_minute,
        derate_factor: 1.0,
        call_timeout_secs: 2,
        summary_table: "prediction_summary".to_string(),
        details_table: "prediction_details".to_string(),
        lines: vec![LineConfig {
            line_code: "W".to_string(),
            fetch_interval_secs: 30,
            excluded_stations: excluded.iter().map(|s| s.to_string()).collect(),
        }],
    }
}

struct Harness {
    http: Arc<ScriptedHttpClient>,
    sink: Arc<RecordingSink>,
    fallback: Arc<RecordingFallback>,
    job: LineArchiveJob,
}

fn harness(excluded: &[&str]) -> Harness {
    let config = config(excluded, 60_000);
    let http = Arc::new(ScriptedHttpClient::default());
    let sink = Arc::new(RecordingSink::default());
    let fallback = Arc::new(RecordingFallback::default());
    let client = Arc::new(TrackernetClient::new(http.clone(), &config).unwrap());
    let router = Arc::new(PersistenceRouter::new(
        sink.clone(),
        fallback.clone(),
        Arc::new(CodecCache::default()),
        "feed_contents",
    ));
    let job = LineArchiveJob::new(&config.lines[0], &config, client, router);
    Harness {
        http,
        sink,
        fallback,
        job,
    }
}

fn run(job: &LineArchiveJob) -> Result<(), JobError> {
    let key = job_key(job.line_code());
    let mut state = ConditionalGetState::default();
    let mut ctx = JobContext {
        key: &key,
        fire_time: at(0),
        state: &mut state,
        result: None,
    };
    job.execute(&mut ctx)
}

fn xml(body: &str) -> Result<crate::http::HttpResponse, HttpError> {
    Ok(response(200, &[("Content-Type", "text/xml")], body.as_bytes().to_vec()))
}

fn requested_paths(http: &ScriptedHttpClient) -> Vec<String> {
    http.requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[test]
fn summary_parses_stations_platforms_and_trains() {
    let summary = parse_summary(SUMMARY_W).unwrap();

    assert_eq!(
        summary.time.and_then(|t| t.timestamp).as_deref(),
        Some("2024/01/15 10:15:02")
    );
    assert_eq!(summary.stations.len(), 3);
    let bank = &summary.stations[0];
    assert_eq!(bank.code, "BNK");
    assert_eq!(bank.name.as_deref(), Some("Bank."));
    assert!(bank.has_trains());
    let train = &bank.platforms[0].trains[0];
    assert_eq!(train.set_number.as_deref(), Some("005"));
    assert_eq!(train.time_to_station.as_deref(), Some("2:00"));
    assert_eq!(train.destination.as_deref(), Some("Waterloo"));
    assert!(!summary.stations[1].has_trains());
}

#[test]
fn detail_parses_line_station_and_trains() {
    let detail = parse_detail(&detail_xml("W", "BNK")).unwrap();

    assert_eq!(detail.line, "W");
    assert_eq!(detail.line_name.as_deref(), Some("Waterloo & City"));
    assert_eq!(detail.station.station_code, "BNK");
    assert_eq!(detail.station.message.as_deref(), Some(""));
    let platform = &detail.station.platforms[0];
    assert_eq!(platform.track_code.as_deref(), Some("TW1"));
    let train = &platform.trains[0];
    assert_eq!(train.seconds_to.as_deref(), Some("120"));
    assert_eq!(train.destination_code.as_deref(), Some("443"));
    assert_eq!(train.line.as_deref(), Some("W"));
}

#[test]
fn malformed_xml_is_an_error() {
    assert!(parse_summary("<ROOT><S Code=\"BNK\"></ROOT>").is_err());
}

#[test]
fn details_are_fetched_only_for_stations_with_trains() {
    let h = harness(&["XYZ"]);
    h.http.push(xml(SUMMARY_W));
    h.http.push(xml(&detail_xml("W", "BNK")));

    run(&h.job).unwrap();

    assert_eq!(
        requested_paths(&h.http),
        ["/TrackerNet/PredictionSummary/W", "/TrackerNet/PredictionDetailed/W/BNK"]
    );
    let request = h.http.last_request();
    assert_eq!(request.url.query(), Some("app_key=test-key"));
    assert_eq!(request.timeout, Duration::from_secs(2));

    let summaries = h.sink.rows_in("prediction_summary");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["fetch_time"], at(0).timestamp());
    assert_eq!(summaries[0]["line_code"], "W");
    assert_eq!(
        summaries[0]["prediction_summary_json"]["stations"][0]["code"],
        "BNK"
    );

    let details = h.sink.rows_in("prediction_details");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["station_code"], "BNK");
    assert_eq!(
        details[0]["prediction_details_json"]["station"]["platforms"][0]["trains"][0]["seconds_to"],
        "120"
    );
}

#[test]
fn mismatched_or_failed_details_are_skipped() {
    let h = harness(&[]);
    h.http.push(xml(SUMMARY_W));
    h.http.push(xml(&detail_xml("C", "BNK")));
    h.http.push(Ok(response(503, &[], b"busy".to_vec())));

    run(&h.job).unwrap();

    assert_eq!(requested_paths(&h.http).len(), 3);
    assert_eq!(h.sink.rows_in("prediction_summary").len(), 1);
    assert!(h.sink.rows_in("prediction_details").is_empty());
    assert_eq!(h.sink.row_count(), 1);
}

#[test]
fn summary_failure_fails_the_job() {
    let h = harness(&[]);
    h.http.push(Ok(response(500, &[], b"oops".to_vec())));

    let err = run(&h.job).unwrap_err();

    assert!(matches!(err, JobError::Failed(_)));
    assert!(err.to_string().contains("line W"));
    assert_eq!(requested_paths(&h.http).len(), 1);
    assert_eq!(h.sink.row_count(), 0);
    assert_eq!(h.fallback.write_count(), 0);
}

#[test]
fn sink_outage_writes_each_observation_type_to_fallback() {
    let h = harness(&["XYZ"]);
    h.sink.set_failing(true);
    h.http.push(xml(SUMMARY_W));
    h.http.push(xml(&detail_xml("W", "BNK")));

    run(&h.job).unwrap();

    let writes = h.fallback.writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    let partitions: Vec<_> = writes.iter().map(|w| w.partition.clone()).collect();
    assert_eq!(
        partitions,
        vec![
            vec![
                ("observation_type".to_string(), "summary".to_string()),
                ("line_code".to_string(), "W".to_string()),
            ],
            vec![
                ("observation_type".to_string(), "details".to_string()),
                ("line_code".to_string(), "W".to_string()),
            ],
        ]
    );
    assert!(writes.iter().all(|w| w.fetch_time == at(0)));
    let detail_row: serde_json::Value =
        serde_json::from_slice(writes[1].data.strip_suffix(b"\n").unwrap()).unwrap();
    assert_eq!(detail_row["station_code"], "BNK");
}

#[test]
fn failed_fallback_fails_the_job() {
    let config = config(&[], 60_000);
    let http = Arc::new(ScriptedHttpClient::default());
    let sink = Arc::new(RecordingSink::default());
    sink.set_failing(true);
    let client = Arc::new(TrackernetClient::new(http.clone(), &config).unwrap());
    let router = Arc::new(PersistenceRouter::new(
        sink,
        Arc::new(RecordingFallback::failing()),
        Arc::new(CodecCache::default()),
        "feed_contents",
    ));
    let job = LineArchiveJob::new(&config.lines[0], &config, client, router);
    http.push(xml("<ROOT><Time TimeStamp=\"x\" /></ROOT>"));

    assert!(matches!(run(&job), Err(JobError::Failed(_))));
}

#[test]
fn requests_share_one_rate_limit() {
    // 1200 per minute: one request every 50ms.
    let config = config(&[], 1_200);
    let http = Arc::new(ScriptedHttpClient::default());
    for _ in 0..3 {
        http.push(xml(SUMMARY_W));
    }
    let client = TrackernetClient::new(http.clone(), &config).unwrap();

    let started = Instant::now();
    for _ in 0..3 {
        client.prediction_summary("W").unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(90));
}
