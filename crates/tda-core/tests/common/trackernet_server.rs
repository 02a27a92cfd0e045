//! Stand-in for the Trackernet API: one line (`W`) with trains at `BNK` only.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use super::{read_request, write_response, RawRequest};

const SUMMARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ROOT xmlns="http://trackernet.lul.co.uk">
  <Time TimeStamp="2024/01/15 10:15:02" />
  <S Code="BNK" N="Bank.">
    <P N="Westbound - Platform 1" Code="0" Next="0">
      <T S="005" T="1" D="443" C="2:00" L="At Waterloo" DE="Waterloo" />
    </P>
  </S>
  <S Code="WLO" N="Waterloo.">
    <P N="Eastbound - Platform 2" Code="1" Next="0" />
  </S>
</ROOT>"#;

const DETAIL_BNK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ROOT xmlns="http://trackernet.lul.co.uk">
  <WhenCreated>15 Jan 2024 10:15:03</WhenCreated>
  <Line>W</Line>
  <LineName>Waterloo &amp; City</LineName>
  <S Code="BNK" Mess="" N="Bank." CurTime="10:15:03">
    <P N="Westbound - Platform 1" Num="1" TrackCode="TW1" NextTrain="false">
      <T LCID="1234" SetNo="005" TripNo="1" SecondsTo="120" TimeTo="2:00" Location="At Waterloo" Destination="Waterloo" DestCode="443" Order="0" DepartTime="10:15:00" DepartInterval="0" Departed="0" Direction="0" IsStalled="0" TrackCode="TW2" LN="W" />
    </P>
  </S>
</ROOT>"#;

pub struct TrackernetServer {
    /// API root, with trailing slash.
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RawRequest>>>,
}

pub fn start() -> TrackernetServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let Some(request) = read_request(&mut stream) else {
                continue;
            };
            let path = request.target.split('?').next().unwrap_or_default().to_string();
            recorded.lock().unwrap().push(request);

            let xml = [("Content-Type", "text/xml".to_string())];
            match path.as_str() {
                "/TrackerNet/PredictionSummary/W" => {
                    write_response(&mut stream, "200 OK", &xml, SUMMARY.as_bytes())
                }
                "/TrackerNet/PredictionDetailed/W/BNK" => {
                    write_response(&mut stream, "200 OK", &xml, DETAIL_BNK.as_bytes())
                }
                _ => write_response(&mut stream, "404 Not Found", &[], b""),
            }
        }
    });

    TrackernetServer {
        base_url: format!("http://127.0.0.1:{}/TrackerNet/", port),
        requests,
    }
}
