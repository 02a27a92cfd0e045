//! Stand-in for the ClickHouse HTTP interface: accepts inserts and records them.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use super::{read_request, write_response, RawRequest};

pub struct ClickHouseServer {
    pub url: String,
    pub inserts: Arc<Mutex<Vec<RawRequest>>>,
}

pub fn start() -> ClickHouseServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let inserts = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&inserts);
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let Some(request) = read_request(&mut stream) else {
                continue;
            };
            let rows = request.body.iter().filter(|b| **b == b'\n').count();
            recorded.lock().unwrap().push(request);
            let summary = format!(r#"{{"read_rows":"0","written_rows":"{}"}}"#, rows);
            write_response(&mut stream, "200 OK", &[("X-ClickHouse-Summary", summary)], b"");
        }
    });

    ClickHouseServer {
        url: format!("http://127.0.0.1:{}/", port),
        inserts,
    }
}
