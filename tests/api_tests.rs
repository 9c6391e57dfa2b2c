use chrono::NaiveDate;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use salesreport::api::{DocumentSource, MoyskladClient, PeriodFilter};
use salesreport::config::ApiSettings;
use salesreport::ReportError;

/// Local HTTP server answering one canned response per connection.
/// `responses` receives the base URL so bodies can link back to the server.
/// The handle yields the request lines received.
fn serve<F>(responses: F) -> (String, JoinHandle<Vec<String>>)
where
    F: FnOnce(&str) -> Vec<(u16, String)>,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let responses = responses(&base);

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 2 {
                header.clear();
            }
            requests.push(request_line.trim_end().to_string());

            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            // the client may hang up early on error statuses
            stream.write_all(response.as_bytes()).ok();
        }
        requests
    });

    (base, handle)
}

fn client(base: &str) -> MoyskladClient {
    let settings = ApiSettings {
        base_url: base.to_string(),
        timeout_secs: 5,
        ..ApiSettings::default()
    };
    MoyskladClient::new(&settings, "test-token".to_string())
}

fn january() -> PeriodFilter {
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    PeriodFilter {
        project: "https://example.test/entity/project/1".to_string(),
        start: day(1).and_hms_opt(0, 0, 0).unwrap(),
        end: day(31).and_hms_milli_opt(23, 59, 59, 999).unwrap(),
    }
}

fn assert_api_error(err: ReportError, expected: &str) {
    match err {
        ReportError::ExternalApi { reason, .. } => {
            assert!(reason.contains(expected), "{reason}")
        }
        other => panic!("expected an API error, got: {other}"),
    }
}

#[test]
fn test_client_joins_rows_across_pages() {
    let (base, server) = serve(|base| {
        vec![
            (
                200,
                format!(
                    r#"{{"meta": {{"nextHref": "{base}/entity/demand?offset=100"}}, "rows": [{{"name": "00002"}}, {{"name": "00001"}}]}}"#
                ),
            ),
            (200, r#"{"meta": {}, "rows": [{"name": "00000"}]}"#.to_string()),
        ]
    });

    let documents = client(&base).shipments(&january()).unwrap();
    let requests = server.join().unwrap();

    let names: Vec<_> = documents.iter().filter_map(|d| d.name.as_deref()).collect();
    assert_eq!(names, vec!["00002", "00001", "00000"]);
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /entity/demand?"), "{}", requests[0]);
    assert!(requests[0].contains("limit=100"), "{}", requests[0]);
    assert!(requests[1].starts_with("GET /entity/demand?offset=100"), "{}", requests[1]);
}

#[test]
fn test_client_maps_error_status() {
    let (base, server) = serve(|_| vec![(500, r#"{"errors": []}"#.to_string())]);

    let err = client(&base).shipments(&january()).unwrap_err();
    server.join().unwrap();

    assert_api_error(err, "HTTP status 500");
}

#[test]
fn test_client_rejects_malformed_json() {
    let (base, server) = serve(|_| vec![(200, r#"{"rows": [{"name": "#.to_string())]);

    let err = client(&base).customer_returns(&january()).unwrap_err();
    server.join().unwrap();

    assert_api_error(err, "malformed JSON");
}

#[test]
fn test_client_requires_rows() {
    let (base, server) = serve(|_| vec![(200, r#"{"meta": {"size": 0}}"#.to_string())]);

    let err = client(&base).commission_reports("https://example.test/agent/1").unwrap_err();
    let requests = server.join().unwrap();

    assert_api_error(err, "no 'rows'");
    assert!(requests[0].starts_with("GET /entity/commissionreportin?"), "{}", requests[0]);
}
