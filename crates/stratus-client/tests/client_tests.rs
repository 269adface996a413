//! Integration tests for stratus-client
//!
//! Every test drives a full request/response cycle through the scripted
//! mock transport, asserting both the bytes the client puts on the wire
//! and how it handles what comes back.

use pretty_assertions::assert_eq;
use stratus_client::transport::MockTransport;
use stratus_client::{ClientConfig, DataValue, Error, Status, StratusClient, StreamUpdate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_config() -> ClientConfig {
    ClientConfig::new("test-key")
        .with_endpoint("stratus.example.net", 80)
        .with_user_agent("Stratus Rust Client/test")
        .with_read_timeout(std::time::Duration::from_millis(100))
}

fn client_with_response(response: &str) -> StratusClient<MockTransport> {
    let mut transport = MockTransport::new();
    transport.push_response(response);
    StratusClient::new(transport, test_config())
}

fn values_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

// =============================================================================
// Push Operations
// =============================================================================

#[test]
fn update_stream_value_writes_exact_request() {
    init_tracing();
    let mut client = client_with_response("HTTP/1.1 202 Accepted\r\n\r\n");

    let status = client
        .update_stream_value("greenhouse-7", "temperature", 21.5)
        .unwrap();
    assert_eq!(status, Status(202));
    assert!(status.is_success());

    assert_eq!(
        client.transport().written_str(),
        "PUT /v2/devices/greenhouse-7/streams/temperature/value HTTP/1.0\r\n\
         Host: stratus.example.net\r\n\
         X-Stratus-Key: test-key\r\n\
         Content-Type: application/json\r\n\
         Content-Length: 14\r\n\
         User-Agent: Stratus Rust Client/test\r\n\
         \r\n\
         {\"value\":21.5}"
    );
    // the cycle released the connection
    assert_eq!(client.transport().stop_count(), 1);
}

#[test]
fn update_stream_value_returns_client_errors_as_status() {
    let mut client = client_with_response("HTTP/1.1 404 Not Found\r\n\r\n");
    let status = client
        .update_stream_value("nope", "temperature", 1.0)
        .unwrap();
    assert_eq!(status, Status(404));
    assert!(status.is_client_error());
}

#[test]
fn update_stream_value_rejects_empty_ids_before_io() {
    let mut client = StratusClient::new(MockTransport::new(), test_config());
    let err = client.update_stream_value("", "temperature", 1.0).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(client.transport().written().is_empty());
}

#[test]
fn post_device_updates_builds_batch_body() {
    let mut client = client_with_response("HTTP/1.1 202 Accepted\r\n\r\n");

    let humidity = [StreamUpdate::new(61.0)];
    let temperature = [
        StreamUpdate::at("2016-02-29T00:00:00.000Z", 21.5),
        StreamUpdate::new(22.0),
    ];
    let status = client
        .post_device_updates(
            "greenhouse-7",
            &[("humidity", &humidity), ("temperature", &temperature)],
        )
        .unwrap();
    assert_eq!(status, Status(202));

    let written = client.transport().written_str();
    assert!(written.starts_with("POST /v2/devices/greenhouse-7/updates HTTP/1.0\r\n"));
    assert!(written.ends_with(concat!(
        "{\"values\":{",
        "\"humidity\":[{\"value\":61.0}],",
        "\"temperature\":[",
        "{\"timestamp\":\"2016-02-29T00:00:00.000Z\",\"value\":21.5},",
        "{\"value\":22.0}",
        "]}}"
    )));
}

#[test]
fn post_device_updates_requires_updates() {
    let mut client = StratusClient::new(MockTransport::new(), test_config());
    let err = client.post_device_updates("greenhouse-7", &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn update_location_puts_fix() {
    let mut client = client_with_response("HTTP/1.1 202 Accepted\r\n\r\n");
    let status = client
        .update_location("delivery-van-3", "depot", 48.1374, 11.5755, 520.0)
        .unwrap();
    assert_eq!(status, Status(202));

    let written = client.transport().written_str();
    assert!(written.starts_with("PUT /v2/devices/delivery-van-3/location HTTP/1.0\r\n"));
    assert!(written.contains("\"latitude\":48.1374"));
    assert!(written.contains("\"longitude\":11.5755"));
    assert!(written.contains("\"elevation\":520.0"));
}

#[test]
fn delete_values_validates_bounds_before_io() {
    let mut client = StratusClient::new(MockTransport::new(), test_config());
    let err = client
        .delete_values("greenhouse-7", "temperature", "yesterday", "today")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(client.transport().written().is_empty());
}

#[test]
fn delete_values_sends_range_body() {
    let mut client = client_with_response("HTTP/1.1 204 No Content\r\n\r\n");
    let status = client
        .delete_values(
            "greenhouse-7",
            "temperature",
            "2016-02-29T00:00:00.000Z",
            "2016-03-01T00:00:00.000Z",
        )
        .unwrap();
    assert_eq!(status, Status(204));

    let written = client.transport().written_str();
    assert!(written
        .starts_with("DELETE /v2/devices/greenhouse-7/streams/temperature/values HTTP/1.0\r\n"));
    assert!(written.ends_with(
        "{\"end\":\"2016-03-01T00:00:00.000Z\",\"from\":\"2016-02-29T00:00:00.000Z\"}"
    ));
}

// =============================================================================
// Streamed Listings
// =============================================================================

const THREE_VALUES: &str = r#"{"limit":3,"values":[
    {"timestamp":"2016-02-29T00:00:00.000Z","value":20.0},
    {"timestamp":"2016-02-29T00:01:00.000Z","value":20.5},
    {"timestamp":"2016-02-29T00:02:00.000Z","value":"error"}
]}"#;

#[test]
fn list_stream_values_delivers_records_in_order() {
    init_tracing();
    let mut client = client_with_response(&values_response(THREE_VALUES));

    let mut seen = Vec::new();
    let status = client
        .list_stream_values("greenhouse-7", "temperature", None, |value| {
            seen.push(value)
        })
        .unwrap();

    assert_eq!(status, Status(200));
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].value, DataValue::Number(20.0));
    assert_eq!(seen[1].value, DataValue::Number(20.5));
    assert_eq!(seen[2].value, DataValue::Text("error".to_string()));
    assert!(client
        .transport()
        .written_str()
        .starts_with("GET /v2/devices/greenhouse-7/streams/temperature/values HTTP/1.0\r\n"));
}

#[test]
fn list_stream_values_is_chunk_boundary_independent() {
    let response = values_response(THREE_VALUES);

    let mut whole = Vec::new();
    let mut client = client_with_response(&response);
    client
        .list_stream_values("greenhouse-7", "temperature", None, |v| whole.push(v))
        .unwrap();

    let mut bytewise = Vec::new();
    let mut transport = MockTransport::new();
    transport.push_response_bytewise(&response);
    let mut client = StratusClient::new(transport, test_config());
    client
        .list_stream_values("greenhouse-7", "temperature", None, |v| bytewise.push(v))
        .unwrap();

    assert_eq!(whole, bytewise);
}

#[test]
fn list_stream_values_appends_query() {
    let mut client = client_with_response(&values_response(r#"{"values":[]}"#));
    client
        .list_stream_values(
            "greenhouse-7",
            "temperature",
            Some("start=2016-02-29T00:00:00.000Z&limit=10"),
            |_| {},
        )
        .unwrap();

    assert!(client.transport().written_str().starts_with(
        "GET /v2/devices/greenhouse-7/streams/temperature/values\
         ?start=2016-02-29T00:00:00.000Z&limit=10 HTTP/1.0\r\n"
    ));
}

#[test]
fn list_stream_values_skips_body_on_error_status() {
    let mut client = client_with_response(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 26\r\n\r\n{\"message\":\"unknown device\"}",
    );

    let status = client
        .list_stream_values("nope", "temperature", None, |_| {
            panic!("no callback expected")
        })
        .unwrap();
    assert_eq!(status, Status(404));
}

#[test]
fn list_stream_values_without_content_length_reads_to_close() {
    // the mock closes the stream once its script drains, which is how an
    // HTTP/1.0 server ends a response with no Content-Length
    let body = r#"{"values":[{"timestamp":"2016-02-29T00:00:00.000Z","value":1.0}]}"#;
    let mut client = client_with_response(&format!("HTTP/1.1 200 OK\r\n\r\n{body}"));

    let mut seen = 0;
    let status = client
        .list_stream_values("greenhouse-7", "temperature", None, |_| seen += 1)
        .unwrap();
    assert_eq!(status, Status(200));
    assert_eq!(seen, 1);
}

#[test]
fn list_stream_values_malformed_tail_keeps_delivered_records() {
    let body = r#"{"values":[
        {"timestamp":"2016-02-29T00:00:00.000Z","value":1.0},
        {"timestamp":"2016-02-29T00:01:00.000Z","value":2.0},
        {"timestamp":"#;
    let mut client = client_with_response(&format!("HTTP/1.1 200 OK\r\n\r\n{body}"));

    let mut seen = 0;
    let err = client
        .list_stream_values("greenhouse-7", "temperature", None, |_| seen += 1)
        .unwrap_err();

    assert_eq!(seen, 2);
    assert_eq!(err, Error::JsonInvalid);
    assert_eq!(err.code(), -5);
}

#[test]
fn list_stream_values_disconnect_mid_body_is_disconnected() {
    // declared length promises more bytes than the peer delivers
    let mut client = client_with_response(
        "HTTP/1.1 200 OK\r\nContent-Length: 500\r\n\r\n{\"values\":[",
    );

    let err = client
        .list_stream_values("greenhouse-7", "temperature", None, |_| {})
        .unwrap_err();
    assert_eq!(err, Error::Disconnected);
}

#[test]
fn read_location_streams_waypoints() {
    let body = r#"{"name":"delivery-van-3","waypoints":[
        {"latitude":48.1,"longitude":11.5,"elevation":520.0,
         "timestamp":"2016-02-29T00:00:00.000Z"},
        {"latitude":48.2,"longitude":11.6,
         "timestamp":"2016-02-29T00:05:00.000Z"}
    ]}"#;
    let mut client = client_with_response(&values_response(body));

    let mut fixes = Vec::new();
    let status = client
        .read_location("delivery-van-3", |fix| fixes.push(fix))
        .unwrap();

    assert_eq!(status, Status(200));
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[0].latitude, 48.1);
    assert_eq!(fixes[1].elevation, 0.0);
    assert!(client
        .transport()
        .written_str()
        .starts_with("GET /v2/devices/delivery-van-3/location HTTP/1.0\r\n"));
}

// =============================================================================
// Time Endpoints
// =============================================================================

#[test]
fn time_seconds_parses_literal_body() {
    let mut client =
        client_with_response("HTTP/1.0 200 OK\r\nContent-Length: 10\r\n\r\n1471904000");
    assert_eq!(client.time_seconds().unwrap(), 1_471_904_000);
    assert!(client
        .transport()
        .written_str()
        .starts_with("GET /v2/time/seconds HTTP/1.0\r\n"));
}

#[test]
fn time_seconds_maps_server_error_to_http() {
    let mut client = client_with_response("HTTP/1.0 503 Service Unavailable\r\n\r\n");
    let err = client.time_seconds().unwrap_err();
    assert_eq!(err, Error::Http(Status(503)));
    assert_eq!(err.code(), 503);
}

#[test]
fn time_seconds_rejects_garbage_body() {
    let mut client = client_with_response("HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nnodig");
    assert_eq!(client.time_seconds().unwrap_err(), Error::JsonInvalid);
}

#[test]
fn time_millis_copies_literal_and_reports_required_capacity() {
    let response = "HTTP/1.0 200 OK\r\nContent-Length: 13\r\n\r\n1471904000123";

    // a zero-length probe learns the exact required size
    let mut client = client_with_response(response);
    let mut empty: [u8; 0] = [];
    assert_eq!(
        client.time_millis(&mut empty).unwrap_err(),
        Error::BufferTooSmall { required: 14 }
    );

    let mut client = client_with_response(response);
    let mut buf = [0u8; 32];
    let n = client.time_millis(&mut buf).unwrap();
    assert_eq!(n, 13);
    assert_eq!(&buf[..n], b"1471904000123");
    assert_eq!(buf[n], 0);
}

// =============================================================================
// Connectivity Failures
// =============================================================================

#[test]
fn unreachable_transport_is_no_connection() {
    let mut client = StratusClient::new(MockTransport::unreachable(), test_config());
    let err = client
        .update_stream_value("greenhouse-7", "temperature", 1.0)
        .unwrap_err();
    assert_eq!(err, Error::NoConnection);
    assert_eq!(err.code(), -1);
}

#[test]
fn silent_connection_times_out_as_not_reachable() {
    let mut transport = MockTransport::new();
    transport.keep_open_after_script();
    let mut client = StratusClient::new(transport, test_config());

    let err = client
        .update_stream_value("greenhouse-7", "temperature", 1.0)
        .unwrap_err();
    assert_eq!(err, Error::NotReachable);
    assert_eq!(err.code(), -3);
}

#[test]
fn close_mid_status_line_is_disconnected() {
    let mut client = client_with_response("HTTP/1.1 20");
    let err = client
        .update_stream_value("greenhouse-7", "temperature", 1.0)
        .unwrap_err();
    assert_eq!(err, Error::Disconnected);
    assert_eq!(err.code(), -2);
}

#[test]
fn every_cycle_releases_the_connection() {
    init_tracing();
    let mut transport = MockTransport::new();
    transport.push_response("HTTP/1.1 202 Accepted\r\n\r\n");
    transport.push_response(&values_response(r#"{"values":[]}"#));
    let mut client = StratusClient::new(transport, test_config());

    client
        .update_stream_value("greenhouse-7", "temperature", 1.0)
        .unwrap();
    assert_eq!(client.transport().stop_count(), 1);

    client
        .list_stream_values("greenhouse-7", "temperature", None, |_| {})
        .unwrap();
    assert_eq!(client.transport().stop_count(), 2);
}
