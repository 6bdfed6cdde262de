use staticd::http::parser::{ParseError, parse_request_head};
use staticd::http::request::Method;
use staticd::http::response::StatusCode;

#[test]
fn test_parse_simple_get_request() {
    let req = "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = parse_request_head(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.target, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("Host"), Some("example.com"));
}

#[test]
fn test_parse_keeps_target_encoded_with_query() {
    let req = "GET /a%20b.html?q=rust HTTP/1.1\r\n\r\n";
    let parsed = parse_request_head(req).unwrap();

    assert_eq!(parsed.target, "/a%20b.html?q=rust");
}

#[test]
fn test_parse_multiple_headers() {
    let req = "GET /path HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test-client\r\nAccept: */*\r\n\r\n";
    let parsed = parse_request_head(req).unwrap();

    assert_eq!(parsed.headers.len(), 3);
    assert_eq!(parsed.user_agent(), "test-client");
    assert_eq!(parsed.header("accept"), Some("*/*"));
}

#[test]
fn test_parse_stops_headers_at_first_malformed_line() {
    let req = "GET / HTTP/1.1\r\nHost: a\r\nBrokenHeader\r\nAccept: */*\r\n\r\n";
    let parsed = parse_request_head(req).unwrap();

    assert_eq!(parsed.header("Host"), Some("a"));
    assert_eq!(parsed.header("Accept"), None);
}

#[test]
fn test_parse_empty_input() {
    assert!(matches!(parse_request_head(""), Err(ParseError::Empty)));
    assert!(matches!(parse_request_head("\r\n\r\n"), Err(ParseError::Empty)));
}

#[test]
fn test_parse_wrong_token_counts() {
    let cases = [
        "GET /\r\n\r\n",
        "GET\r\n\r\n",
        "GET / HTTP/1.1 extra\r\n\r\n",
        "GET  / HTTP/1.1\r\n\r\n",
        "GET / HTTP/1.1 \r\n\r\n",
    ];

    for case in cases {
        let result = parse_request_head(case);
        assert!(
            matches!(result, Err(ParseError::MalformedRequestLine(_))),
            "expected malformed for {:?}",
            case
        );
    }
}

#[test]
fn test_parse_errors_map_to_bad_request() {
    assert_eq!(ParseError::Empty.status(), StatusCode::BadRequest);
    assert_eq!(
        ParseError::MalformedRequestLine("x".into()).status(),
        StatusCode::BadRequest
    );
}

#[test]
fn test_parse_unknown_method_is_not_a_parse_error() {
    let parsed = parse_request_head("BREW /pot.html HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(parsed.method, Method::Other("BREW".to_string()));
}

#[test]
fn test_parse_accepts_bare_newlines() {
    let parsed = parse_request_head("GET /style.css HTTP/1.0\nHost: x\n\n").unwrap();

    assert_eq!(parsed.target, "/style.css");
    assert_eq!(parsed.version, "HTTP/1.0");
}

#[test]
fn test_parse_missing_user_agent_logs_dash() {
    let parsed = parse_request_head("GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

    assert_eq!(parsed.user_agent(), "-");
}
