//! Verify header normalization, request building and response interpretation
//! against JSON test vectors stored in `test-vectors/`.
//!
//! Request bodies are compared as strings on purpose: the encoded bytes are
//! what `content-length` is computed from.

use request_core::{
    headers_from_value, interpret, Body, Dispatcher, Endpoint, HttpMethod, HttpResponse,
    ProxyConfig, RequestError, RequestOptions,
};

fn dispatcher() -> Dispatcher {
    Dispatcher::new().unwrap().proxy_source(ProxyConfig::default())
}

fn parse_method(s: &str) -> HttpMethod {
    s.parse().unwrap_or_else(|()| panic!("unknown method: {s}"))
}

fn pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[test]
fn header_test_vectors() {
    let raw = include_str!("../../test-vectors/headers.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let out = headers_from_value(&case["input"]);
        assert_eq!(out, pairs(&case["expected"]), "{name}");
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let d = dispatcher();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let endpoint = Endpoint::from(case["endpoint"].clone());
        let options: RequestOptions = serde_json::from_value(case["options"].clone()).unwrap();
        let result = d.prepare(&endpoint, &options);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(err.to_string(), expected_error.as_str().unwrap(), "{name}: error");
            continue;
        }

        let req = result.unwrap();
        let expected = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url.as_str(), expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");
        assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
        assert_eq!(req.payload(), expected["payload"].as_str(), "{name}: payload");
        assert!(req.proxy.is_none(), "{name}: proxy");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            status_message: sim["status_message"].as_str().unwrap().to_string(),
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let outcome = interpret(response, case["json"].as_bool().unwrap());

        let expected = &case["expected"];
        match expected["kind"].as_str().unwrap() {
            "text" => {
                let reply = outcome.unwrap();
                assert_eq!(
                    reply.body,
                    Body::Text(expected["body"].as_str().unwrap().to_string()),
                    "{name}: body"
                );
            }
            "json" => {
                let reply = outcome.unwrap();
                assert_eq!(reply.body, Body::Json(expected["body"].clone()), "{name}: body");
            }
            "json_error" => {
                let err = outcome.unwrap_err();
                assert!(matches!(err, RequestError::Json { .. }), "{name}: expected Json");
                assert_eq!(
                    u64::from(err.head().unwrap().status),
                    expected["status"].as_u64().unwrap(),
                    "{name}: status"
                );
            }
            "status_error" => {
                let err = outcome.unwrap_err();
                assert!(matches!(err, RequestError::Status { .. }), "{name}: expected Status");
                assert_eq!(err.to_string(), expected["message"].as_str().unwrap(), "{name}: message");
                assert_eq!(
                    u64::from(err.head().unwrap().status),
                    expected["status"].as_u64().unwrap(),
                    "{name}: status"
                );
                assert_eq!(err.body(), expected["body"].as_str(), "{name}: body");
            }
            other => panic!("{name}: unknown expected kind: {other}"),
        }
    }
}
