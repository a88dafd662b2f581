// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn request_encodes_type_cookie_and_params() {
    let mut params = Map::new();
    params.insert("cacheArguments".into(), json!(["-DX=1"]));
    let message = Message::Request(Request::new("configure", "7", params));

    let value: Value = serde_json::from_slice(&message.encode().unwrap()).unwrap();
    assert_eq!(value, json!({ "type": "configure", "cookie": "7", "cacheArguments": ["-DX=1"] }));
}

#[test]
fn reply_payload_excludes_correlation_fields() {
    let message = Message::from_value(json!({
        "type": "reply",
        "cookie": "3",
        "inReplyTo": "codemodel",
        "configurations": []
    }))
    .unwrap();

    let Message::Reply(reply) = message else { panic!("expected reply") };
    assert_eq!(reply.cookie, "3");
    assert_eq!(reply.in_reply_to, "codemodel");
    assert_eq!(reply.payload.len(), 1);
    assert_eq!(reply.payload["configurations"], json!([]));
}

#[test]
fn numeric_cookie_is_accepted() {
    let message =
        Message::decode(br#"{"type":"error","cookie":12,"inReplyTo":"compute","errorMessage":"boom"}"#)
            .unwrap();
    assert_eq!(
        message,
        Message::Error(ErrorReply {
            cookie: "12".into(),
            in_reply_to: "compute".into(),
            error_message: "boom".into(),
        })
    );
}

#[test]
fn hello_lists_versions_in_order() {
    let message = Message::decode(
        br#"{"type":"hello","supportedProtocolVersions":[{"major":1,"minor":2,"isExperimental":true},{"major":1,"minor":1}]}"#,
    )
    .unwrap();
    let Message::Hello(hello) = message else { panic!("expected hello") };
    assert_eq!(
        hello.supported_protocol_versions,
        vec![
            ProtocolVersion { major: 1, minor: 2, is_experimental: true },
            ProtocolVersion { major: 1, minor: 1, is_experimental: false },
        ]
    );
}

#[yare::parameterized(
    hello    = { json!({ "type": "hello", "supportedProtocolVersions": [] }), Some(NotificationKind::Hello) },
    progress = { json!({ "type": "progress", "progressMessage": "x" }),       Some(NotificationKind::Progress) },
    signal   = { json!({ "type": "signal", "name": "dirty" }),                Some(NotificationKind::Signal) },
    message  = { json!({ "type": "message", "message": "hi" }),              Some(NotificationKind::Message) },
    reply    = { json!({ "type": "reply", "cookie": "1" }),                   None },
    request  = { json!({ "type": "compute", "cookie": "1" }),                 None },
)]
fn notification_kind(value: Value, expected: Option<NotificationKind>) {
    assert_eq!(Message::from_value(value).unwrap().notification_kind(), expected);
}

#[test]
fn unknown_type_decodes_as_request() {
    let message = Message::decode(br#"{"type":"handshake","cookie":"0","generator":"Ninja"}"#).unwrap();
    let Message::Request(request) = message else { panic!("expected request") };
    assert_eq!(request.kind, "handshake");
    assert_eq!(request.cookie, "0");
    assert_eq!(request.params["generator"], json!("Ninja"));
    assert!(!request.params.contains_key("type"));
}

#[test]
fn signal_round_trips_through_value() {
    let original = json!({ "type": "signal", "name": "fileChange", "path": "/src/CMakeLists.txt" });
    let message = Message::from_value(original.clone()).unwrap();
    assert_eq!(message.kind(), "signal");
    assert_eq!(message.to_value().unwrap(), original);
}

#[yare::parameterized(
    not_json    = { b"{nope" as &[u8] },
    not_object  = { b"[1,2]" },
    no_type     = { b"{\"cookie\":\"1\"}" },
    error_no_msg = { b"{\"type\":\"error\",\"cookie\":\"1\"}" },
)]
fn malformed_messages_fail(bytes: &[u8]) {
    assert!(Message::decode(bytes).is_err());
}
