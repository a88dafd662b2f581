// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_peer::{pair, Peer};
use cmt_wire::{ErrorReply, ProtocolVersion};

fn settings() -> ProjectSettings {
    ProjectSettings::new("app", "/src/app", "/build/app").generator("Ninja")
}

fn attached() -> (ServerClient, Peer) {
    let (reader, writer, peer) = pair();
    let mut client = ServerClient::new(settings());
    client.attach(reader, writer);
    (client, peer)
}

fn hello() -> Message {
    Message::Hello(Hello {
        supported_protocol_versions: vec![
            ProtocolVersion { major: 1, minor: 2, is_experimental: true },
            ProtocolVersion { major: 1, minor: 0, is_experimental: false },
        ],
    })
}

fn codemodel_reply() -> Value {
    json!({
        "configurations": [{
            "name": "Debug",
            "projects": [{
                "name": "App",
                "targets": [{ "name": "app", "type": "EXECUTABLE", "sourceDirectory": "/src/app" }]
            }]
        }]
    })
}

fn cache_reply(keys: &[&str]) -> Value {
    let entries: Vec<Value> =
        keys.iter().map(|k| json!({ "key": k, "value": "1", "type": "STRING" })).collect();
    json!({ "cache": entries })
}

/// Answer every request with a canned reply until `last` has been answered.
async fn serve_until(peer: &mut Peer, last: &str, cache: &[&str]) -> Vec<(String, ReplyPayload)> {
    let mut seen = Vec::new();
    loop {
        let (kind, cookie, params) = peer.request().await;
        let payload = match kind.as_str() {
            "codemodel" => codemodel_reply(),
            "cache" => cache_reply(cache),
            _ => json!({}),
        };
        peer.reply(&cookie, &kind, payload).await;
        let done = kind == last;
        seen.push((kind, params));
        if done {
            return seen;
        }
    }
}

async fn started() -> (ServerClient, Peer) {
    let (mut client, mut peer) = attached();
    peer.send(hello()).await;
    let (result, _) =
        tokio::join!(client.start(), serve_until(&mut peer, "codemodel", &["A", "B"]));
    result.unwrap();
    (client, peer)
}

fn kinds(seen: &[(String, ReplyPayload)]) -> Vec<&str> {
    seen.iter().map(|(k, _)| k.as_str()).collect()
}

#[test]
fn states_are_ordered() {
    assert!(ServerState::Stopped < ServerState::Connected);
    assert!(ServerState::Connected < ServerState::Running);
    assert!(ServerState::Running < ServerState::Configured);
    assert!(ServerState::Configured < ServerState::Generated);
}

#[tokio::test]
async fn attach_moves_to_connected() {
    let (client, _peer) = attached();
    assert_eq!(client.state(), ServerState::Connected);
}

#[tokio::test]
async fn start_handshakes_configures_and_generates() {
    let (mut client, mut peer) = attached();
    let mut models = client.subscribe();
    peer.send(hello()).await;

    let (result, seen) =
        tokio::join!(client.start(), serve_until(&mut peer, "codemodel", &["A", "B"]));
    result.unwrap();

    assert_eq!(kinds(&seen), vec!["handshake", "configure", "cache", "compute", "codemodel"]);
    let handshake = &seen[0].1;
    assert_eq!(handshake["protocolVersion"], json!({ "major": 1, "minor": 2 }));
    assert_eq!(handshake["sourceDirectory"], json!("/src/app"));
    assert_eq!(handshake["buildDirectory"], json!("/build/app"));
    assert_eq!(handshake["generator"], json!("Ninja"));
    assert!(!handshake.contains_key("platform"));
    assert_eq!(seen[1].1["cacheArguments"], json!(["-DCMAKE_BUILD_TYPE=Debug"]));

    assert_eq!(client.state(), ServerState::Generated);
    assert!(models.has_changed().unwrap());
    let model = models.borrow_and_update().clone().unwrap();
    assert_eq!(model.project("App").unwrap().targets[0].name, "app");
    assert_eq!(client.cache().len(), 2);
}

#[tokio::test]
async fn configure_and_generate_are_ignored_when_stopped() {
    let mut client = ServerClient::new(settings());

    client.configure(&[]).await.unwrap();
    client.generate().await.unwrap();

    assert_eq!(client.state(), ServerState::Stopped);
    assert!(client.code_model().is_none());
}

#[tokio::test]
async fn configure_and_generate_send_nothing_when_connected() {
    let (mut client, mut peer) = attached();

    client.configure(&["-DX=1".to_string()]).await.unwrap();
    client.generate().await.unwrap();

    assert_eq!(client.state(), ServerState::Connected);
    assert!(peer.try_next().await.is_none());
}

#[tokio::test]
async fn handshake_rejection_leaves_state_connected() {
    let (mut client, mut peer) = attached();
    peer.send(hello()).await;

    let server = async {
        let (kind, cookie, _) = peer.request().await;
        peer.send(Message::Error(ErrorReply {
            cookie,
            in_reply_to: kind,
            error_message: "bad generator".into(),
        }))
        .await;
    };
    let (result, ()) = tokio::join!(client.start(), server);

    match result {
        Err(ServerError::Connection(ConnectionError::Remote(message))) => {
            assert_eq!(message, "bad generator")
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    assert_eq!(client.state(), ServerState::Connected);
}

#[tokio::test]
async fn hello_without_versions_fails() {
    let (mut client, mut peer) = attached();
    peer.send(Message::Hello(Hello { supported_protocol_versions: vec![] })).await;

    assert!(matches!(client.start().await, Err(ServerError::NoProtocolVersion)));
    assert!(peer.try_next().await.is_none());
}

#[tokio::test]
async fn reconfigure_replaces_cache() {
    let (mut client, mut peer) = started().await;
    assert!(client.cache().contains_key("B"));

    let extra = ["-DEXTRA=ON".to_string()];
    let (result, seen) = tokio::join!(
        client.configure(&extra),
        serve_until(&mut peer, "cache", &["A"])
    );
    result.unwrap();

    assert_eq!(seen[0].1["cacheArguments"], json!(["-DCMAKE_BUILD_TYPE=Debug", "-DEXTRA=ON"]));
    let keys: Vec<_> = client.cache().keys().cloned().collect();
    assert_eq!(keys, vec!["A"]);
    assert_eq!(client.state(), ServerState::Generated);
}

#[tokio::test]
async fn rejected_configure_keeps_state_and_cache() {
    let (mut client, mut peer) = started().await;

    let server = async {
        let (kind, cookie, _) = peer.request().await;
        peer.send(Message::Error(ErrorReply {
            cookie,
            in_reply_to: kind,
            error_message: "CMake Error".into(),
        }))
        .await;
    };
    let (result, ()) = tokio::join!(client.configure(&[]), server);

    assert!(matches!(result, Err(ServerError::Connection(ConnectionError::Remote(_)))));
    assert_eq!(client.state(), ServerState::Generated);
    assert_eq!(client.cache().len(), 2);
}

#[tokio::test]
async fn generate_after_configure_skips_implicit_configure() {
    let (mut client, mut peer) = started().await;
    let mut models = client.subscribe();

    let (result, seen) = tokio::join!(client.generate(), serve_until(&mut peer, "codemodel", &[]));
    result.unwrap();

    assert_eq!(kinds(&seen), vec!["compute", "codemodel"]);
    assert!(models.has_changed().unwrap());
}

#[tokio::test]
async fn signals_are_forwarded() {
    let (client, mut peer) = attached();
    let mut signals = client.signals();

    peer.send(Message::Signal(Signal { name: "dirty".into(), payload: Map::new() })).await;

    assert_eq!(signals.recv().await.unwrap().name, "dirty");
}

#[tokio::test]
async fn dispose_returns_to_stopped() {
    let (mut client, mut peer) = started().await;

    client.dispose().await;

    assert_eq!(client.state(), ServerState::Stopped);
    client.generate().await.unwrap();
    assert!(peer.try_next().await.is_none());
    // Last published model stays readable
    assert!(client.code_model().is_some());
}

mod driver {
    use super::*;
    use crate::build::FakeSink;

    fn attached_driver() -> (ServerDriver, Peer) {
        let (reader, writer, peer) = pair();
        let settings = settings().cmake_path("/nonexistent/cmt-test-cmake");
        let mut driver = ServerDriver::new(settings, Arc::new(FakeSink::new()));
        driver.client.attach(reader, writer);
        (driver, peer)
    }

    async fn reject_handshake(peer: &mut Peer) {
        let (kind, cookie, _) = peer.request().await;
        assert_eq!(kind, "handshake");
        peer.send(Message::Error(ErrorReply {
            cookie,
            in_reply_to: kind,
            error_message: "bad generator".into(),
        }))
        .await;
    }

    #[tokio::test]
    async fn generate_on_connected_server_starts_it() {
        let (mut driver, mut peer) = attached_driver();
        peer.send(hello()).await;

        let (result, seen) = tokio::join!(
            Driver::generate(&mut driver),
            serve_until(&mut peer, "codemodel", &["A"])
        );
        result.unwrap();

        assert_eq!(kinds(&seen), vec!["handshake", "configure", "cache", "compute", "codemodel"]);
        assert_eq!(driver.client().state(), ServerState::Generated);
        assert!(Driver::code_model(&driver).is_some());
    }

    #[tokio::test]
    async fn failed_start_disposes_the_server() {
        let (mut driver, mut peer) = attached_driver();
        peer.send(hello()).await;

        let (result, ()) = tokio::join!(Driver::generate(&mut driver), reject_handshake(&mut peer));

        assert!(matches!(
            result,
            Err(DriverError::Server(ServerError::Connection(ConnectionError::Remote(_))))
        ));
        assert_eq!(driver.client().state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn calls_after_failed_start_try_again_instead_of_succeeding() {
        let (mut driver, mut peer) = attached_driver();
        peer.send(hello()).await;
        let (first, ()) = tokio::join!(Driver::generate(&mut driver), reject_handshake(&mut peer));
        assert!(first.is_err());

        // The next call respawns; the bogus cmake path makes that fail loudly
        assert!(Driver::configure(&mut driver, &[]).await.is_err());
        assert!(Driver::generate(&mut driver).await.is_err());
        assert!(Driver::code_model(&driver).is_none());
    }
}
