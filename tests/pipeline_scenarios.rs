use mockito::{Matcher, Server, ServerGuard};
use music_link_relay::api::spotify::SpotifyClient;
use music_link_relay::config::Config;
use music_link_relay::error::Error;
use music_link_relay::handler::{MessageHandler, SyncStatus, REAUTH_ADVISORY};
use music_link_relay::models::{ChatMessage, CredentialSession};
use music_link_relay::session::SessionStore;
use serde_json::json;
use std::sync::Arc;

const MESSAGE: &str = "check this out https://open.spotify.com/track/abc123 nice";
const PAGE: &str = r#"<html><body>
<a href="https://music.apple.com/jp/album/1">Listen on Apple Music</a>
<a href="https://open.spotify.com/track/xyz789">Listen on Spotify</a>
</body></html>"#;

fn handler_for(server: &ServerGuard, sessions: Arc<SessionStore>) -> MessageHandler {
    let cfg = Config {
        resolver_url: server.url(),
        spotify_api_base: server.url(),
        playlist_id: "pl1".into(),
        ..Config::default()
    };
    let spotify = SpotifyClient::new(reqwest::Client::new(), server.url());
    MessageHandler::from_config(&cfg, sessions, Arc::new(spotify)).unwrap()
}

fn active_sessions() -> Arc<SessionStore> {
    let store = Arc::new(SessionStore::new());
    store.set(CredentialSession {
        access_token: "tok".into(),
        client_id: "cid".into(),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    });
    store
}

fn resolution_body(canonical: &str, on_spotify: bool) -> String {
    json!({
        "type": "track",
        "url": canonical,
        "name": "Some Song",
        "image": "https://img.example/x.jpg",
        "links": { "spotify": on_spotify, "itunes": true, "youtube": true },
    })
    .to_string()
}

#[test]
fn shared_spotify_link_is_replied_and_appended_once() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let m_resolve = server
        .mock("POST", "/")
        .match_body(Matcher::Json(json!({ "url": "https://open.spotify.com/track/abc123" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .expect(1)
        .create();
    let m_page = server
        .mock("GET", "/song/x")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(PAGE)
        .expect(1)
        .create();
    let m_track = server
        .mock("GET", "/tracks/xyz789")
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "xyz789", "uri": "spotify:track:xyz789" }).to_string())
        .expect(1)
        .create();
    let m_add = server
        .mock("POST", "/playlists/pl1/tracks")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({ "uris": ["spotify:track:xyz789"] })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "snapshot_id": "s1" }).to_string())
        .expect(1)
        .create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let replies = rt.block_on(async { handler.handle(&ChatMessage::from_user(MESSAGE)).await });

    assert_eq!(replies, vec![canonical]);
    m_resolve.assert();
    m_page.assert();
    m_track.assert();
    m_add.assert();
}

#[test]
fn without_session_replies_link_and_advisory_and_skips_lookup() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .create();
    let m_page = server.mock("GET", "/song/x").with_body(PAGE).expect(0).create();
    let m_track = server.mock("GET", "/tracks/xyz789").expect(0).create();
    let m_add = server.mock("POST", "/playlists/pl1/tracks").expect(0).create();

    let handler = handler_for(&server, Arc::new(SessionStore::new()));
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outcome = rt
        .block_on(async { handler.process(MESSAGE).await })
        .expect("resolution succeeded");

    assert!(matches!(outcome.sync, SyncStatus::Failed(Error::NotAuthenticated)));
    let replies = outcome.replies();
    assert_eq!(replies.len(), 2);
    assert!(replies.contains(&canonical));
    assert!(replies.contains(&REAUTH_ADVISORY.to_string()));
    m_page.assert();
    m_track.assert();
    m_add.assert();
}

#[test]
fn link_without_spotify_equivalent_skips_scrape_and_sync() {
    let mut server = Server::new();
    let canonical = format!("{}/album/y", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, false))
        .create();
    let m_page = server.mock("GET", "/album/y").expect(0).create();
    let m_track = server.mock("GET", Matcher::Regex("^/tracks/".into())).expect(0).create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outcome = rt
        .block_on(async { handler.process("https://www.deezer.com/track/42").await })
        .expect("resolution succeeded");

    assert!(matches!(outcome.sync, SyncStatus::NotOnSpotify));
    assert_eq!(outcome.replies(), vec![canonical]);
    m_page.assert();
    m_track.assert();
}

#[test]
fn page_without_marker_anchor_still_replies_with_advisory() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .create();
    let _m_page = server
        .mock("GET", "/song/x")
        .with_status(200)
        .with_body(r#"<a href="https://www.deezer.com/track/1">Deezer</a>"#)
        .create();
    let m_track = server.mock("GET", Matcher::Regex("^/tracks/".into())).expect(0).create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outcome = rt
        .block_on(async { handler.process(MESSAGE).await })
        .expect("resolution succeeded");

    assert!(matches!(
        outcome.sync,
        SyncStatus::Failed(Error::IdentifierNotFound { .. })
    ));
    assert_eq!(outcome.replies(), vec![REAUTH_ADVISORY.to_string(), canonical]);
    m_track.assert();
}

#[test]
fn rejected_session_is_reported_as_lookup_failure() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .create();
    let _m_page = server.mock("GET", "/song/x").with_status(200).with_body(PAGE).create();
    let _m_track = server
        .mock("GET", "/tracks/xyz789")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"status":401,"message":"The access token expired"}}"#)
        .create();
    let m_add = server.mock("POST", "/playlists/pl1/tracks").expect(0).create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outcome = rt
        .block_on(async { handler.process(MESSAGE).await })
        .expect("resolution succeeded");

    assert!(matches!(outcome.sync, SyncStatus::Failed(Error::TrackLookupFailed(_))));
    assert_eq!(outcome.replies().len(), 2);
    m_add.assert();
}

#[test]
fn resharing_appends_a_duplicate() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .create();
    let _m_page = server.mock("GET", "/song/x").with_status(200).with_body(PAGE).create();
    let _m_track = server
        .mock("GET", "/tracks/xyz789")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "uri": "spotify:track:xyz789" }).to_string())
        .create();
    let m_add = server
        .mock("POST", "/playlists/pl1/tracks")
        .match_body(Matcher::Json(json!({ "uris": ["spotify:track:xyz789"] })))
        .with_status(201)
        .with_body(r#"{"snapshot_id":"s"}"#)
        .expect(2)
        .create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let msg = ChatMessage::from_user(MESSAGE);
        let (a, b) = tokio::join!(handler.handle(&msg), handler.handle(&msg));
        assert_eq!(a, vec![canonical.clone()]);
        assert_eq!(b, vec![canonical.clone()]);
    });
    m_add.assert();
}

#[test]
fn resolution_failures_are_silent() {
    let mut server = Server::new();
    let _m_resolve = server
        .mock("POST", "/")
        .with_status(500)
        .with_body("oops")
        .create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let replies = rt.block_on(async { handler.handle(&ChatMessage::from_user(MESSAGE)).await });
    assert!(replies.is_empty());
}

#[test]
fn malformed_resolution_is_silent() {
    let mut server = Server::new();
    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"unexpected": true}"#)
        .create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outcome = rt.block_on(async { handler.process(MESSAGE).await });
    assert!(outcome.is_none());
}

#[test]
fn messages_without_links_or_from_bots_never_reach_the_resolver() {
    let mut server = Server::new();
    let m_resolve = server.mock("POST", "/").expect(0).create();

    let handler = handler_for(&server, active_sessions());
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let plain = handler.handle(&ChatMessage::from_user("just chatting")).await;
        assert!(plain.is_empty());
        let bot = ChatMessage {
            author_is_bot: true,
            content: MESSAGE.into(),
        };
        assert!(handler.handle(&bot).await.is_empty());
    });
    m_resolve.assert();
}

#[test]
fn session_set_after_construction_is_picked_up() {
    let mut server = Server::new();
    let canonical = format!("{}/song/x", server.url());

    let _m_resolve = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(resolution_body(&canonical, true))
        .create();
    let _m_page = server.mock("GET", "/song/x").with_status(200).with_body(PAGE).create();
    let _m_track = server
        .mock("GET", "/tracks/xyz789")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "uri": "spotify:track:xyz789" }).to_string())
        .create();
    let m_add = server
        .mock("POST", "/playlists/pl1/tracks")
        .with_status(201)
        .with_body(r#"{"snapshot_id":"s"}"#)
        .expect(1)
        .create();

    let handler = handler_for(&server, Arc::new(SessionStore::new()));
    handler.sessions().set(CredentialSession {
        access_token: "fresh".into(),
        client_id: "cid".into(),
        expires_at: chrono::Utc::now() + chrono::Duration::minutes(5),
    });

    let rt = tokio::runtime::Runtime::new().unwrap();
    let replies = rt.block_on(async { handler.handle(&ChatMessage::from_user(MESSAGE)).await });
    assert_eq!(replies, vec![canonical]);
    m_add.assert();
}
