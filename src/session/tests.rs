use super::*;
use crate::config::GameConfig;
use crate::game::simulation::{Simulation, TickOutcome};
use crate::game::types::Point;
use crate::protocol::{decode, PlayerData};
use crate::transport::ConnectionState;
use serde_json::json;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

fn test_config() -> SessionConfig {
    SessionConfig {
        peer_bind: "127.0.0.1:0".parse().unwrap(),
        advertise_host: "127.0.0.1".to_string(),
        join_timeout: Duration::from_secs(10),
        player_update_period: Duration::from_millis(50),
        game_state_period: Duration::from_millis(1000),
        max_update_segments: 50,
        remote_timeout: Duration::from_millis(2000),
    }
}

fn make_sim(name: &str, seed: u64) -> Simulation {
    Simulation::new(GameConfig::default(), name.to_string(), Skin::default(), false, seed)
}

fn offline_session(role: Role) -> Session {
    let (mut session, _events) = Session::new(test_config(), Directory::memory());
    session.role = Some(role);
    session.endpoint_id = Some("self".to_string());
    session.local.name = "Me".to_string();
    session
}

fn fake_peer(session: &mut Session, peer_id: &str) -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    session.transport.register(peer_id.to_string(), tx);
    rx
}

fn data(peer_id: &str, value: serde_json::Value) -> SessionEvent {
    SessionEvent::Transport(TransportEvent::Data {
        peer_id: peer_id.to_string(),
        text: value.to_string(),
    })
}

fn sent(rx: &mut UnboundedReceiver<String>) -> Vec<WireMessage> {
    let mut messages = Vec::new();
    while let Ok(text) = rx.try_recv() {
        messages.extend(decode(&text));
    }
    messages
}

/// Drains `events` into `session` until `done` holds, or fails after ten seconds.
async fn pump_until(
    session: &mut Session,
    events: &mut SessionEvents,
    sim: &mut Simulation,
    mut done: impl FnMut(&Session, &Simulation, Option<&SessionNotice>) -> bool,
) {
    let reached = tokio::time::timeout(Duration::from_secs(10), async {
        if done(session, sim, None) {
            return;
        }
        while let Some(event) = events.recv().await {
            let notice = session.handle_event(event, sim);
            if done(session, sim, notice.as_ref()) {
                return;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached in time");
}

#[test]
fn host_announces_joining_player_to_everyone() {
    let mut host = offline_session(Role::Host);
    let mut sim = make_sim("Me", 1);
    let mut first = fake_peer(&mut host, "g1");
    let notice = host.handle_event(
        data("g1", json!({ "type": "join", "playerName": "  Ana  " })),
        &mut sim,
    );
    assert_eq!(notice, Some(SessionNotice::PlayersChanged));
    assert_eq!(host.player_names(), vec!["Me".to_string(), "Ana".to_string()]);

    let messages = sent(&mut first);
    let Some(WireMessage::PlayerJoined { peer_id, player_data }) = messages.first() else {
        panic!("expected playerJoined, got {messages:?}");
    };
    assert_eq!(peer_id, "g1");
    assert_eq!(player_data.name.as_deref(), Some("Ana"));
    assert_eq!(player_data.score, Some(0));

    // A later guest also learns about the earlier one.
    let mut second = fake_peer(&mut host, "g2");
    host.handle_event(data("g2", json!({ "type": "join", "playerName": "Bo" })), &mut sim);
    let known: Vec<String> = sent(&mut second)
        .into_iter()
        .filter_map(|message| match message {
            WireMessage::PlayerJoined { peer_id, .. } => Some(peer_id),
            _ => None,
        })
        .collect();
    assert_eq!(known, vec!["g1".to_string(), "g2".to_string()]);
}

#[test]
fn host_relays_updates_and_ignores_spoofed_origin() {
    let mut host = offline_session(Role::Host);
    let mut sim = make_sim("Me", 1);
    let mut from = fake_peer(&mut host, "g1");
    let mut other = fake_peer(&mut host, "g2");

    host.handle_event(
        data(
            "g1",
            json!({ "type": "playerUpdate", "peerId": "g2", "playerData": { "x": 5.0, "score": 2 } }),
        ),
        &mut sim,
    );

    let remote = host.remote_players.get("g1").expect("update recorded under the sender");
    assert_eq!(remote.position.x, 5.0);
    assert_eq!(remote.score, 2);
    assert!(!host.remote_players.contains_key("g2"));

    assert!(sent(&mut from).is_empty());
    let relayed = sent(&mut other);
    assert_eq!(
        relayed,
        vec![WireMessage::PlayerUpdate {
            peer_id: Some("g1".to_string()),
            player_data: PlayerData {
                x: Some(5.0),
                score: Some(2),
                ..PlayerData::default()
            },
        }]
    );
}

#[test]
fn guest_merges_partial_updates_field_by_field() {
    let mut guest = offline_session(Role::Guest);
    let mut sim = make_sim("Me", 2);
    guest.handle_event(
        data(
            "host",
            json!({
                "type": "playerJoined",
                "peerId": "g7",
                "playerData": { "name": "Cy", "x": 1.0, "y": 2.0, "score": 0 }
            }),
        ),
        &mut sim,
    );
    guest.handle_event(
        data(
            "host",
            json!({ "type": "playerUpdate", "peerId": "g7", "playerData": { "y": 9.0, "kills": 1 } }),
        ),
        &mut sim,
    );
    let remote = &guest.remote_players["g7"];
    assert_eq!(remote.name, "Cy");
    assert_eq!(remote.position, Point { x: 1.0, y: 9.0 });
    assert_eq!(remote.kills, 1);

    // Our own announcement is not a remote player.
    guest.handle_event(
        data(
            "host",
            json!({ "type": "playerJoined", "peerId": "self", "playerData": { "name": "Me" } }),
        ),
        &mut sim,
    );
    assert!(!guest.remote_players.contains_key("self"));
}

#[test]
fn guest_takes_layout_from_game_state_but_host_does_not() {
    let layout = json!({
        "type": "gameState",
        "state": {
            "foods": [{ "x": 10.0, "y": 10.0, "type": "ultra", "value": 50 }],
            "powerups": [{ "x": 20.0, "y": 20.0, "type": "magnet" }]
        }
    });

    let mut guest = offline_session(Role::Guest);
    let mut sim = make_sim("Me", 3);
    guest.handle_event(data("host", layout.clone()), &mut sim);
    assert_eq!(sim.world.foods.len(), 1);
    assert_eq!(sim.world.foods[0].value(), 50);
    assert_eq!(sim.world.powerups.len(), 1);

    let mut host = offline_session(Role::Host);
    let mut host_sim = make_sim("Me", 3);
    let before = host_sim.world.foods.len();
    host.handle_event(data("g1", layout), &mut host_sim);
    assert_eq!(host_sim.world.foods.len(), before);
}

#[test]
fn host_introduces_itself_with_skin_on_open() {
    let mut host = offline_session(Role::Host);
    host.local.skin = Skin::by_name("Tiger");
    let mut sim = make_sim("Me", 6);
    let (outbound, mut rx) = mpsc::unbounded_channel();
    host.handle_event(
        SessionEvent::Transport(TransportEvent::Opened {
            peer_id: "g1".to_string(),
            outbound,
        }),
        &mut sim,
    );

    let messages = sent(&mut rx);
    assert!(matches!(messages.first(), Some(WireMessage::Welcome { host_name, .. }) if host_name == "Me"));
    let Some(WireMessage::PlayerJoined { peer_id, player_data }) = messages.get(1) else {
        panic!("expected the host's playerJoined, got {messages:?}");
    };
    assert_eq!(peer_id, "self");
    assert_eq!(player_data.name.as_deref(), Some("Me"));
    assert_eq!(player_data.skin.as_ref().map(|skin| skin.name.as_str()), Some("Tiger"));
}

#[test]
fn guest_drops_relayed_players_that_go_silent() {
    let mut guest = offline_session(Role::Guest);
    guest.host_peer = Some("host".to_string());
    let mut sim = make_sim("Me", 7);
    guest.handle_event(
        data("host", json!({ "type": "welcome", "hostName": "Hal" })),
        &mut sim,
    );

    // Lay the departed guest's body across the local player's path.
    let head = sim.player().head();
    let segments: Vec<serde_json::Value> = (0..10)
        .map(|index| json!({ "x": head.x + 3.0 - 24.0 + index as f64 * 8.0, "y": head.y }))
        .collect();
    guest.handle_event(
        data(
            "host",
            json!({
                "type": "playerUpdate",
                "peerId": "g7",
                "playerData": { "name": "Cy", "x": head.x - 21.0, "y": head.y, "segments": segments }
            }),
        ),
        &mut sim,
    );
    assert_eq!(guest.remote_players().len(), 2);
    assert_eq!(guest.prune_silent(Instant::now()), None);

    let long_ago = Instant::now()
        .checked_sub(Duration::from_secs(5))
        .expect("clock far enough from boot");
    for remote in guest.remote_players.values_mut() {
        remote.last_seen = Some(long_ago);
    }
    let notice = guest.handle_event(SessionEvent::UpdateDue(UpdateKind::PlayerUpdate), &mut sim);
    assert_eq!(notice, Some(SessionNotice::PlayersChanged));
    assert!(!guest.remote_players.contains_key("g7"));
    assert!(guest.remote_players.contains_key("host"));

    let outcome = sim.tick(16, 1.0, &guest.remote_players());
    assert!(!matches!(outcome, TickOutcome::GameOver(_)));
}

#[test]
fn host_never_prunes_its_guests() {
    let mut host = offline_session(Role::Host);
    let mut sim = make_sim("Me", 8);
    let _rx = fake_peer(&mut host, "g1");
    host.handle_event(data("g1", json!({ "type": "join", "playerName": "Ana" })), &mut sim);
    let later = Instant::now() + Duration::from_secs(60);
    assert_eq!(host.prune_silent(later), None);
    assert_eq!(host.remote_players().len(), 1);
}

#[test]
fn malformed_messages_change_nothing() {
    let mut guest = offline_session(Role::Guest);
    let mut sim = make_sim("Me", 4);
    let foods = sim.world.foods.len();
    let event = SessionEvent::Transport(TransportEvent::Data {
        peer_id: "host".to_string(),
        text: "{\"type\":\"teleport\"}".to_string(),
    });
    assert_eq!(guest.handle_event(event, &mut sim), None);
    assert_eq!(sim.world.foods.len(), foods);
    assert!(guest.remote_players.is_empty());
}

#[test]
fn closing_a_peer_forgets_it() {
    let mut host = offline_session(Role::Host);
    let mut sim = make_sim("Me", 5);
    let _rx = fake_peer(&mut host, "g1");
    host.handle_event(data("g1", json!({ "type": "join", "playerName": "Ana" })), &mut sim);
    let notice = host.handle_event(
        SessionEvent::Transport(TransportEvent::Closed {
            peer_id: "g1".to_string(),
        }),
        &mut sim,
    );
    assert_eq!(notice, Some(SessionNotice::PlayersChanged));
    assert!(host.remote_players.is_empty());
    assert!(!host.transport.is_open("g1"));
}

#[tokio::test]
async fn guest_connects_and_is_welcomed_with_food() {
    let directory = Directory::memory();
    let (mut host, mut host_events) = Session::new(test_config(), directory.clone());
    let mut host_sim = make_sim("Host", 1);
    let token = host.host("Host".to_string(), Skin::by_name("Galaxy")).await.expect("host");
    assert_eq!(token.len(), 8);
    assert_eq!(token, token.to_ascii_uppercase());
    assert_eq!(host.role(), Some(Role::Host));

    let (mut guest, mut guest_events) = Session::new(test_config(), directory.clone());
    let mut guest_sim = make_sim("Guest", 2);
    guest_sim.world.foods.clear();
    assert_eq!(guest.state(), ConnectionState::Disconnected);

    guest
        .join("Guest".to_string(), Skin::by_name("Fire"), &token.to_ascii_lowercase())
        .await
        .expect("join");
    assert_eq!(guest.state(), ConnectionState::Connected);
    assert_eq!(guest.token(), Some(token.as_str()));

    pump_until(&mut host, &mut host_events, &mut host_sim, |session, _, _| {
        session.player_names().contains(&"Guest".to_string())
    })
    .await;

    pump_until(&mut guest, &mut guest_events, &mut guest_sim, |session, sim, _| {
        let host_skin = session
            .remote_players()
            .iter()
            .find(|remote| remote.name == "Host")
            .and_then(|remote| remote.skin.as_ref())
            .map(|skin| skin.name.clone());
        !sim.world.foods.is_empty() && host_skin.as_deref() == Some("Galaxy")
    })
    .await;
    assert!(guest_sim.world.foods.len() >= host_sim.world.config.food_target);

    host.leave().await;
    pump_until(&mut guest, &mut guest_events, &mut guest_sim, |_, _, notice| {
        notice == Some(&SessionNotice::HostLost)
    })
    .await;
    assert_eq!(guest.state(), ConnectionState::Disconnected);
    guest.leave().await;
    assert!(!guest.is_active());
    assert!(matches!(
        directory.resolve(&token).await,
        Err(SessionError::TokenNotFound(_))
    ));
}

#[tokio::test]
async fn guest_updates_reach_other_guests_through_host() {
    let directory = Directory::memory();
    let (mut host, mut host_events) = Session::new(test_config(), directory.clone());
    let mut host_sim = make_sim("Host", 1);
    let token = host.host("Host".to_string(), Skin::default()).await.expect("host");

    let (mut ana, mut ana_events) = Session::new(test_config(), directory.clone());
    let mut ana_sim = make_sim("Ana", 2);
    ana.join("Ana".to_string(), Skin::default(), &token).await.expect("join");
    pump_until(&mut host, &mut host_events, &mut host_sim, |session, _, _| {
        session.remote_players().len() == 1
    })
    .await;

    let (mut bo, mut bo_events) = Session::new(test_config(), directory);
    let mut bo_sim = make_sim("Bo", 3);
    bo.join("Bo".to_string(), Skin::default(), &token).await.expect("join");

    // Keep the host relaying while Bo waits for Ana's kinematic updates.
    let relay = tokio::spawn(async move {
        while let Some(event) = host_events.recv().await {
            host.handle_event(event, &mut host_sim);
        }
    });
    let ana_driver = tokio::spawn(async move {
        while let Some(event) = ana_events.recv().await {
            ana.handle_event(event, &mut ana_sim);
        }
    });

    pump_until(&mut bo, &mut bo_events, &mut bo_sim, |session, _, _| {
        session
            .remote_players()
            .iter()
            .any(|remote| remote.name == "Ana" && !remote.segments.is_empty())
    })
    .await;

    relay.abort();
    ana_driver.abort();
}

#[tokio::test]
async fn join_failures_leave_session_disconnected() {
    let directory = Directory::memory();
    let (mut guest, _events) = Session::new(test_config(), directory.clone());

    let result = guest.join("Guest".to_string(), Skin::default(), "ZZZZ9999").await;
    assert_eq!(result, Err(SessionError::TokenNotFound("ZZZZ9999".to_string())));
    assert_eq!(guest.state(), ConnectionState::Disconnected);
    assert!(!guest.is_active());

    // A listener that accepts TCP but never answers the websocket handshake.
    let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let record = PeerRecord {
        peer_id: "feedbeef00000000".to_string(),
        addr: silent.local_addr().unwrap().to_string(),
    };
    directory.register(&record).await.unwrap();
    let mut config = test_config();
    config.join_timeout = Duration::from_millis(200);
    let (mut impatient, _events) = Session::new(config, directory);
    let result = impatient
        .join("Guest".to_string(), Skin::default(), "FEEDBEEF")
        .await;
    assert_eq!(result, Err(SessionError::Timeout));
    assert_eq!(impatient.state(), ConnectionState::Disconnected);
    assert!(!impatient.is_active());
}

#[tokio::test]
async fn hosting_twice_is_rejected() {
    let (mut host, _events) = Session::new(test_config(), Directory::memory());
    host.host("Host".to_string(), Skin::default()).await.expect("host");
    let again = host.host("Host".to_string(), Skin::default()).await;
    assert_eq!(again, Err(SessionError::AlreadyActive));
    host.leave().await;
    assert!(host.token().is_none());
    assert_eq!(host.state(), ConnectionState::Disconnected);
}
