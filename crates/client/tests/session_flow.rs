//! Drives a session with gate traffic and checks the resulting mirror.
mod utils;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use mirror_client::*;
use mirror_protocol::{ClientMessage, EntitySync, ServerMessage};

use utils::*;

#[test]
fn account_logs_in_when_created() {
    let mut s = session_with(
        SessionConfigBuilder::default()
            .credentials(Some(Credentials::new("test1", "123456")))
            .build()
            .expect("Should build"),
    );

    s.on_data(&frames(&[create("Account", eid(0), true, json!({}))]))
        .expect("Should apply");

    assert_eq!(s.player().map(|p| p.id()), Some(eid(0)));
    assert_eq!(
        s.presentation_mut().take(),
        vec![PresentationEvent::EntityCreated {
            id: eid(0),
            type_name: "Account".to_string(),
        }]
    );
    assert_eq!(
        sent(s.transport()),
        vec![ServerMessage::CallEntityMethod {
            entity_id: eid(0),
            method: "Login".to_string(),
            args: vec![json!("test1"), json!("123456")],
        }]
    );
}

#[test]
fn duplicate_create_is_dropped() {
    let mut s = session();
    s.on_data(&frames(&[
        create("Avatar", eid(1), false, json!({"hp": 10})),
        create("Monster", eid(1), false, json!({})),
    ]))
    .expect("Duplicates aren't fatal");

    let e = s.registry().lookup(&eid(1)).expect("Should exist");
    assert_eq!(e.type_name(), "Avatar");
    assert_eq!(e.attrs.get("hp"), Some(&json!(10)));
    assert_eq!(s.registry().len(), 1);
    assert_eq!(
        s.stats(),
        SessionStats {
            frames_received: 2,
            frames_applied: 1,
            decode_errors: 0,
            apply_errors: 1,
        }
    );
}

#[test]
fn partial_frames_wait_for_the_rest() {
    let mut s = session();
    let bytes = frames(&[create("Avatar", eid(1), false, json!({}))]);
    let (head, tail) = bytes.split_at(bytes.len() - 3);

    s.on_data(head).expect("Should buffer");
    assert!(s.registry().is_empty());
    assert!(s.buffered_bytes() > 0);

    s.on_data(tail).expect("Should apply");
    assert_eq!(s.registry().len(), 1);
    assert_eq!(s.buffered_bytes(), 0);
}

#[test]
fn attribute_changes() {
    let mut s = session();
    let id = eid(2);
    s.on_data(&frames(&[
        create("Avatar", id, false, json!({"bag": {"items": []}, "title": "none"})),
        ClientMessage::MapAttrChange {
            entity_id: id,
            path: vec![],
            key: "hp".to_string(),
            value: json!(99),
        },
        ClientMessage::ListAttrAppend {
            entity_id: id,
            path: vec![json!("items"), json!("bag")],
            value: json!("sword"),
        },
        ClientMessage::ListAttrAppend {
            entity_id: id,
            path: vec![json!("items"), json!("bag")],
            value: json!("shield"),
        },
        ClientMessage::ListAttrChange {
            entity_id: id,
            path: vec![json!("items"), json!("bag")],
            index: 0,
            value: json!("axe"),
        },
        ClientMessage::ListAttrPop {
            entity_id: id,
            path: vec![json!("items"), json!("bag")],
        },
        ClientMessage::MapAttrDel {
            entity_id: id,
            path: vec![],
            key: "title".to_string(),
        },
    ]))
    .expect("Should apply");

    let e = s.registry().lookup(&id).expect("Should exist");
    assert_eq!(
        serde_json::Value::Object(e.attrs.clone()),
        json!({"bag": {"items": ["axe"]}, "hp": 99})
    );
    assert_eq!(s.stats().apply_errors, 0);

    let changes = s
        .presentation()
        .events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::AttrsChanged(_)))
        .count();
    assert_eq!(changes, 6);
}

#[test]
fn bad_attribute_path_leaves_entity_alone() {
    let mut s = session();
    let id = eid(3);
    s.on_data(&frames(&[
        create("Avatar", id, false, json!({"hp": 1})),
        ClientMessage::MapAttrChange {
            entity_id: id,
            path: vec![json!("hp")],
            key: "x".to_string(),
            value: json!(1),
        },
        ClientMessage::ListAttrPop {
            entity_id: id,
            path: vec![json!("missing")],
        },
    ]))
    .expect("Should apply");

    let e = s.registry().lookup(&id).expect("Should exist");
    assert_eq!(serde_json::Value::Object(e.attrs.clone()), json!({"hp": 1}));
    assert_eq!(s.stats().apply_errors, 2);
}

#[test]
fn messages_for_unknown_entities_are_dropped() {
    let mut s = session();
    s.on_data(&frames(&[
        ClientMessage::DestroyEntity {
            type_name: "Avatar".to_string(),
            entity_id: eid(9),
        },
        ClientMessage::MapAttrChange {
            entity_id: eid(9),
            path: vec![],
            key: "k".to_string(),
            value: json!(1),
        },
        ClientMessage::CallEntityMethod {
            entity_id: eid(9),
            method: "Hello".to_string(),
            args: vec![],
        },
    ]))
    .expect("Should not be fatal");
    assert_eq!(s.stats().apply_errors, 3);
    assert!(s.presentation().events.is_empty());
}

#[test]
fn position_sync_skips_unknown_entities() {
    let mut s = session();
    s.on_data(&frames(&[
        create("Avatar", eid(1), false, json!({})),
        create("Monster", eid(2), false, json!({})),
        ClientMessage::SyncPositionYaw(vec![
            EntitySync {
                entity_id: eid(1),
                position: Vec3::new(5.0, 0.0, 5.0),
                yaw: 1.5,
            },
            EntitySync {
                entity_id: eid(7),
                position: Vec3::new(9.0, 9.0, 9.0),
                yaw: 9.0,
            },
            EntitySync {
                entity_id: eid(2),
                position: Vec3::new(-1.0, 0.0, 2.0),
                yaw: 0.0,
            },
        ]),
    ]))
    .expect("Should apply");

    let a = s.registry().lookup(&eid(1)).unwrap();
    assert_eq!((a.position, a.yaw), (Vec3::new(5.0, 0.0, 5.0), 1.5));
    let b = s.registry().lookup(&eid(2)).unwrap();
    assert_eq!((b.position, b.yaw), (Vec3::new(-1.0, 0.0, 2.0), 0.0));
    assert_eq!(s.stats().apply_errors, 0);
}

#[test]
fn filtered_calls_go_to_the_player() {
    let mut s = session();
    let call = ClientMessage::CallFilteredClients {
        op: 0,
        key: "online".to_string(),
        value: "1".to_string(),
        method: "OnNotice".to_string(),
        args: vec![json!("hello")],
    };

    s.on_data(&frames(&[call.clone()])).expect("Not fatal");
    assert_eq!(s.stats().apply_errors, 1);
    assert!(s.presentation().events.is_empty());

    s.on_data(&frames(&[create("Avatar", eid(4), true, json!({})), call]))
        .expect("Should apply");
    assert_eq!(
        s.presentation_mut().take().pop(),
        Some(PresentationEvent::MethodCalled {
            id: eid(4),
            method: "OnNotice".to_string(),
            args: vec![json!("hello")],
        })
    );
}

#[test]
fn destroying_the_player_clears_it() {
    let mut s = session();
    s.on_data(&frames(&[create("Avatar", eid(1), true, json!({}))]))
        .unwrap();
    assert!(s.player().is_some());

    s.on_data(&frames(&[ClientMessage::DestroyEntity {
        type_name: "Avatar".to_string(),
        entity_id: eid(1),
    }]))
    .unwrap();
    assert!(s.player().is_none());
    assert!(s.registry().is_empty());
    assert_eq!(
        s.presentation_mut().take().pop(),
        Some(PresentationEvent::EntityDestroyed(eid(1)))
    );
}

#[test]
fn spaces_are_tracked_separately() {
    let mut s = session();
    s.on_data(&frames(&[create(SPACE_TYPE_NAME, eid(5), false, json!({"_K": 2}))]))
        .unwrap();
    assert!(s.registry().is_empty());
    assert_eq!(s.space().map(|sp| (sp.id, sp.kind)), Some((eid(5), 2)));

    // Destroying some other space is an error and changes nothing.
    s.on_data(&frames(&[ClientMessage::DestroyEntity {
        type_name: SPACE_TYPE_NAME.to_string(),
        entity_id: eid(6),
    }]))
    .unwrap();
    assert!(s.space().is_some());
    assert_eq!(s.stats().apply_errors, 1);

    s.on_data(&frames(&[ClientMessage::DestroyEntity {
        type_name: SPACE_TYPE_NAME.to_string(),
        entity_id: eid(5),
    }]))
    .unwrap();
    assert!(s.space().is_none());
    assert_eq!(
        s.presentation_mut().take(),
        vec![
            PresentationEvent::EnterSpace(eid(5)),
            PresentationEvent::LeaveSpace(eid(5))
        ]
    );
}

#[test]
fn client_id_is_recorded() {
    let mut s = session();
    let id = ClientId::new([b'z'; 16]);
    s.on_data(&frames(&[ClientMessage::SetClientId(id)])).unwrap();
    assert_eq!(s.client_id(), Some(&id));
}

#[test]
fn unknown_message_types_are_skipped() {
    let mut s = session();
    let mut bytes = raw_frame(&[0xf2, 0x03, 1, 2, 3, 4, 5]);
    bytes.extend(raw_frame(&[0xff, 0xff]));
    bytes.extend(frames(&[create("Avatar", eid(1), false, json!({}))]));

    s.on_data(&bytes).expect("Not fatal");
    assert_eq!(s.registry().len(), 1);
    assert_eq!(s.stats().decode_errors, 2);
    assert_eq!(s.stats().frames_applied, 1);
}

#[test]
fn close_resets_everything() {
    let mut s = session();
    let mut bytes = frames(&[
        create(SPACE_TYPE_NAME, eid(0), false, json!({"_K": 1})),
        create("Avatar", eid(1), true, json!({})),
        ClientMessage::SetClientId(gate_client_id()),
    ]);
    let next = frames(&[create("Avatar", eid(2), false, json!({}))]);
    bytes.extend(&next[..5]);
    s.on_data(&bytes).unwrap();
    assert!(s.buffered_bytes() > 0);

    s.on_close();
    assert!(s.registry().is_empty());
    assert!(s.player().is_none());
    assert!(s.space().is_none());
    assert!(s.client_id().is_none());
    assert_eq!(s.buffered_bytes(), 0);

    // The half frame from before is gone; a new connection starts clean.
    s.on_data(&next).unwrap();
    assert_eq!(s.registry().len(), 1);
    assert!(s.registry().contains(&eid(2)));
}

#[test]
fn oversized_frame_is_fatal() {
    let mut s = session_with(
        SessionConfigBuilder::default()
            .max_frame_len(Some(128))
            .build()
            .unwrap(),
    );
    s.on_data(&frames(&[create("Avatar", eid(1), false, json!({}))]))
        .unwrap();

    let mut bytes = 1000u32.to_le_bytes().to_vec();
    bytes.extend([0; 16]);
    assert!(s.on_data(&bytes).is_err());
    assert!(s.registry().is_empty());
    assert_eq!(s.buffered_bytes(), 0);
}

#[test]
fn outgoing_messages_are_framed_in_order() {
    let mut s = session();
    s.call_server(eid(1), "Move", vec![json!(1), json!("north")])
        .unwrap();
    s.sync_position_yaw(eid(1), Vec3::new(1.0, 2.0, 3.0), 0.5)
        .unwrap();
    s.heartbeat().unwrap();

    assert_eq!(
        sent(s.transport()),
        vec![
            ServerMessage::CallEntityMethod {
                entity_id: eid(1),
                method: "Move".to_string(),
                args: vec![json!(1), json!("north")],
            },
            ServerMessage::SyncPositionYaw {
                entity_id: eid(1),
                position: Vec3::new(1.0, 2.0, 3.0),
                yaw: 0.5,
            },
            ServerMessage::Heartbeat,
        ]
    );
}

/// A connection whose write side can be broken on demand.
#[derive(Default)]
struct FlakyTransport {
    broken: bool,
    sent: Vec<u8>,
}

impl Transport for FlakyTransport {
    fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        if self.broken {
            anyhow::bail!("Connection reset by peer");
        }
        self.sent.extend_from_slice(bytes);
        Ok(())
    }
}

#[test]
fn failed_login_send_drops_the_connection() {
    let mut s = Session::new(
        SessionConfigBuilder::default()
            .credentials(Some(Credentials::new("test1", "123456")))
            .build()
            .unwrap(),
        FlakyTransport {
            broken: true,
            ..Default::default()
        },
        RecordingPresentation::default(),
    );

    let mut bytes = frames(&[create("Account", eid(0), true, json!({}))]);
    let next = frames(&[create("Avatar", eid(1), false, json!({}))]);
    bytes.extend(&next[..next.len() / 2]);

    assert!(s.on_data(&bytes).is_err());
    assert!(s.registry().is_empty());
    assert!(s.player().is_none());
    assert_eq!(s.buffered_bytes(), 0);
    assert!(s.transport().sent.is_empty());
}

#[test]
fn failed_send_is_not_resent() {
    let mut s = Session::new(
        SessionConfig::default(),
        FlakyTransport::default(),
        RecordingPresentation::default(),
    );
    s.on_data(&frames(&[create("Avatar", eid(1), true, json!({}))]))
        .unwrap();

    s.transport_mut().broken = true;
    assert!(s.call_server(eid(1), "Move", vec![json!(1)]).is_err());
    assert!(s.heartbeat().is_err());

    // The mirror survives a failed send from the caller's side.
    assert_eq!(s.player().map(|p| p.id()), Some(eid(1)));

    s.transport_mut().broken = false;
    s.heartbeat().unwrap();
    assert_eq!(sent(&s.transport().sent), vec![ServerMessage::Heartbeat]);
}

fn stream() -> Vec<u8> {
    frames(&[
        create(SPACE_TYPE_NAME, eid(0), false, json!({"_K": 1})),
        create("Avatar", eid(1), true, json!({"hp": 3})),
        create("Monster", eid(2), false, json!({"bag": []})),
        ClientMessage::ListAttrAppend {
            entity_id: eid(2),
            path: vec![json!("bag")],
            value: json!({"gold": 5}),
        },
        ClientMessage::SyncPositionYaw(vec![EntitySync {
            entity_id: eid(2),
            position: Vec3::new(4.0, 5.0, 6.0),
            yaw: 2.0,
        }]),
        ClientMessage::DestroyEntity {
            type_name: "Avatar".to_string(),
            entity_id: eid(1),
        },
    ])
}

proptest! {
    /// However the stream is split, the session sees the same frames and ends in the same state.
    #[test]
    fn fragmentation_invariance(splits in prop::collection::vec(1usize..40, 1..16)) {
        let bytes = stream();

        let mut whole = session();
        whole.on_data(&bytes).expect("Should apply");

        let mut split = session();
        let mut rest = &bytes[..];
        let mut sizes = splits.iter().cycle();
        while !rest.is_empty() {
            let n = (*sizes.next().unwrap()).min(rest.len());
            split.on_data(&rest[..n]).expect("Should apply");
            rest = &rest[n..];
        }

        prop_assert_eq!(split.stats(), whole.stats());
        prop_assert_eq!(&split.presentation().events, &whole.presentation().events);
        prop_assert_eq!(split.registry().len(), 1);
        let (a, b) = (
            split.registry().lookup(&eid(2)).unwrap(),
            whole.registry().lookup(&eid(2)).unwrap(),
        );
        prop_assert_eq!(a, b);
    }
}
