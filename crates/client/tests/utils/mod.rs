#![allow(dead_code)]
use serde_json::{Map, Value};

use mirror_client::*;
use mirror_framer::{Framer, Parser};
use mirror_protocol::{ClientMessage, CreateEntity, DataCodec, ServerMessage};

pub fn eid(n: u8) -> EntityId {
    let mut bytes = [b'0'; 16];
    bytes[15] = b'a' + n;
    EntityId::new(bytes)
}

pub fn gate_client_id() -> ClientId {
    ClientId::new([b'C'; 16])
}

pub fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        Value::Null => Map::new(),
        other => panic!("Not a map: {:?}", other),
    }
}

pub fn create(type_name: &str, id: EntityId, is_player: bool, client_data: Value) -> ClientMessage {
    ClientMessage::CreateEntity(CreateEntity {
        is_player,
        entity_id: id,
        type_name: type_name.to_string(),
        position: Vec3::new(1.0, 2.0, 3.0),
        yaw: 0.25,
        client_data: as_map(client_data),
    })
}

/// Encode and frame messages the way the gate would send them.
pub fn frames(messages: &[ClientMessage]) -> Vec<u8> {
    let mut framer = Framer::new(1024);
    for m in messages {
        let payload = m
            .encode(&DataCodec::default(), &gate_client_id())
            .expect("Should encode");
        framer.add_frame(&payload).expect("Should frame");
    }
    framer.get_data().to_vec()
}

/// Frame a raw payload.
pub fn raw_frame(payload: &[u8]) -> Vec<u8> {
    let mut framer = Framer::new(1024);
    framer.add_frame(payload).expect("Should frame");
    framer.get_data().to_vec()
}

/// Decode everything a session has sent to the server.
pub fn sent(bytes: &[u8]) -> Vec<ServerMessage> {
    let mut parser = Parser::new(None, 1024);
    let mut data = bytes;
    parser
        .feed(&mut data)
        .map(|f| {
            let f = f.expect("Should parse");
            ServerMessage::decode(&f, &DataCodec::default()).expect("Should decode")
        })
        .collect()
}

pub fn session_with(config: SessionConfig) -> Session<Vec<u8>, RecordingPresentation> {
    mirror_logging::log_for_tests();
    Session::new(config, vec![], RecordingPresentation::default())
}

pub fn session() -> Session<Vec<u8>, RecordingPresentation> {
    session_with(SessionConfig::default())
}
