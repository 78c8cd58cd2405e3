//! Messages the client sends to the gate.  None of these carry a routing prefix: the gate knows who sent them.
use serde_json::Value;

use mirror_wire::{EntityId, MessageType, Reader, Writer};

use crate::messages::{put_arg_values, read_arg_values, Vec3};
use crate::{DataCodec, ProtocolError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    CallEntityMethod {
        entity_id: EntityId,
        method: String,
        args: Vec<Value>,
    },
    SyncPositionYaw {
        entity_id: EntityId,
        position: Vec3,
        yaw: f32,
    },
    Heartbeat,
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::CallEntityMethod { .. } => MessageType::CallEntityMethodFromClient,
            ServerMessage::SyncPositionYaw { .. } => MessageType::SyncPositionYawFromClient,
            ServerMessage::Heartbeat => MessageType::HeartbeatFromClient,
        }
    }

    /// Encode the payload of one frame.
    pub fn encode(&self, codec: &DataCodec) -> Result<Vec<u8>> {
        let mut w = Writer::new();
        w.put_u16(self.message_type().as_u16());
        match self {
            ServerMessage::CallEntityMethod {
                entity_id,
                method,
                args,
            } => {
                w.put_entity_id(entity_id);
                w.put_var_str(method)?;
                put_arg_values(&mut w, codec, args)?;
            }
            ServerMessage::SyncPositionYaw {
                entity_id,
                position,
                yaw,
            } => {
                w.put_entity_id(entity_id);
                w.put_f32(position.x);
                w.put_f32(position.y);
                w.put_f32(position.z);
                w.put_f32(*yaw);
            }
            ServerMessage::Heartbeat => {}
        }
        Ok(w.into_inner())
    }

    /// Decode a payload produced by [ServerMessage::encode].  Used by tooling that stands in for the gate.
    pub fn decode(frame: &[u8], codec: &DataCodec) -> Result<ServerMessage> {
        let mut r = Reader::new(frame);
        let tag = r.read_u16()?;
        match MessageType::from_u16(tag) {
            Some(MessageType::CallEntityMethodFromClient) => Ok(ServerMessage::CallEntityMethod {
                entity_id: r.read_entity_id()?,
                method: r.read_var_string()?,
                args: read_arg_values(&mut r, codec)?,
            }),
            Some(MessageType::SyncPositionYawFromClient) => Ok(ServerMessage::SyncPositionYaw {
                entity_id: r.read_entity_id()?,
                position: Vec3 {
                    x: r.read_f32()?,
                    y: r.read_f32()?,
                    z: r.read_f32()?,
                },
                yaw: r.read_f32()?,
            }),
            Some(MessageType::HeartbeatFromClient) => Ok(ServerMessage::Heartbeat),
            _ => Err(ProtocolError::UnknownMessageType(tag)),
        }
    }
}
