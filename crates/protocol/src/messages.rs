//! Messages the gate sends to the client, and how each one is laid out after the common header.
use serde_json::{Map, Value};

use mirror_wire::{ClientId, EntityId, MessageType, Reader, Writer};

use crate::{DataCodec, DataCodecTrait, ProtocolError, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateEntity {
    pub is_player: bool,
    pub entity_id: EntityId,
    pub type_name: String,
    pub position: Vec3,
    pub yaw: f32,
    /// The attributes the server lets this client see.  Not interpreted at this layer.
    pub client_data: Map<String, Value>,
}

/// One entry of a [ClientMessage::SyncPositionYaw] batch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EntitySync {
    pub entity_id: EntityId,
    pub position: Vec3,
    pub yaw: f32,
}

/// Attribute paths are leaf-first: the last element names the attribute on the entity, the first names the
/// container which is changing.  Map keys are strings, list indices are integers.
pub type AttrPath = Vec<Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    CreateEntity(CreateEntity),
    DestroyEntity {
        type_name: String,
        entity_id: EntityId,
    },
    MapAttrChange {
        entity_id: EntityId,
        path: AttrPath,
        key: String,
        value: Value,
    },
    MapAttrDel {
        entity_id: EntityId,
        path: AttrPath,
        key: String,
    },
    ListAttrChange {
        entity_id: EntityId,
        path: AttrPath,
        index: u32,
        value: Value,
    },
    ListAttrPop {
        entity_id: EntityId,
        path: AttrPath,
    },
    ListAttrAppend {
        entity_id: EntityId,
        path: AttrPath,
        value: Value,
    },
    CallEntityMethod {
        entity_id: EntityId,
        method: String,
        args: Vec<Value>,
    },
    /// A call addressed to every client whose filter property matches.  The gate has already done the matching, so
    /// the filter itself is only kept for logging.
    CallFilteredClients {
        op: u8,
        key: String,
        value: String,
        method: String,
        args: Vec<Value>,
    },
    SyncPositionYaw(Vec<EntitySync>),
    SetClientId(ClientId),
}

fn read_vec3(r: &mut Reader) -> Result<Vec3> {
    Ok(Vec3 {
        x: r.read_f32()?,
        y: r.read_f32()?,
        z: r.read_f32()?,
    })
}

fn put_vec3(w: &mut Writer, v: &Vec3) {
    w.put_f32(v.x);
    w.put_f32(v.y);
    w.put_f32(v.z);
}

pub(crate) fn read_data(r: &mut Reader, codec: &DataCodec, field: &'static str) -> Result<Value> {
    let bytes = r.read_var_bytes()?;
    codec
        .decode(bytes)
        .map_err(|source| ProtocolError::DataCodec { field, source })
}

pub(crate) fn put_data(
    w: &mut Writer,
    codec: &DataCodec,
    field: &'static str,
    value: &Value,
) -> Result<()> {
    let bytes = codec
        .encode(value)
        .map_err(|source| ProtocolError::DataCodec { field, source })?;
    w.put_var_bytes(&bytes)?;
    Ok(())
}

/// A nil map is sent for entities with no client-visible attributes.
fn read_map(r: &mut Reader, codec: &DataCodec, field: &'static str) -> Result<Map<String, Value>> {
    match read_data(r, codec, field)? {
        Value::Object(m) => Ok(m),
        Value::Null => Ok(Map::new()),
        _ => Err(ProtocolError::UnexpectedData {
            field,
            expected: "a map",
        }),
    }
}

fn read_path(r: &mut Reader, codec: &DataCodec) -> Result<AttrPath> {
    match read_data(r, codec, "attribute path")? {
        Value::Array(p) => Ok(p),
        Value::Null => Ok(vec![]),
        _ => Err(ProtocolError::UnexpectedData {
            field: "attribute path",
            expected: "a list",
        }),
    }
}

pub(crate) fn read_arg_values(r: &mut Reader, codec: &DataCodec) -> Result<Vec<Value>> {
    r.read_args()?
        .into_iter()
        .map(|a| {
            codec.decode(a).map_err(|source| ProtocolError::DataCodec {
                field: "method argument",
                source,
            })
        })
        .collect()
}

pub(crate) fn put_arg_values(w: &mut Writer, codec: &DataCodec, args: &[Value]) -> Result<()> {
    let encoded = args
        .iter()
        .map(|a| {
            codec.encode(a).map_err(|source| ProtocolError::DataCodec {
                field: "method argument",
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    w.put_args(&encoded)?;
    Ok(())
}

pub fn decode_create_entity(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let is_player = r.read_bool()?;
    let entity_id = r.read_entity_id()?;
    let type_name = r.read_var_string()?;
    let position = read_vec3(r)?;
    let yaw = r.read_f32()?;
    let client_data = read_map(r, codec, "client data")?;
    Ok(ClientMessage::CreateEntity(CreateEntity {
        is_player,
        entity_id,
        type_name,
        position,
        yaw,
        client_data,
    }))
}

pub fn decode_destroy_entity(r: &mut Reader, _codec: &DataCodec) -> Result<ClientMessage> {
    let type_name = r.read_var_string()?;
    let entity_id = r.read_entity_id()?;
    Ok(ClientMessage::DestroyEntity {
        type_name,
        entity_id,
    })
}

pub fn decode_map_attr_change(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let path = read_path(r, codec)?;
    let key = r.read_var_string()?;
    let value = read_data(r, codec, "attribute value")?;
    Ok(ClientMessage::MapAttrChange {
        entity_id,
        path,
        key,
        value,
    })
}

pub fn decode_map_attr_del(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let path = read_path(r, codec)?;
    let key = r.read_var_string()?;
    Ok(ClientMessage::MapAttrDel {
        entity_id,
        path,
        key,
    })
}

pub fn decode_list_attr_change(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let path = read_path(r, codec)?;
    let index = r.read_u32()?;
    let value = read_data(r, codec, "attribute value")?;
    Ok(ClientMessage::ListAttrChange {
        entity_id,
        path,
        index,
        value,
    })
}

pub fn decode_list_attr_pop(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let path = read_path(r, codec)?;
    Ok(ClientMessage::ListAttrPop { entity_id, path })
}

pub fn decode_list_attr_append(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let path = read_path(r, codec)?;
    let value = read_data(r, codec, "attribute value")?;
    Ok(ClientMessage::ListAttrAppend {
        entity_id,
        path,
        value,
    })
}

pub fn decode_call_entity_method(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let entity_id = r.read_entity_id()?;
    let method = r.read_var_string()?;
    let args = read_arg_values(r, codec)?;
    Ok(ClientMessage::CallEntityMethod {
        entity_id,
        method,
        args,
    })
}

pub fn decode_call_filtered_clients(r: &mut Reader, codec: &DataCodec) -> Result<ClientMessage> {
    let op = r.read_u8()?;
    let key = r.read_var_string()?;
    let value = r.read_var_string()?;
    let method = r.read_var_string()?;
    let args = read_arg_values(r, codec)?;
    Ok(ClientMessage::CallFilteredClients {
        op,
        key,
        value,
        method,
        args,
    })
}

/// The batch has no count: entries run to the end of the frame.
pub fn decode_sync_position_yaw(r: &mut Reader, _codec: &DataCodec) -> Result<ClientMessage> {
    let mut entries = vec![];
    while r.has_remaining() {
        let entity_id = r.read_entity_id()?;
        let position = read_vec3(r)?;
        let yaw = r.read_f32()?;
        entries.push(EntitySync {
            entity_id,
            position,
            yaw,
        });
    }
    Ok(ClientMessage::SyncPositionYaw(entries))
}

pub fn decode_set_client_id(r: &mut Reader, _codec: &DataCodec) -> Result<ClientMessage> {
    Ok(ClientMessage::SetClientId(r.read_client_id()?))
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ClientMessage::CreateEntity(_) => MessageType::CreateEntityOnClient,
            ClientMessage::DestroyEntity { .. } => MessageType::DestroyEntityOnClient,
            ClientMessage::MapAttrChange { .. } => MessageType::NotifyMapAttrChangeOnClient,
            ClientMessage::MapAttrDel { .. } => MessageType::NotifyMapAttrDelOnClient,
            ClientMessage::ListAttrChange { .. } => MessageType::NotifyListAttrChangeOnClient,
            ClientMessage::ListAttrPop { .. } => MessageType::NotifyListAttrPopOnClient,
            ClientMessage::ListAttrAppend { .. } => MessageType::NotifyListAttrAppendOnClient,
            ClientMessage::CallEntityMethod { .. } => MessageType::CallEntityMethodOnClient,
            ClientMessage::CallFilteredClients { .. } => MessageType::CallFilteredClients,
            ClientMessage::SyncPositionYaw(_) => MessageType::SyncPositionYawOnClients,
            ClientMessage::SetClientId(_) => MessageType::SetClientClientId,
        }
    }

    /// Encode this message as the gate would, including the routing prefix for gate-service messages.
    ///
    /// The client never sends these; this exists for test harnesses and tooling which stand in for a server.
    pub fn encode(&self, codec: &DataCodec, client_id: &ClientId) -> Result<Vec<u8>> {
        let msg_type = self.message_type();
        let mut w = Writer::new();
        w.put_u16(msg_type.as_u16());
        if msg_type.has_routing_prefix() {
            w.put_u16(0);
            w.put_client_id(client_id);
        }

        match self {
            ClientMessage::CreateEntity(c) => {
                w.put_bool(c.is_player);
                w.put_entity_id(&c.entity_id);
                w.put_var_str(&c.type_name)?;
                put_vec3(&mut w, &c.position);
                w.put_f32(c.yaw);
                put_data(
                    &mut w,
                    codec,
                    "client data",
                    &Value::Object(c.client_data.clone()),
                )?;
            }
            ClientMessage::DestroyEntity {
                type_name,
                entity_id,
            } => {
                w.put_var_str(type_name)?;
                w.put_entity_id(entity_id);
            }
            ClientMessage::MapAttrChange {
                entity_id,
                path,
                key,
                value,
            } => {
                w.put_entity_id(entity_id);
                put_data(&mut w, codec, "attribute path", &Value::Array(path.clone()))?;
                w.put_var_str(key)?;
                put_data(&mut w, codec, "attribute value", value)?;
            }
            ClientMessage::MapAttrDel {
                entity_id,
                path,
                key,
            } => {
                w.put_entity_id(entity_id);
                put_data(&mut w, codec, "attribute path", &Value::Array(path.clone()))?;
                w.put_var_str(key)?;
            }
            ClientMessage::ListAttrChange {
                entity_id,
                path,
                index,
                value,
            } => {
                w.put_entity_id(entity_id);
                put_data(&mut w, codec, "attribute path", &Value::Array(path.clone()))?;
                w.put_u32(*index);
                put_data(&mut w, codec, "attribute value", value)?;
            }
            ClientMessage::ListAttrPop { entity_id, path } => {
                w.put_entity_id(entity_id);
                put_data(&mut w, codec, "attribute path", &Value::Array(path.clone()))?;
            }
            ClientMessage::ListAttrAppend {
                entity_id,
                path,
                value,
            } => {
                w.put_entity_id(entity_id);
                put_data(&mut w, codec, "attribute path", &Value::Array(path.clone()))?;
                put_data(&mut w, codec, "attribute value", value)?;
            }
            ClientMessage::CallEntityMethod {
                entity_id,
                method,
                args,
            } => {
                w.put_entity_id(entity_id);
                w.put_var_str(method)?;
                put_arg_values(&mut w, codec, args)?;
            }
            ClientMessage::CallFilteredClients {
                op,
                key,
                value,
                method,
                args,
            } => {
                w.put_u8(*op);
                w.put_var_str(key)?;
                w.put_var_str(value)?;
                w.put_var_str(method)?;
                put_arg_values(&mut w, codec, args)?;
            }
            ClientMessage::SyncPositionYaw(entries) => {
                for e in entries {
                    w.put_entity_id(&e.entity_id);
                    put_vec3(&mut w, &e.position);
                    w.put_f32(e.yaw);
                }
            }
            ClientMessage::SetClientId(id) => w.put_client_id(id),
        }

        Ok(w.into_inner())
    }
}
