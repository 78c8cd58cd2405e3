use log::*;
use serde_json::{Map, Value};

use mirror_protocol::{EntityId, ServerMessage, Vec3};

use crate::config::Credentials;

/// Type name the server gives to spaces.  Spaces are created with the same message as entities but aren't entities.
pub const SPACE_TYPE_NAME: &str = "__space__";

/// Attribute holding a space's kind.
pub const SPACE_KIND_ATTR: &str = "_K";

/// Messages produced by entity hooks, to be sent once the current frame has been applied.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<ServerMessage>,
}

impl Outbox {
    pub fn push(&mut self, message: ServerMessage) {
        self.messages.push(message);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, ServerMessage> {
        self.messages.drain(..)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// What hooks get to see and touch besides their own entity.
pub struct HookContext<'a> {
    pub credentials: Option<&'a Credentials>,
    pub outbox: &'a mut Outbox,
}

/// Per-type behavior of an entity.
#[enum_dispatch::enum_dispatch(EntityBehavior)]
pub trait EntityHooks {
    /// Called after the entity is in the registry and the presentation layer has been told about it.
    fn on_created(&self, _entity: &Entity, _ctx: &mut HookContext) {}

    /// Called after the entity has been removed from the registry.
    fn on_destroyed(&self, _entity: &Entity, _ctx: &mut HookContext) {}

    /// Handle a method the server called on this entity.  Returns whether this type knows the method.
    fn call_method(&self, _entity: &Entity, _method: &str, _args: &[Value], _ctx: &mut HookContext) -> bool {
        false
    }
}

/// The entity which owns a player's login.  Logs in as soon as it exists.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Account;

/// The entity a logged in player controls.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Avatar;

/// Everything else.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Generic;

impl EntityHooks for Account {
    fn on_created(&self, entity: &Entity, ctx: &mut HookContext) {
        let creds = match ctx.credentials {
            Some(c) => c,
            None => {
                info!("{} created but no credentials are configured; not logging in", entity);
                return;
            }
        };

        info!("{} created, logging in as {}", entity, creds.username);
        ctx.outbox.push(ServerMessage::CallEntityMethod {
            entity_id: entity.id(),
            method: "Login".to_string(),
            args: vec![
                Value::String(creds.username.clone()),
                Value::String(creds.password.clone()),
            ],
        });
    }

    fn call_method(&self, entity: &Entity, method: &str, args: &[Value], _ctx: &mut HookContext) -> bool {
        match method {
            "OnLogin" => {
                let ok = args.first().and_then(Value::as_bool).unwrap_or(false);
                if ok {
                    info!("{} login succeeded", entity);
                } else {
                    warn!("{} login failed", entity);
                }
                true
            }
            _ => false,
        }
    }
}

impl EntityHooks for Avatar {
    fn on_created(&self, entity: &Entity, _ctx: &mut HookContext) {
        debug!("{} created at {:?}", entity, entity.position);
    }
}

impl EntityHooks for Generic {}

#[enum_dispatch::enum_dispatch]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntityBehavior {
    Account(Account),
    Avatar(Avatar),
    Generic(Generic),
}

impl EntityBehavior {
    /// Pick the behavior for a type name.  Done once, when the entity is created.
    pub fn for_type(type_name: &str) -> EntityBehavior {
        match type_name {
            "Account" => Account.into(),
            "Avatar" => Avatar.into(),
            _ => Generic.into(),
        }
    }
}

/// The local mirror of one server entity.
///
/// The type name and id are fixed at creation: the registry is keyed by the id.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    type_name: String,
    id: EntityId,
    pub is_player: bool,
    pub position: Vec3,
    pub yaw: f32,
    pub attrs: Map<String, Value>,
    pub behavior: EntityBehavior,
}

impl Entity {
    pub fn new(type_name: impl Into<String>, id: EntityId) -> Entity {
        let type_name = type_name.into();
        Entity {
            behavior: EntityBehavior::for_type(&type_name),
            type_name,
            id,
            is_player: false,
            position: Vec3::default(),
            yaw: 0.0,
            attrs: Map::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>", self.type_name, self.id)
    }
}

/// The space the player is currently in.
#[derive(Clone, Debug, PartialEq)]
pub struct Space {
    pub id: EntityId,
    pub kind: i64,
    pub attrs: Map<String, Value>,
}

impl Space {
    /// A missing or non-integer kind is treated as kind 0, the nil space.
    pub fn new(id: EntityId, attrs: Map<String, Value>) -> Space {
        let kind = attrs
            .get(SPACE_KIND_ATTR)
            .and_then(|k| k.as_i64().or_else(|| k.as_f64().map(|f| f as i64)))
            .unwrap_or(0);
        Space { id, kind, attrs }
    }
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Space<{}|{}>", self.kind, self.id)
    }
}
