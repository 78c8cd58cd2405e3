use anyhow::Result;
use log::*;
use serde_json::{Map, Value};

use mirror_framer::{Framer, Parser};
use mirror_protocol::{
    ClientId, ClientMessage, CreateEntity, Dispatcher, EntityId, EntitySync, ProtocolError, ServerMessage, Vec3,
};

use crate::attrs::{self, AttrPathError};
use crate::config::SessionConfig;
use crate::entity::{Entity, EntityHooks, HookContext, Outbox, Space, SPACE_TYPE_NAME};
use crate::presentation::Presentation;
use crate::registry::{EntityRegistry, RegistryError};
use crate::transport::Transport;

/// Why a decoded message couldn't be applied.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApplyError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("bad attribute path on {entity}: {source}")]
    AttrPath {
        entity: EntityId,
        #[source]
        source: AttrPathError,
    },

    #[error("no player to receive filtered call {0}")]
    NoPlayer(String),

    #[error("space {0} is not the current space")]
    UnknownSpace(EntityId),
}

/// Why a frame was dropped.  Never fatal to the connection.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrameError {
    #[error("decode failed: {0}")]
    Decode(#[from] ProtocolError),

    #[error("apply failed: {0}")]
    Apply(#[from] ApplyError),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_applied: u64,
    pub decode_errors: u64,
    pub apply_errors: u64,
}

/// One connection's worth of client state: the incoming frame parser, the entity mirror, and the outgoing framer.
///
/// The transport calls [Session::on_data] with each chunk as it arrives, in order, and [Session::on_close] or
/// [Session::on_error] when the connection ends.  Every frame completed by a chunk is decoded and applied before
/// `on_data` returns.  Frames which fail to decode or apply are logged and dropped without touching the mirror; only
/// a corrupt length prefix or a failed send of hook replies ends the connection.
pub struct Session<T, P = ()> {
    config: SessionConfig,
    parser: Parser,
    framer: Framer,
    dispatcher: Dispatcher,
    registry: EntityRegistry,
    player: Option<EntityId>,
    space: Option<Space>,
    client_id: Option<ClientId>,
    outbox: Outbox,
    stats: SessionStats,
    transport: T,
    presentation: P,
}

impl<T: Transport, P: Presentation> Session<T, P> {
    pub fn new(config: SessionConfig, transport: T, presentation: P) -> Session<T, P> {
        Session {
            parser: Parser::new(config.max_frame_len, config.buffer_cap),
            framer: Framer::new(config.buffer_cap),
            dispatcher: Dispatcher::new(config.data_codec, config.max_var_len),
            registry: EntityRegistry::new(),
            player: None,
            space: None,
            client_id: None,
            outbox: Outbox::default(),
            stats: SessionStats::default(),
            config,
            transport,
            presentation,
        }
    }

    /// Handle a chunk of bytes from the connection.
    ///
    /// Returns an error only if the connection can't continue, in which case the session has already been reset.
    pub fn on_data(&mut self, mut chunk: &[u8]) -> Result<()> {
        self.parser.push(&mut chunk);

        loop {
            let frame = match self.parser.next_frame() {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(e) => {
                    error!("Dropping connection: {}", e);
                    self.reset();
                    return Err(e.into());
                }
            };

            self.stats.frames_received += 1;
            match self.handle_frame(&frame) {
                Ok(()) => self.stats.frames_applied += 1,
                Err(e) => {
                    match &e {
                        FrameError::Decode(_) => self.stats.decode_errors += 1,
                        FrameError::Apply(_) => self.stats.apply_errors += 1,
                    }
                    match &e {
                        FrameError::Apply(ApplyError::NoPlayer(_)) => warn!("Dropping frame: {}", e),
                        _ => error!("Dropping frame: {}", e),
                    }
                }
            }
        }

        if let Err(e) = self.flush() {
            error!("Dropping connection: {}", e);
            self.reset();
            return Err(e);
        }
        Ok(())
    }

    /// Decode and apply one complete frame.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<(), FrameError> {
        let message = self.dispatcher.decode(frame)?;
        self.apply(message)?;
        Ok(())
    }

    pub fn on_close(&mut self) {
        info!("Connection closed");
        self.reset();
    }

    pub fn on_error(&mut self, err: &dyn std::fmt::Display) {
        error!("Connection error: {}", err);
        self.reset();
    }

    /// Drop everything learned from the connection.  Nothing survives into the next one.
    fn reset(&mut self) {
        debug!(
            "Resetting session with {} entities and {} buffered bytes",
            self.registry.len(),
            self.parser.contained_bytes()
        );
        self.parser.reset();
        self.framer.clear();
        self.registry.clear();
        self.player = None;
        self.space = None;
        self.client_id = None;
        self.outbox.clear();
    }

    fn apply(&mut self, message: ClientMessage) -> Result<(), ApplyError> {
        match message {
            ClientMessage::CreateEntity(c) if c.type_name == SPACE_TYPE_NAME => {
                self.create_space(c.entity_id, c.client_data);
                Ok(())
            }
            ClientMessage::CreateEntity(c) => self.create_entity(c),
            ClientMessage::DestroyEntity {
                type_name,
                entity_id,
            } if type_name == SPACE_TYPE_NAME => self.destroy_space(entity_id),
            ClientMessage::DestroyEntity { entity_id, .. } => self.destroy_entity(entity_id),
            ClientMessage::MapAttrChange {
                entity_id,
                path,
                key,
                value,
            } => self.change_attrs(entity_id, |a| attrs::set_map_attr(a, &path, &key, value)),
            ClientMessage::MapAttrDel { entity_id, path, key } => {
                self.change_attrs(entity_id, |a| attrs::del_map_attr(a, &path, &key))
            }
            ClientMessage::ListAttrChange {
                entity_id,
                path,
                index,
                value,
            } => self.change_attrs(entity_id, |a| attrs::set_list_attr(a, &path, index, value)),
            ClientMessage::ListAttrPop { entity_id, path } => {
                self.change_attrs(entity_id, |a| attrs::pop_list_attr(a, &path).map(|_| ()))
            }
            ClientMessage::ListAttrAppend {
                entity_id,
                path,
                value,
            } => self.change_attrs(entity_id, |a| attrs::append_list_attr(a, &path, value)),
            ClientMessage::CallEntityMethod {
                entity_id,
                method,
                args,
            } => self.call_method(entity_id, &method, &args),
            ClientMessage::CallFilteredClients {
                op,
                key,
                value,
                method,
                args,
            } => {
                let player = self.player.ok_or_else(|| ApplyError::NoPlayer(method.clone()))?;
                trace!("Filtered call {} (op={} {}={})", method, op, key, value);
                self.call_method(player, &method, &args)
            }
            ClientMessage::SyncPositionYaw(entries) => {
                self.sync_positions(&entries);
                Ok(())
            }
            ClientMessage::SetClientId(id) => {
                info!("Client id is now {}", id);
                self.client_id = Some(id);
                Ok(())
            }
        }
    }

    fn create_entity(&mut self, c: CreateEntity) -> Result<(), ApplyError> {
        let CreateEntity {
            is_player,
            entity_id,
            type_name,
            position,
            yaw,
            client_data,
        } = c;

        let mut entity = Entity::new(type_name, entity_id);
        entity.is_player = is_player;
        entity.position = position;
        entity.yaw = yaw;
        entity.attrs = client_data;

        let entity = self.registry.insert(entity)?;
        debug!("Created {}", entity);

        if is_player {
            if let Some(old) = self.player {
                error!("Player is already {}, replacing it with {}", old, entity_id);
            }
            self.player = Some(entity_id);
        }

        announce_created(
            &entity.behavior,
            entity,
            &mut self.presentation,
            &mut HookContext {
                credentials: self.config.credentials.as_ref(),
                outbox: &mut self.outbox,
            },
        );
        Ok(())
    }

    fn destroy_entity(&mut self, id: EntityId) -> Result<(), ApplyError> {
        let entity = self.registry.destroy(&id)?;
        debug!("Destroyed {}", entity);

        if self.player == Some(id) {
            self.player = None;
        }

        announce_destroyed(
            &entity.behavior,
            &entity,
            &mut self.presentation,
            &mut HookContext {
                credentials: self.config.credentials.as_ref(),
                outbox: &mut self.outbox,
            },
        );
        Ok(())
    }

    fn create_space(&mut self, id: EntityId, attrs: Map<String, Value>) {
        let space = Space::new(id, attrs);
        if let Some(old) = &self.space {
            error!("Entering {} while still in {}", space, old);
        }
        info!("Entering {}", space);
        self.presentation.on_enter_space(&space);
        self.space = Some(space);
    }

    fn destroy_space(&mut self, id: EntityId) -> Result<(), ApplyError> {
        match self.space.take() {
            Some(space) if space.id == id => {
                info!("Leaving {}", space);
                self.presentation.on_leave_space(&space);
                Ok(())
            }
            other => {
                self.space = other;
                Err(ApplyError::UnknownSpace(id))
            }
        }
    }

    fn change_attrs(
        &mut self,
        id: EntityId,
        change: impl FnOnce(&mut Map<String, Value>) -> Result<(), AttrPathError>,
    ) -> Result<(), ApplyError> {
        let entity = self.registry.lookup_mut(&id)?;
        change(&mut entity.attrs).map_err(|source| ApplyError::AttrPath { entity: id, source })?;
        self.presentation.on_attrs_changed(entity);
        Ok(())
    }

    fn call_method(&mut self, id: EntityId, method: &str, args: &[Value]) -> Result<(), ApplyError> {
        let entity = self.registry.lookup(&id)?;
        let handled = entity.behavior.call_method(
            entity,
            method,
            args,
            &mut HookContext {
                credentials: self.config.credentials.as_ref(),
                outbox: &mut self.outbox,
            },
        );
        if !handled {
            debug!("{} has no handler for {}", entity, method);
        }
        self.presentation.on_method_called(entity, method, args);
        Ok(())
    }

    /// Unknown entities are skipped one at a time; the rest of the batch still applies.
    fn sync_positions(&mut self, entries: &[EntitySync]) {
        for e in entries {
            match self.registry.lookup_mut(&e.entity_id) {
                Ok(entity) => {
                    entity.position = e.position;
                    entity.yaw = e.yaw;
                    self.presentation.on_entity_moved(entity);
                }
                Err(err) => warn!("Skipping position sync: {}", err),
            }
        }
    }

    /// Send whatever entity hooks queued up while applying frames, as one batch.
    ///
    /// The outbox and framer are empty afterwards whether or not the batch made it out.
    fn flush(&mut self) -> Result<()> {
        if self.outbox.is_empty() {
            return Ok(());
        }

        let res = match self.frame_outbox() {
            Ok(()) => self.transport.send(self.framer.get_data()),
            Err(e) => Err(e),
        };
        self.outbox.clear();
        self.framer.clear();
        res
    }

    fn frame_outbox(&mut self) -> Result<()> {
        for message in self.outbox.drain() {
            let payload = message.encode(self.dispatcher.codec())?;
            self.framer.add_frame(&payload)?;
        }
        Ok(())
    }

    fn send(&mut self, message: ServerMessage) -> Result<()> {
        self.outbox.push(message);
        self.flush()
    }

    /// Call a method on the server-side half of an entity.
    ///
    /// A failed send leaves the mirror as it was; dropping the connection is up to the caller.
    pub fn call_server(&mut self, entity_id: EntityId, method: &str, args: Vec<Value>) -> Result<()> {
        debug!("Calling {}.{} on the server", entity_id, method);
        self.send(ServerMessage::CallEntityMethod {
            entity_id,
            method: method.to_string(),
            args,
        })
    }

    pub fn sync_position_yaw(&mut self, entity_id: EntityId, position: Vec3, yaw: f32) -> Result<()> {
        self.send(ServerMessage::SyncPositionYaw {
            entity_id,
            position,
            yaw,
        })
    }

    pub fn heartbeat(&mut self) -> Result<()> {
        self.send(ServerMessage::Heartbeat)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The entity the server marked as ours, if it exists.
    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.registry.lookup(&id).ok())
    }

    pub fn space(&self) -> Option<&Space> {
        self.space.as_ref()
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Bytes of a partial frame waiting for the rest of it.
    pub fn buffered_bytes(&self) -> usize {
        self.parser.contained_bytes()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }
}

/// Tell the presentation layer about a new entity, then run the entity's own hook.
fn announce_created<P: Presentation, H: EntityHooks + ?Sized>(
    hooks: &H,
    entity: &Entity,
    presentation: &mut P,
    ctx: &mut HookContext,
) {
    presentation.on_entity_created(entity);
    hooks.on_created(entity, ctx);
}

fn announce_destroyed<P: Presentation, H: EntityHooks + ?Sized>(
    hooks: &H,
    entity: &Entity,
    presentation: &mut P,
    ctx: &mut HookContext,
) {
    presentation.on_entity_destroyed(entity);
    hooks.on_destroyed(entity, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    /// Records which side saw an entity first.
    #[derive(Clone, Default)]
    struct Order(Rc<RefCell<Vec<&'static str>>>);

    impl Presentation for Order {
        fn on_entity_created(&mut self, _entity: &Entity) {
            self.0.borrow_mut().push("presentation");
        }

        fn on_entity_destroyed(&mut self, _entity: &Entity) {
            self.0.borrow_mut().push("presentation");
        }
    }

    impl EntityHooks for Order {
        fn on_created(&self, _entity: &Entity, _ctx: &mut HookContext) {
            self.0.borrow_mut().push("hook");
        }

        fn on_destroyed(&self, _entity: &Entity, _ctx: &mut HookContext) {
            self.0.borrow_mut().push("hook");
        }
    }

    #[test]
    fn test_presentation_sees_entity_before_hooks() {
        let order = Order::default();
        let mut presentation = order.clone();
        let mut outbox = Outbox::default();
        let entity = Entity::new("Account", EntityId::new([1; 16]));
        let mut ctx = HookContext {
            credentials: None,
            outbox: &mut outbox,
        };

        announce_created(&order, &entity, &mut presentation, &mut ctx);
        assert_eq!(*order.0.borrow(), vec!["presentation", "hook"]);

        order.0.borrow_mut().clear();
        announce_destroyed(&order, &entity, &mut presentation, &mut ctx);
        assert_eq!(*order.0.borrow(), vec!["presentation", "hook"]);
    }
}
