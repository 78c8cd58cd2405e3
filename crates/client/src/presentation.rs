//! The seam between the mirror and whatever draws it.
use serde_json::Value;

use mirror_protocol::{EntityId, Vec3};

use crate::entity::{Entity, Space};

/// Notified after each change has been applied to the mirror.  Every method defaults to doing nothing.
pub trait Presentation {
    fn on_entity_created(&mut self, _entity: &Entity) {}

    fn on_entity_destroyed(&mut self, _entity: &Entity) {}

    fn on_entity_moved(&mut self, _entity: &Entity) {}

    fn on_attrs_changed(&mut self, _entity: &Entity) {}

    fn on_method_called(&mut self, _entity: &Entity, _method: &str, _args: &[Value]) {}

    fn on_enter_space(&mut self, _space: &Space) {}

    fn on_leave_space(&mut self, _space: &Space) {}
}

impl Presentation for () {}

#[derive(Clone, Debug, PartialEq)]
pub enum PresentationEvent {
    EntityCreated { id: EntityId, type_name: String },
    EntityDestroyed(EntityId),
    EntityMoved { id: EntityId, position: Vec3, yaw: f32 },
    AttrsChanged(EntityId),
    MethodCalled { id: EntityId, method: String, args: Vec<Value> },
    EnterSpace(EntityId),
    LeaveSpace(EntityId),
}

/// Records every notification, in order.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub events: Vec<PresentationEvent>,
}

impl RecordingPresentation {
    pub fn take(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Presentation for RecordingPresentation {
    fn on_entity_created(&mut self, entity: &Entity) {
        self.events.push(PresentationEvent::EntityCreated {
            id: entity.id(),
            type_name: entity.type_name().to_string(),
        });
    }

    fn on_entity_destroyed(&mut self, entity: &Entity) {
        self.events.push(PresentationEvent::EntityDestroyed(entity.id()));
    }

    fn on_entity_moved(&mut self, entity: &Entity) {
        self.events.push(PresentationEvent::EntityMoved {
            id: entity.id(),
            position: entity.position,
            yaw: entity.yaw,
        });
    }

    fn on_attrs_changed(&mut self, entity: &Entity) {
        self.events.push(PresentationEvent::AttrsChanged(entity.id()));
    }

    fn on_method_called(&mut self, entity: &Entity, method: &str, args: &[Value]) {
        self.events.push(PresentationEvent::MethodCalled {
            id: entity.id(),
            method: method.to_string(),
            args: args.to_vec(),
        });
    }

    fn on_enter_space(&mut self, space: &Space) {
        self.events.push(PresentationEvent::EnterSpace(space.id));
    }

    fn on_leave_space(&mut self, space: &Space) {
        self.events.push(PresentationEvent::LeaveSpace(space.id));
    }
}
