/// Message types understood by the client, in both directions.
///
/// Numeric tags fall into bands:
///
/// - 1000..=1499: gate-service messages.  These are routed through the gate on behalf of one client, and carry a
///   `[u16 reserved][ClientId]` prefix after the tag.
/// - 1501..=1998: broadcast messages addressed to many clients at once, with no prefix.
/// - 2001 and up: sent directly between gate and client, with no prefix.
/// - Below 1000: game-to-dispatcher messages.  The client only ever sends a couple of these.
///
/// 1500, 1999 and 2000 terminate bands and are never valid tags.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u16)]
pub enum MessageType {
    CallEntityMethodFromClient = 12,
    SyncPositionYawFromClient = 13,

    CreateEntityOnClient = 1002,
    DestroyEntityOnClient = 1003,
    NotifyMapAttrChangeOnClient = 1004,
    NotifyMapAttrDelOnClient = 1005,
    NotifyListAttrChangeOnClient = 1006,
    NotifyListAttrPopOnClient = 1007,
    NotifyListAttrAppendOnClient = 1008,
    CallEntityMethodOnClient = 1009,

    CallFilteredClients = 1501,
    SyncPositionYawOnClients = 1502,

    SetClientClientId = 2001,
    HeartbeatFromClient = 2004,
}

/// Every message type, so that [MessageType::from_u16] can't drift from the enum.
static MESSAGE_TYPE_TABLE: [MessageType; 14] = [
    MessageType::CallEntityMethodFromClient,
    MessageType::SyncPositionYawFromClient,
    MessageType::CreateEntityOnClient,
    MessageType::DestroyEntityOnClient,
    MessageType::NotifyMapAttrChangeOnClient,
    MessageType::NotifyMapAttrDelOnClient,
    MessageType::NotifyListAttrChangeOnClient,
    MessageType::NotifyListAttrPopOnClient,
    MessageType::NotifyListAttrAppendOnClient,
    MessageType::CallEntityMethodOnClient,
    MessageType::CallFilteredClients,
    MessageType::SyncPositionYawOnClients,
    MessageType::SetClientClientId,
    MessageType::HeartbeatFromClient,
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageBand {
    Internal,
    GateService,
    Broadcast,
    Direct,
}

impl MessageBand {
    /// Classify a raw tag.  Band terminators classify as `None`.
    pub fn of(tag: u16) -> Option<MessageBand> {
        match tag {
            0..=999 => Some(MessageBand::Internal),
            1000..=1499 => Some(MessageBand::GateService),
            1501..=1998 => Some(MessageBand::Broadcast),
            2001..=u16::MAX => Some(MessageBand::Direct),
            _ => None,
        }
    }

    /// Whether messages in this band carry the `[u16 reserved][ClientId]` routing prefix.
    pub fn has_routing_prefix(self) -> bool {
        self == MessageBand::GateService
    }
}

impl MessageType {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(tag: u16) -> Option<MessageType> {
        MESSAGE_TYPE_TABLE
            .iter()
            .copied()
            .find(|t| t.as_u16() == tag)
    }

    pub fn band(self) -> MessageBand {
        match MessageBand::of(self.as_u16()) {
            Some(b) => b,
            None => unreachable!("Message types are never band terminators"),
        }
    }

    pub fn has_routing_prefix(self) -> bool {
        self.band().has_routing_prefix()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.as_u16())
    }
}
