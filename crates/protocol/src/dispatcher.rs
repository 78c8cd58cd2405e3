use std::collections::HashMap;

use log::*;

use mirror_wire::{MessageBand, MessageType, Reader};

use crate::messages::*;
use crate::{ClientId, DataCodec, ProtocolError, Result};

/// Decodes the fields of one message type, positioned just after the common header.
pub type DecodeFn = fn(&mut Reader<'_>, &DataCodec) -> Result<ClientMessage>;

/// Maps message tags to the routine which decodes them.
///
/// This is deliberately open: a new message type is a new row, not an edit to a central match.  Tags with no row are
/// rejected, since a payload we don't understand can't be skipped field by field.
#[derive(Clone)]
pub struct DecoderTable {
    decoders: HashMap<u16, DecodeFn>,
}

impl DecoderTable {
    pub fn empty() -> DecoderTable {
        DecoderTable {
            decoders: HashMap::new(),
        }
    }

    /// Every message type the gate sends to clients.
    pub fn standard() -> DecoderTable {
        let mut table = DecoderTable::empty();
        let rows: [(MessageType, DecodeFn); 11] = [
            (MessageType::CreateEntityOnClient, decode_create_entity),
            (MessageType::DestroyEntityOnClient, decode_destroy_entity),
            (MessageType::NotifyMapAttrChangeOnClient, decode_map_attr_change),
            (MessageType::NotifyMapAttrDelOnClient, decode_map_attr_del),
            (MessageType::NotifyListAttrChangeOnClient, decode_list_attr_change),
            (MessageType::NotifyListAttrPopOnClient, decode_list_attr_pop),
            (MessageType::NotifyListAttrAppendOnClient, decode_list_attr_append),
            (MessageType::CallEntityMethodOnClient, decode_call_entity_method),
            (MessageType::CallFilteredClients, decode_call_filtered_clients),
            (MessageType::SyncPositionYawOnClients, decode_sync_position_yaw),
            (MessageType::SetClientClientId, decode_set_client_id),
        ];
        for (t, f) in rows {
            table.register(t.as_u16(), f);
        }
        table
    }

    /// Add or replace the decoder for `tag`, returning the old one.
    pub fn register(&mut self, tag: u16, decoder: DecodeFn) -> Option<DecodeFn> {
        self.decoders.insert(tag, decoder)
    }

    pub fn get(&self, tag: u16) -> Option<DecodeFn> {
        self.decoders.get(&tag).copied()
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.decoders.contains_key(&tag)
    }
}

impl Default for DecoderTable {
    fn default() -> Self {
        DecoderTable::standard()
    }
}

/// The common header in front of every message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    pub tag: u16,

    /// Present on gate-service messages only.  Consumed so the fields line up; nothing on the client uses it.
    pub routing: Option<(u16, ClientId)>,
}

/// Turns complete frames into [ClientMessage]s.
///
/// Decoding is pure: a frame which fails to decode has no effect anywhere, and the next frame decodes as if the bad
/// one had never arrived.
#[derive(Clone)]
pub struct Dispatcher {
    table: DecoderTable,
    codec: DataCodec,
    max_var_len: Option<u32>,
}

impl Dispatcher {
    pub fn new(codec: DataCodec, max_var_len: Option<u32>) -> Dispatcher {
        Dispatcher::with_table(DecoderTable::standard(), codec, max_var_len)
    }

    pub fn with_table(table: DecoderTable, codec: DataCodec, max_var_len: Option<u32>) -> Dispatcher {
        Dispatcher {
            table,
            codec,
            max_var_len,
        }
    }

    pub fn table_mut(&mut self) -> &mut DecoderTable {
        &mut self.table
    }

    pub fn codec(&self) -> &DataCodec {
        &self.codec
    }

    /// Read the tag and, if the tag's band calls for it, the routing prefix.
    pub fn decode_header(reader: &mut Reader<'_>) -> Result<MessageHeader> {
        let tag = reader.read_u16()?;
        let routing = match MessageBand::of(tag) {
            Some(b) if b.has_routing_prefix() => {
                let reserved = reader.read_u16()?;
                let client_id = reader.read_client_id()?;
                Some((reserved, client_id))
            }
            _ => None,
        };
        Ok(MessageHeader { tag, routing })
    }

    pub fn decode(&self, frame: &[u8]) -> Result<ClientMessage> {
        let mut reader = Reader::new(frame).with_max_var_len(self.max_var_len);
        let mut probe = reader;
        let tag = probe.read_u16()?;
        let decoder = self
            .table
            .get(tag)
            .ok_or(ProtocolError::UnknownMessageType(tag))?;

        let header = Dispatcher::decode_header(&mut reader)?;
        let message = decoder(&mut reader, &self.codec)?;
        if reader.has_remaining() {
            debug!(
                "Ignoring {} trailing bytes after message {}",
                reader.remaining(),
                header.tag
            );
        }

        trace!("Decoded {:?}", message.message_type());
        Ok(message)
    }
}
