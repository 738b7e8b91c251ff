use std::collections::{hash_map, HashMap};

use crate::model::{symbol_key, Enum, EnumId, Message, MessageId};

/// All messages and enums of one generation run, keyed by `<module>_<name>`.
///
/// Messages are stored in an arena in the order they were declared. Keys are not unique
/// across nesting levels: a name collision is recorded by incrementing the duplicate count of
/// every message sharing the key, and lookups refuse to return duplicated messages.
#[derive(Debug, Default)]
pub struct SymbolTable {
    messages: Vec<Message>,
    enums: Vec<Enum>,
    keys: HashMap<String, Vec<MessageId>>,
    enum_keys: HashMap<String, EnumId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn add_message(&mut self, mut message: Message) -> MessageId {
        let id = MessageId(self.messages.len() as u32);
        match self.keys.entry(message.key()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(vec![id]);
            }
            hash_map::Entry::Occupied(mut entry) => {
                tracing::debug!(key = entry.key().as_str(), "duplicate message name");
                for &existing in entry.get() {
                    self.messages[existing.index()].dup_count += 1;
                }
                message.dup_count = entry.get().len() as u32;
                entry.get_mut().push(id);
            }
        }
        self.messages.push(message);
        id
    }

    pub(crate) fn add_enum(&mut self, enu: Enum) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enum_keys
            .entry(symbol_key(&enu.module, &enu.name))
            .or_insert(id);
        self.enums.push(enu);
        id
    }

    /// Gets a message by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this table.
    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.index()]
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> &mut Message {
        &mut self.messages[id.index()]
    }

    /// Gets an enum by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this table.
    pub fn enum_(&self, id: EnumId) -> &Enum {
        &self.enums[id.index()]
    }

    /// Looks up a message by its module-qualified key.
    ///
    /// Returns `None` if the key is unknown or shared by more than one message.
    pub fn get(&self, key: &str) -> Option<MessageId> {
        match self.keys.get(key)?.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Returns every message registered under a key, including duplicates.
    pub fn get_all(&self, key: &str) -> &[MessageId] {
        self.keys.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Looks up an enum by its module-qualified key.
    pub fn get_enum(&self, key: &str) -> Option<EnumId> {
        self.enum_keys.get(key).copied()
    }

    /// All messages, in declaration order.
    pub fn messages(
        &self,
    ) -> impl DoubleEndedIterator<Item = (MessageId, &Message)> + ExactSizeIterator {
        self.messages
            .iter()
            .enumerate()
            .map(|(idx, message)| (MessageId(idx as u32), message))
    }

    /// All enums, in declaration order.
    pub fn enums(&self) -> impl DoubleEndedIterator<Item = (EnumId, &Enum)> + ExactSizeIterator {
        self.enums
            .iter()
            .enumerate()
            .map(|(idx, enu)| (EnumId(idx as u32), enu))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
