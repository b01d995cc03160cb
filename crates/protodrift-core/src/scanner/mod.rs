//! Unknown-field scanning.
//!
//! A decoded message keeps any field whose number is missing from the
//! decoding schema in its own unknown slot. Each nested message has its own
//! slot, so finding drift anywhere in a request means walking the whole tree
//! of reachable messages.
//!
//! ## Traversal Order
//!
//! The walk is depth-first and pre-order: a message is visited before any of
//! its children. Children are reached through
//!
//! 1. singular message (and group) fields,
//! 2. every element of a repeated message field, in sequence order,
//! 3. every value of a map field whose value type is a message.
//!
//! Fields are walked in the order prost-reflect yields them (ascending field
//! number), followed by any populated extension fields. Map iteration order
//! is unspecified. Scalar values, including scalar list elements and scalar
//! map values, never carry unknown data and are skipped.
//!
//! ## Example
//!
//! ```no_run
//! use prost_reflect::DynamicMessage;
//! use protodrift_core::scanner::{drop_unknown_fields, has_unknown_fields};
//!
//! fn sanitize(message: &mut DynamicMessage) {
//!     if has_unknown_fields(message) {
//!         drop_unknown_fields(message);
//!     }
//!     assert!(!has_unknown_fields(message));
//! }
//! ```

mod iter;

use prost_reflect::{DynamicMessage, ReflectMessage, Value};
use tracing::trace;

pub use iter::{unknown_messages, UnknownMessages};

/// Returns true if `message` or any message nested inside it has unknown fields.
///
/// Stops at the first message found.
pub fn has_unknown_fields(message: &DynamicMessage) -> bool {
    let mut found = false;
    for_each_unknown_field(message, |_| {
        found = true;
        false
    });
    found
}

/// Clears the unknown fields of `message` and of every message nested inside it.
pub fn drop_unknown_fields(message: &mut DynamicMessage) {
    for_each_unknown_field_mut(message, |msg| {
        let cleared = msg.take_unknown_fields().count();
        trace!(
            "Dropped {} unknown field(s) from {}",
            cleared,
            msg.descriptor().full_name()
        );
        true
    });
}

/// Calls `visitor` for every message in the tree that has unknown fields.
///
/// Returning `false` from the visitor stops the traversal. The return value
/// is `true` if the whole tree was walked and `false` if the visitor stopped
/// it early.
pub fn for_each_unknown_field<F>(message: &DynamicMessage, mut visitor: F) -> bool
where
    F: FnMut(&DynamicMessage) -> bool,
{
    visit_message(message, &mut visitor)
}

/// Mutable variant of [`for_each_unknown_field`].
///
/// The visitor may modify the message it is given, including its unknown
/// fields. Children are walked after the visitor returns, so changes it makes
/// to nested values are reflected in the rest of the walk.
pub fn for_each_unknown_field_mut<F>(message: &mut DynamicMessage, mut visitor: F) -> bool
where
    F: FnMut(&mut DynamicMessage) -> bool,
{
    visit_message_mut(message, &mut visitor)
}

fn visit_message<F>(message: &DynamicMessage, visitor: &mut F) -> bool
where
    F: FnMut(&DynamicMessage) -> bool,
{
    let has_unknown = message.unknown_fields().next().is_some();
    if has_unknown && !visitor(message) {
        return false;
    }
    let fields_done = message
        .fields()
        .all(|(_, value)| visit_value(value, visitor));
    fields_done
        && message
            .extensions()
            .all(|(_, value)| visit_value(value, visitor))
}

fn visit_value<F>(value: &Value, visitor: &mut F) -> bool
where
    F: FnMut(&DynamicMessage) -> bool,
{
    match value {
        Value::Message(message) => visit_message(message, visitor),
        Value::List(items) => items.iter().all(|item| visit_value(item, visitor)),
        Value::Map(entries) => entries.values().all(|entry| visit_value(entry, visitor)),
        _ => true,
    }
}

fn visit_message_mut<F>(message: &mut DynamicMessage, visitor: &mut F) -> bool
where
    F: FnMut(&mut DynamicMessage) -> bool,
{
    let has_unknown = message.unknown_fields().next().is_some();
    if has_unknown && !visitor(message) {
        return false;
    }
    // Bound separately so the field iterator's borrow ends first
    let fields_done = message
        .fields_mut()
        .all(|(_, value)| visit_value_mut(value, visitor));
    fields_done
        && message
            .extensions_mut()
            .all(|(_, value)| visit_value_mut(value, visitor))
}

fn visit_value_mut<F>(value: &mut Value, visitor: &mut F) -> bool
where
    F: FnMut(&mut DynamicMessage) -> bool,
{
    match value {
        Value::Message(message) => visit_message_mut(message, visitor),
        Value::List(items) => items.iter_mut().all(|item| visit_value_mut(item, visitor)),
        Value::Map(entries) => entries
            .values_mut()
            .all(|entry| visit_value_mut(entry, visitor)),
        _ => true,
    }
}

/// A message in the tree that carries unknown fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldSite {
    /// Fully-qualified type name of the message
    pub message: String,
    /// Numbers of the unknown fields, in wire order (repeats possible)
    pub field_numbers: Vec<u32>,
}

impl std::fmt::Display for UnknownFieldSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}", self.message, self.field_numbers)
    }
}

/// Lists every message in the tree that carries unknown fields, in visit order
pub fn unknown_field_sites(message: &DynamicMessage) -> Vec<UnknownFieldSite> {
    let mut sites = Vec::new();
    for_each_unknown_field(message, |msg| {
        sites.push(UnknownFieldSite {
            message: msg.descriptor().full_name().to_string(),
            field_numbers: msg.unknown_fields().map(|f| f.number()).collect(),
        });
        true
    });
    sites
}

/// Counts unknown field entries across the whole tree
pub fn count_unknown_fields(message: &DynamicMessage) -> usize {
    let mut count = 0;
    for_each_unknown_field(message, |msg| {
        count += msg.unknown_fields().count();
        true
    });
    count
}
