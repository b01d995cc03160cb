//! Lazy traversal.
//!
//! [`UnknownMessages`] yields the same messages as
//! [`for_each_unknown_field`](super::for_each_unknown_field), in the same
//! order, but only walks as far as the consumer pulls. `take(1)` is an
//! existence check and `count()` walks everything.

use prost_reflect::{DynamicMessage, Value};

/// Iterator over the messages in a tree that have unknown fields
#[derive(Debug)]
pub struct UnknownMessages<'a> {
    stack: Vec<&'a DynamicMessage>,
    /// Last message popped; its children are pushed on the next call
    expand: Option<&'a DynamicMessage>,
}

/// Returns a lazy iterator over `message` and its nested messages that have
/// unknown fields, in depth-first pre-order
pub fn unknown_messages(message: &DynamicMessage) -> UnknownMessages<'_> {
    UnknownMessages {
        stack: vec![message],
        expand: None,
    }
}

impl<'a> UnknownMessages<'a> {
    fn push_children(&mut self, message: &'a DynamicMessage) {
        // Children go on in reverse so the first field pops first
        let start = self.stack.len();
        for (_, value) in message.fields() {
            push_messages(value, &mut self.stack);
        }
        for (_, value) in message.extensions() {
            push_messages(value, &mut self.stack);
        }
        self.stack[start..].reverse();
    }
}

impl<'a> Iterator for UnknownMessages<'a> {
    type Item = &'a DynamicMessage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(parent) = self.expand.take() {
                self.push_children(parent);
            }
            let message = self.stack.pop()?;
            self.expand = Some(message);
            if message.unknown_fields().next().is_some() {
                return Some(message);
            }
        }
    }
}

fn push_messages<'a>(value: &'a Value, stack: &mut Vec<&'a DynamicMessage>) {
    match value {
        Value::Message(message) => stack.push(message),
        Value::List(items) => items.iter().for_each(|item| push_messages(item, stack)),
        Value::Map(entries) => entries
            .values()
            .for_each(|entry| push_messages(entry, stack)),
        _ => {}
    }
}
