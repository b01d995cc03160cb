//! Test fixtures: two versions of the same `helloworld` schema.
//!
//! The new schema adds `User.email` and `NewUserResponse.user`. Encoding a
//! message with the new schema and decoding it with the old one leaves the
//! extra fields in the unknown slot of whichever nested message held them.

use crate::schema::{find_message, pool_from_files};
use prost::Message;
use prost_reflect::{
    DescriptorPool, DynamicMessage, MapKey, MessageDescriptor, ReflectMessage, Value,
};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::descriptor_proto::ExtensionRange;
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MessageOptions};
use std::collections::HashMap;

/// Encoded fixed32 field number 300 with value 42
pub(crate) const FIELD_300: &[u8] = &[0xE5, 0x12, 42, 0, 0, 0];

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message, label)
    }
}

fn map_entry(name: &str, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![field("key", 1, Type::Int32, Label::Optional), value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn schema_file(with_additions: bool) -> FileDescriptorProto {
    let mut user_fields = vec![field("name", 1, Type::String, Label::Optional)];
    if with_additions {
        user_fields.push(field("email", 2, Type::String, Label::Optional));
    }
    let user = DescriptorProto {
        name: Some("User".to_string()),
        field: user_fields,
        ..Default::default()
    };

    let request = DescriptorProto {
        name: Some("NewUserRequest".to_string()),
        field: vec![
            message_field("user", 1, ".helloworld.User", Label::Optional),
            message_field(
                "primitive_map",
                2,
                ".helloworld.NewUserRequest.PrimitiveMapEntry",
                Label::Repeated,
            ),
            message_field(
                "msg_map",
                3,
                ".helloworld.NewUserRequest.MsgMapEntry",
                Label::Repeated,
            ),
            field("primitive_list", 4, Type::Int32, Label::Repeated),
            message_field("msg_list", 5, ".helloworld.User", Label::Repeated),
        ],
        nested_type: vec![
            map_entry(
                "PrimitiveMapEntry",
                field("value", 2, Type::Int32, Label::Optional),
            ),
            map_entry(
                "MsgMapEntry",
                message_field("value", 2, ".helloworld.User", Label::Optional),
            ),
        ],
        ..Default::default()
    };

    let mut response_fields = Vec::new();
    if with_additions {
        response_fields.push(message_field("user", 1, ".helloworld.User", Label::Optional));
    }
    let response = DescriptorProto {
        name: Some("NewUserResponse".to_string()),
        field: response_fields,
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("helloworld/user.proto".to_string()),
        package: Some("helloworld".to_string()),
        message_type: vec![user, request, response],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// The schema as the new peer knows it
pub(crate) fn new_file() -> FileDescriptorProto {
    schema_file(true)
}

pub(crate) fn old_pool() -> DescriptorPool {
    pool_from_files(vec![schema_file(false)]).expect("old fixture schema is valid")
}

pub(crate) fn new_pool() -> DescriptorPool {
    pool_from_files(vec![new_file()]).expect("new fixture schema is valid")
}

pub(crate) fn old_message(name: &str) -> MessageDescriptor {
    find_message(&old_pool(), name).expect("fixture message exists")
}

pub(crate) fn new_message(name: &str) -> MessageDescriptor {
    find_message(&new_pool(), name).expect("fixture message exists")
}

/// Re-decodes a new-schema message with the old schema
pub(crate) fn as_old(message: &DynamicMessage) -> DynamicMessage {
    let desc = old_message(message.descriptor().full_name());
    DynamicMessage::decode(desc, message.encode_to_vec().as_slice())
        .expect("new encoding decodes under old schema")
}

pub(crate) fn new_user(name: &str, email: &str) -> DynamicMessage {
    let mut user = DynamicMessage::new(new_message("helloworld.User"));
    user.set_field_by_name("name", Value::String(name.to_string()));
    user.set_field_by_name("email", Value::String(email.to_string()));
    user
}

/// An old-schema user with no unknown data
pub(crate) fn old_user(name: &str) -> DynamicMessage {
    let mut user = DynamicMessage::new(old_message("helloworld.User"));
    user.set_field_by_name("name", Value::String(name.to_string()));
    user
}

/// An old-schema user carrying the new `email` field as unknown data
pub(crate) fn drifted_user(name: &str) -> DynamicMessage {
    as_old(&new_user(name, &format!("{name}@example.com")))
}

/// Decodes `bytes` appended to an encoded `base` under the same descriptor
pub(crate) fn with_raw_unknown(base: &DynamicMessage, bytes: &[u8]) -> DynamicMessage {
    let mut encoded = base.encode_to_vec();
    encoded.extend_from_slice(bytes);
    DynamicMessage::decode(base.descriptor(), encoded.as_slice())
        .expect("raw unknown field decodes")
}

pub(crate) fn old_request() -> DynamicMessage {
    DynamicMessage::new(old_message("helloworld.NewUserRequest"))
}

pub(crate) fn message_map(entries: Vec<(i32, DynamicMessage)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (MapKey::I32(k), Value::Message(v)))
            .collect::<HashMap<_, _>>(),
    )
}

pub(crate) fn message_list(items: Vec<DynamicMessage>) -> Value {
    Value::List(items.into_iter().map(Value::Message).collect())
}

/// A proto2 schema exercising the field kinds proto3 lacks:
///
/// ```text
/// message Payload { optional string name = 1; }
/// message Order { optional group Item = 1 { optional string sku = 1; } }
/// message Holder { optional string id = 1; extensions 100 to 199; }
/// extend Holder { optional Payload payload = 100; }
/// ```
fn legacy_file() -> FileDescriptorProto {
    let payload = DescriptorProto {
        name: Some("Payload".to_string()),
        field: vec![field("name", 1, Type::String, Label::Optional)],
        ..Default::default()
    };
    let order = DescriptorProto {
        name: Some("Order".to_string()),
        field: vec![FieldDescriptorProto {
            type_name: Some(".legacy.Order.Item".to_string()),
            ..field("item", 1, Type::Group, Label::Optional)
        }],
        nested_type: vec![DescriptorProto {
            name: Some("Item".to_string()),
            field: vec![field("sku", 1, Type::String, Label::Optional)],
            ..Default::default()
        }],
        ..Default::default()
    };
    let holder = DescriptorProto {
        name: Some("Holder".to_string()),
        field: vec![field("id", 1, Type::String, Label::Optional)],
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("legacy/order.proto".to_string()),
        package: Some("legacy".to_string()),
        message_type: vec![payload, order, holder],
        extension: vec![FieldDescriptorProto {
            extendee: Some(".legacy.Holder".to_string()),
            ..message_field("payload", 100, ".legacy.Payload", Label::Optional)
        }],
        syntax: Some("proto2".to_string()),
        ..Default::default()
    }
}

pub(crate) fn legacy_pool() -> DescriptorPool {
    pool_from_files(vec![legacy_file()]).expect("legacy fixture schema is valid")
}

/// `legacy.Order` whose group value carries [`FIELD_300`], round-tripped
/// through the wire so the group is decoded from start/end group tags
pub(crate) fn drifted_order() -> DynamicMessage {
    let pool = legacy_pool();
    let item_desc = find_message(&pool, "legacy.Order.Item").expect("fixture message exists");
    let mut item = DynamicMessage::new(item_desc);
    item.set_field_by_name("sku", Value::String("SKU-1".to_string()));
    let item = with_raw_unknown(&item, FIELD_300);

    let desc = find_message(&pool, "legacy.Order").expect("fixture message exists");
    let mut order = DynamicMessage::new(desc.clone());
    order.set_field_by_name("item", Value::Message(item));
    DynamicMessage::decode(desc, order.encode_to_vec().as_slice())
        .expect("group encoding decodes")
}

/// `legacy.Holder` whose `payload` extension carries [`FIELD_300`],
/// round-tripped through the wire
pub(crate) fn drifted_holder() -> DynamicMessage {
    let pool = legacy_pool();
    let payload_desc = find_message(&pool, "legacy.Payload").expect("fixture message exists");
    let payload = with_raw_unknown(&DynamicMessage::new(payload_desc), FIELD_300);

    let desc = find_message(&pool, "legacy.Holder").expect("fixture message exists");
    let extension = pool
        .get_extension_by_name("legacy.payload")
        .expect("fixture extension exists");
    let mut holder = DynamicMessage::new(desc.clone());
    holder.set_field_by_name("id", Value::String("h-1".to_string()));
    holder.set_extension(&extension, Value::Message(payload));
    DynamicMessage::decode(desc, holder.encode_to_vec().as_slice()).expect("extension decodes")
}

/// The single message held by `holder`'s `payload` extension
pub(crate) fn holder_payload(holder: &DynamicMessage) -> DynamicMessage {
    holder
        .extensions()
        .find_map(|(_, value)| value.as_message().cloned())
        .expect("payload extension is set")
}

pub(crate) fn unknown_count(message: &DynamicMessage) -> usize {
    message.unknown_fields().count()
}
