//! Stored message framing.
//!
//! A file holds either one encoded message (the whole file) or a sequence of
//! length-delimited messages, each prefixed by its size as a varint. The
//! delimited layout is what `writeDelimitedTo` in the protobuf runtimes and
//! prost's `encode_length_delimited` produce.

use crate::error::{Error, Result};
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tracing::trace;

/// How encoded messages are laid out in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// The whole buffer is one message
    #[default]
    Single,
    /// Varint length prefix before each message
    Delimited,
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::varint_decode(i));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::varint_decode(data.len()))
}

/// Splits `data` into encoded records according to `framing`
pub fn split_records(data: &[u8], framing: Framing) -> Result<Vec<&[u8]>> {
    match framing {
        Framing::Single => Ok(vec![data]),
        Framing::Delimited => split_delimited(data),
    }
}

fn split_delimited(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut records = Vec::new();
    let mut position = 0;

    while position < data.len() {
        let (length, prefix_len) = decode_varint(&data[position..])
            .map_err(|_| Error::varint_decode(position))?;
        let start = position + prefix_len;
        let end = usize::try_from(length)
            .ok()
            .and_then(|len| start.checked_add(len))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                Error::invalid_framing(
                    position,
                    format!(
                        "record needs {} bytes, {} remain",
                        length,
                        data.len() - start
                    ),
                )
            })?;

        trace!("Record {} at {}..{}", records.len(), start, end);
        records.push(&data[start..end]);
        position = end;
    }

    Ok(records)
}

/// Decodes every record in `data` as `descriptor`
pub fn decode_records(
    descriptor: &MessageDescriptor,
    data: &[u8],
    framing: Framing,
) -> Result<Vec<DynamicMessage>> {
    split_records(data, framing)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            DynamicMessage::decode(descriptor.clone(), record)
                .map_err(|e| Error::message_decode(index, descriptor.full_name(), e))
        })
        .collect()
}

/// Encodes `messages` back into a buffer with the given framing.
///
/// With [`Framing::Single`] the encodings are simply concatenated, which for
/// a single message is the message itself.
pub fn encode_records(messages: &[DynamicMessage], framing: Framing) -> Vec<u8> {
    let mut out = Vec::new();
    for message in messages {
        match framing {
            Framing::Single => out.extend_from_slice(&message.encode_to_vec()),
            Framing::Delimited => out.extend_from_slice(&message.encode_length_delimited_to_vec()),
        }
    }
    out
}
