//! Schema loading.
//!
//! Unknown fields are only meaningful relative to a schema: the same bytes
//! decode cleanly under a newer schema and leave unknown data behind under an
//! older one. This module builds the prost-reflect [`DescriptorPool`] that
//! stored messages are decoded against.
//!
//! The input is an encoded `FileDescriptorSet`, as produced by
//! `protoc --include_imports --descriptor_set_out=api.binpb` or
//! `buf build -o api.binpb`.

use crate::error::{Error, Result};
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::path::Path;
use tracing::debug;

/// Reads an encoded `FileDescriptorSet` from disk
pub fn load_descriptor_pool(path: impl AsRef<Path>) -> Result<DescriptorPool> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    debug!("Loaded descriptor set {} ({} bytes)", path.display(), data.len());
    decode_descriptor_pool(&data)
}

/// Decodes an encoded `FileDescriptorSet`
pub fn decode_descriptor_pool(data: &[u8]) -> Result<DescriptorPool> {
    let pool = DescriptorPool::decode(data)?;
    debug!("Descriptor pool has {} files", pool.files().len());
    Ok(pool)
}

/// Builds a pool from already-parsed file descriptors.
///
/// Files must be ordered so that dependencies come first.
pub fn pool_from_files(files: Vec<FileDescriptorProto>) -> Result<DescriptorPool> {
    let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: files })?;
    Ok(pool)
}

/// Resolves a message type by its fully-qualified name.
///
/// A leading `.` (the form used in `type_name` references) is accepted.
pub fn find_message(pool: &DescriptorPool, name: &str) -> Result<MessageDescriptor> {
    let name = name.strip_prefix('.').unwrap_or(name);
    pool.get_message_by_name(name)
        .ok_or_else(|| Error::message_not_found(name))
}
