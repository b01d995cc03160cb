//! Ready-made callbacks.
//!
//! - [`LogUnknownFields`] reports drift and lets the call continue.
//! - [`RejectUnknownFields`] fails the call.

use super::{CallSpec, UnknownFieldCallback};
use crate::scanner::{unknown_field_sites, UnknownFieldSite};
use prost_reflect::{DynamicMessage, ReflectMessage};
use tonic::metadata::MetadataMap;
use tonic::Status;
use tracing::warn;

/// Logs every message with unknown fields at `WARN`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogUnknownFields;

impl UnknownFieldCallback for LogUnknownFields {
    fn on_unknown_fields(
        &self,
        _metadata: &MetadataMap,
        spec: &CallSpec,
        message: &DynamicMessage,
    ) -> Result<(), Status> {
        let sites = unknown_field_sites(message)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let side = if spec.is_client() { "client" } else { "server" };
        warn!(
            procedure = spec.procedure(),
            side,
            "Received {} with unknown fields: {}",
            message.descriptor().full_name(),
            sites
        );
        Ok(())
    }
}

/// Fails the call with `INVALID_ARGUMENT` naming the drifted message types
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectUnknownFields;

impl UnknownFieldCallback for RejectUnknownFields {
    fn on_unknown_fields(
        &self,
        _metadata: &MetadataMap,
        _spec: &CallSpec,
        message: &DynamicMessage,
    ) -> Result<(), Status> {
        Err(Status::invalid_argument(format!(
            "{} contains unknown fields in {}",
            message.descriptor().full_name(),
            distinct_types(unknown_field_sites(message)).join(", ")
        )))
    }
}

/// Message type names of `sites`, sorted and without repeats
fn distinct_types(sites: Vec<UnknownFieldSite>) -> Vec<String> {
    let mut types: Vec<String> = sites.into_iter().map(|site| site.message).collect();
    types.sort_unstable();
    types.dedup();
    types
}
