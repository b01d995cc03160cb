use super::{CallSpec, UnknownFieldCallback, UnknownFieldsInterceptor};
use prost_reflect::DynamicMessage;
use std::fmt;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::Status;

/// Configuration for [`UnknownFieldsInterceptor`](super::UnknownFieldsInterceptor)
#[derive(Clone, Default)]
pub struct InterceptorConfig {
    /// Callbacks run in registration order when unknown fields are found
    pub(crate) callbacks: Vec<Arc<dyn UnknownFieldCallback>>,
    /// Strip unknown fields after all callbacks succeed
    pub(crate) drop_unknown: bool,
}

impl fmt::Debug for InterceptorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorConfig")
            .field("callbacks", &self.callbacks.len())
            .field("drop_unknown", &self.drop_unknown)
            .finish()
    }
}

impl InterceptorConfig {
    /// Creates a new config with no callbacks and dropping disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a closure callback
    pub fn callback<F>(self, callback: F) -> Self
    where
        F: Fn(&MetadataMap, &CallSpec, &DynamicMessage) -> Result<(), Status>
            + Send
            + Sync
            + 'static,
    {
        self.handler(callback)
    }

    /// Appends any [`UnknownFieldCallback`] implementation
    pub fn handler(mut self, handler: impl UnknownFieldCallback + 'static) -> Self {
        self.callbacks.push(Arc::new(handler));
        self
    }

    /// Sets whether unknown fields are stripped before the message moves on
    pub fn drop_unknown(mut self, drop: bool) -> Self {
        self.drop_unknown = drop;
        self
    }

    /// Builds the interceptor
    pub fn build(self) -> UnknownFieldsInterceptor {
        UnknownFieldsInterceptor::new(self)
    }

    /// Number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns true if unknown fields are stripped
    pub fn drops_unknown(&self) -> bool {
        self.drop_unknown
    }
}
