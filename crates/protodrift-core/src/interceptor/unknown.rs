use super::{CallSpec, Interceptor, InterceptorConfig, MessageStream, StreamingFunc, UnaryFunc};
use crate::scanner::{drop_unknown_fields, has_unknown_fields};
use futures::{FutureExt, StreamExt};
use prost_reflect::{DynamicMessage, ReflectMessage};
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::{Request, Status};
use tracing::debug;

/// Interceptor that reports and optionally strips unknown fields in received
/// messages
#[derive(Debug, Clone)]
pub struct UnknownFieldsInterceptor {
    config: Arc<InterceptorConfig>,
}

impl Default for UnknownFieldsInterceptor {
    fn default() -> Self {
        Self::new(InterceptorConfig::default())
    }
}

impl From<InterceptorConfig> for UnknownFieldsInterceptor {
    fn from(config: InterceptorConfig) -> Self {
        Self::new(config)
    }
}

impl UnknownFieldsInterceptor {
    /// Creates an interceptor with the given configuration
    pub fn new(config: InterceptorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Starts a configuration; finish it with [`InterceptorConfig::build`]
    pub fn builder() -> InterceptorConfig {
        InterceptorConfig::new()
    }

    /// Creates an interceptor that silently strips unknown fields
    pub fn drop_only() -> Self {
        Self::new(InterceptorConfig::new().drop_unknown(true))
    }

    /// Returns the configuration
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Starts inspection for one call or stream.
    ///
    /// This is the hook for RPC stacks that deliver decoded messages some
    /// other way than through the wrap points.
    pub fn inspection(&self, spec: CallSpec, metadata: MetadataMap) -> Inspection {
        Inspection {
            spec,
            metadata,
            config: Arc::clone(&self.config),
        }
    }
}

impl Interceptor for UnknownFieldsInterceptor {
    fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc {
        let interceptor = self.clone();
        Arc::new(move |spec: CallSpec, mut request: Request<DynamicMessage>| {
            let inspection = interceptor.inspection(spec.clone(), request.metadata().clone());
            let next = Arc::clone(&next);
            async move {
                if !spec.is_client() {
                    inspection.inspect(request.get_mut())?;
                }
                let mut response = next(spec.clone(), request).await?;
                if spec.is_client() {
                    inspection.inspect(response.get_mut())?;
                }
                Ok::<_, Status>(response)
            }
            .boxed()
        })
    }

    fn wrap_streaming_client(&self, next: StreamingFunc) -> StreamingFunc {
        let interceptor = self.clone();
        Arc::new(move |spec: CallSpec, request: Request<MessageStream>| {
            let inspection = interceptor.inspection(spec.clone(), request.metadata().clone());
            let call = next(spec, request);
            async move {
                let response = call.await?;
                Ok::<_, Status>(response.map(|inbound| inspection.wrap_stream(inbound)))
            }
            .boxed()
        })
    }

    fn wrap_streaming_handler(&self, next: StreamingFunc) -> StreamingFunc {
        let interceptor = self.clone();
        Arc::new(move |spec: CallSpec, request: Request<MessageStream>| {
            let inspection = interceptor.inspection(spec.clone(), request.metadata().clone());
            next(spec, request.map(|inbound| inspection.wrap_stream(inbound)))
        })
    }
}

/// Inspection state for a single call or stream
#[derive(Debug, Clone)]
pub struct Inspection {
    spec: CallSpec,
    metadata: MetadataMap,
    config: Arc<InterceptorConfig>,
}

impl Inspection {
    /// The call being inspected
    pub fn spec(&self) -> &CallSpec {
        &self.spec
    }

    /// Runs the configured callbacks and drop step on one received message.
    ///
    /// Messages without unknown fields are left alone. The first callback
    /// error is returned as is and skips the remaining callbacks and the
    /// drop.
    pub fn inspect(&self, message: &mut DynamicMessage) -> Result<(), Status> {
        if !has_unknown_fields(message) {
            return Ok(());
        }

        debug!(
            procedure = self.spec.procedure(),
            client = self.spec.is_client(),
            "Unknown fields in {}",
            message.descriptor().full_name()
        );

        for callback in &self.config.callbacks {
            callback.on_unknown_fields(&self.metadata, &self.spec, message)?;
        }

        if self.config.drop_unknown {
            drop_unknown_fields(message);
            debug!(procedure = self.spec.procedure(), "Dropped unknown fields");
        }

        Ok(())
    }

    /// Applies [`Inspection::inspect`] to every message of `inbound`.
    ///
    /// A callback failure is yielded in place of the offending message.
    pub fn wrap_stream(self, inbound: MessageStream) -> MessageStream {
        inbound
            .map(move |item| {
                let mut message = item?;
                self.inspect(&mut message)?;
                Ok::<_, Status>(message)
            })
            .boxed()
    }
}
