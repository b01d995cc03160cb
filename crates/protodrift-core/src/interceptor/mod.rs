//! RPC interception.
//!
//! This module applies the [scanner](crate::scanner) at an RPC boundary. An
//! [`Interceptor`] wraps the three kinds of call an RPC stack dispatches:
//!
//! - unary calls ([`UnaryFunc`]),
//! - streams hosted by the client ([`Interceptor::wrap_streaming_client`]),
//! - streams hosted by the handler ([`Interceptor::wrap_streaming_handler`]).
//!
//! Each wrap point takes the next stage as a function value and returns a new
//! function value with the same signature, so interceptors compose by
//! repeated wrapping.
//!
//! Only messages *received* by this process are inspected: requests when the
//! process is the server, responses when it is the client. Messages built
//! locally always match the local schema.
//!
//! ## Example
//!
//! ```no_run
//! use protodrift_core::interceptor::{
//!     unary_fn, CallSpec, Interceptor, InterceptorConfig, StreamType, UnknownFieldsInterceptor,
//! };
//! use protodrift_core::prost_reflect::ReflectMessage;
//! use tonic::{Request, Response, Status};
//!
//! let interceptor = UnknownFieldsInterceptor::new(
//!     InterceptorConfig::new()
//!         .callback(|_metadata, spec, message| {
//!             tracing::warn!(procedure = spec.procedure(), message = message.descriptor().full_name(), "schema drift");
//!             Ok(())
//!         })
//!         .drop_unknown(true),
//! );
//!
//! let handler = interceptor.wrap_unary(unary_fn(|_spec, request: Request<_>| async move {
//!     Ok::<_, Status>(Response::new(request.into_inner()))
//! }));
//! # let _ = (handler, CallSpec::server("/acme.v1.Echo/Echo", StreamType::Unary));
//! ```

pub mod callbacks;
mod config;
mod unknown;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::FutureExt;
use prost_reflect::DynamicMessage;
use std::future::Future;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::{GrpcMethod, Request, Response, Status};

pub use config::InterceptorConfig;
pub use unknown::{Inspection, UnknownFieldsInterceptor};

/// A stream of decoded messages, or the failure that ended it
pub type MessageStream = BoxStream<'static, Result<DynamicMessage, Status>>;

/// Next stage of a unary call
pub type UnaryFunc = Arc<
    dyn Fn(CallSpec, Request<DynamicMessage>) -> BoxFuture<'static, Result<Response<DynamicMessage>, Status>>
        + Send
        + Sync,
>;

/// Next stage of a streaming call.
///
/// The request carries the stream of messages sent by the client, the
/// response the stream sent back by the handler.
pub type StreamingFunc = Arc<
    dyn Fn(CallSpec, Request<MessageStream>) -> BoxFuture<'static, Result<Response<MessageStream>, Status>>
        + Send
        + Sync,
>;

/// Builds a [`UnaryFunc`] from an async function
pub fn unary_fn<F, Fut>(f: F) -> UnaryFunc
where
    F: Fn(CallSpec, Request<DynamicMessage>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<DynamicMessage>, Status>> + Send + 'static,
{
    Arc::new(move |spec: CallSpec, request: Request<DynamicMessage>| f(spec, request).boxed())
}

/// Builds a [`StreamingFunc`] from an async function
pub fn streaming_fn<F, Fut>(f: F) -> StreamingFunc
where
    F: Fn(CallSpec, Request<MessageStream>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<MessageStream>, Status>> + Send + 'static,
{
    Arc::new(move |spec: CallSpec, request: Request<MessageStream>| f(spec, request).boxed())
}

/// Shape of an RPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// One request, one response
    Unary,
    /// Many requests, one response
    ClientStream,
    /// One request, many responses
    ServerStream,
    /// Many requests, many responses
    BidiStream,
}

impl StreamType {
    /// Returns true for every shape except [`StreamType::Unary`]
    pub fn is_streaming(&self) -> bool {
        !matches!(self, StreamType::Unary)
    }
}

/// Per-call description of the RPC being intercepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    procedure: String,
    stream_type: StreamType,
    is_client: bool,
}

impl CallSpec {
    /// Describes a call originated by this process
    pub fn client(procedure: impl Into<String>, stream_type: StreamType) -> Self {
        Self {
            procedure: procedure.into(),
            stream_type,
            is_client: true,
        }
    }

    /// Describes a call handled by this process
    pub fn server(procedure: impl Into<String>, stream_type: StreamType) -> Self {
        Self {
            procedure: procedure.into(),
            stream_type,
            is_client: false,
        }
    }

    /// Procedure path, e.g. `/acme.v1.UserService/CreateUser`
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Shape of the method
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// True if this process originated the call
    pub fn is_client(&self) -> bool {
        self.is_client
    }
}

/// Reads the procedure path tonic attaches to requests as a [`GrpcMethod`]
/// extension
pub fn procedure_of<T>(request: &Request<T>) -> Option<String> {
    request
        .extensions()
        .get::<GrpcMethod<'static>>()
        .map(|m| format!("/{}/{}", m.service(), m.method()))
}

/// Wrap points for the three kinds of call
pub trait Interceptor: Send + Sync {
    /// Wraps a unary call
    fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc;

    /// Wraps a stream hosted by the client; the client receives responses
    fn wrap_streaming_client(&self, next: StreamingFunc) -> StreamingFunc;

    /// Wraps a stream hosted by the handler; the handler receives requests
    fn wrap_streaming_handler(&self, next: StreamingFunc) -> StreamingFunc;
}

/// Called when a received message carries unknown fields.
///
/// `message` is the top-level message of the call; the unknown fields may
/// be anywhere inside it. Returning an error fails the call with that status.
///
/// Any `Fn(&MetadataMap, &CallSpec, &DynamicMessage) -> Result<(), Status>`
/// closure is a callback.
pub trait UnknownFieldCallback: Send + Sync {
    /// Inspects a message with unknown fields
    fn on_unknown_fields(
        &self,
        metadata: &MetadataMap,
        spec: &CallSpec,
        message: &DynamicMessage,
    ) -> Result<(), Status>;
}

impl<F> UnknownFieldCallback for F
where
    F: Fn(&MetadataMap, &CallSpec, &DynamicMessage) -> Result<(), Status> + Send + Sync,
{
    fn on_unknown_fields(
        &self,
        metadata: &MetadataMap,
        spec: &CallSpec,
        message: &DynamicMessage,
    ) -> Result<(), Status> {
        self(metadata, spec, message)
    }
}
