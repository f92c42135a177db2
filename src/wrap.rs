//! Method Wrapper Factory - the interception core
//!
//! [`TracedMethod::wrap_sync`] / [`TracedMethod::wrap_async`] take an
//! original callable plus a [`WrapContext`] and produce a drop-in
//! replacement: same arguments, same receiver, same return value or error
//! (the very same value, not a copy), same sync-vs-async shape - with a
//! `function_call` record emitted before the original runs and a
//! `function_return` record emitted when it settles.
//!
//! Invocation yields a [`CallOutcome`]: `Ready` for synchronous originals,
//! `Pending` (a boxed future) for asynchronous ones. The pending future is
//! handed back immediately after the call record; its continuation emits the
//! return record at settlement and resolves with the exact outcome the
//! original produced. Nothing is spawned - the caller's executor drives it.
//!
//! Re-wrapping an already-traced callable emits nested record pairs per
//! call. The crate does not guard against double interception; avoiding it
//! is the caller's responsibility.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::error::CallError;
use crate::event::{EventSink, TraceEvent};
use crate::location::SourceLocation;
use crate::value::{encode_args, TraceValue};

/// What a traced callable settles with.
pub type CallResult = std::result::Result<TraceValue, CallError>;

/// Caller-facing configuration. `function_name` overrides the declared name
/// for single-method interception; `exclude_methods` removes names from
/// type-wide eligibility. Each installer reads only the field that concerns
/// it.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    pub function_name: Option<String>,
    pub exclude_methods: BTreeSet<String>,
}

impl TraceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the emitted name instead of the declared one.
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Exclude one method from type-wide wrapping.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude_methods.insert(name.into());
        self
    }

    /// Exclude several methods from type-wide wrapping.
    pub fn exclude_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_methods.extend(names.into_iter().map(Into::into));
        self
    }

    pub(crate) fn resolve_name<'a>(&'a self, declared: &'a str) -> &'a str {
        self.function_name.as_deref().unwrap_or(declared)
    }
}

/// The immutable bundle fixed at installation time: resolved method name,
/// optional declaring-type name, source location, sink. One per wrapped
/// method, never mutated afterwards.
#[derive(Clone)]
pub struct WrapContext {
    function: Arc<str>,
    class: Option<Arc<str>>,
    file: Arc<str>,
    sink: Arc<dyn EventSink>,
}

impl WrapContext {
    /// Build a context, capturing the caller's source location.
    #[track_caller]
    pub fn new(function: &str, class: Option<&str>, sink: Arc<dyn EventSink>) -> Self {
        Self::at(SourceLocation::capture(), function, class, sink)
    }

    /// Build a context with an explicitly resolved location.
    pub fn at(
        location: SourceLocation,
        function: &str,
        class: Option<&str>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            function: Arc::from(function),
            class: class.map(Arc::from),
            file: location.as_arc(),
            sink,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// One `function_call` record; the argument list is encoded in a single
    /// serialization pass.
    pub(crate) fn emit_call(&self, args: &[TraceValue]) {
        self.sink.emit(TraceEvent::FunctionCall {
            file: Arc::clone(&self.file),
            class: self.class.clone(),
            function: Arc::clone(&self.function),
            args: encode_args(args),
        });
    }

    /// One `function_return` record carrying the value or the error
    /// descriptor, plus wall-clock duration since `started`.
    pub(crate) fn emit_return(
        &self,
        outcome: std::result::Result<&TraceValue, &CallError>,
        started: Instant,
    ) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let (return_value, error) = match outcome {
            Ok(value) => (Some(value.to_json()), None),
            Err(err) => (None, Some(err.descriptor())),
        };
        self.sink.emit(TraceEvent::FunctionReturn {
            file: Arc::clone(&self.file),
            class: self.class.clone(),
            function: Arc::clone(&self.function),
            return_value,
            error,
            duration_ms: Some(duration_ms),
        });
    }
}

impl fmt::Debug for WrapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapContext")
            .field("function", &self.function)
            .field("class", &self.class)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

pub(crate) type SyncFn<T> = dyn Fn(&T, &[TraceValue]) -> CallResult + Send + Sync;
pub(crate) type AsyncFn<T> =
    dyn Fn(Arc<T>, Vec<TraceValue>) -> BoxFuture<'static, CallResult> + Send + Sync;

/// A registered callable in its original, untraced form.
pub(crate) enum MethodKind<T> {
    Sync(Arc<SyncFn<T>>),
    Async(Arc<AsyncFn<T>>),
}

impl<T> Clone for MethodKind<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Async(f) => Self::Async(Arc::clone(f)),
        }
    }
}

impl<T> MethodKind<T> {
    /// Invoke without any tracing. The passthrough path for excluded
    /// methods.
    pub(crate) fn call(&self, recv: &Arc<T>, args: Vec<TraceValue>) -> CallOutcome {
        match self {
            Self::Sync(f) => CallOutcome::Ready(f(recv, &args)),
            Self::Async(f) => CallOutcome::Pending(f(Arc::clone(recv), args)),
        }
    }

    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

/// A wrapped callable: the original plus its [`WrapContext`].
pub struct TracedMethod<T> {
    context: WrapContext,
    kind: MethodKind<T>,
}

impl<T> TracedMethod<T> {
    /// Wrap a synchronous callable.
    pub fn wrap_sync<F>(context: WrapContext, original: F) -> Self
    where
        F: Fn(&T, &[TraceValue]) -> CallResult + Send + Sync + 'static,
    {
        Self {
            context,
            kind: MethodKind::Sync(Arc::new(original)),
        }
    }

    /// Wrap an asynchronous callable. The closure returns a boxed future so
    /// one wrapper type covers every async original.
    pub fn wrap_async<F>(context: WrapContext, original: F) -> Self
    where
        F: Fn(Arc<T>, Vec<TraceValue>) -> BoxFuture<'static, CallResult> + Send + Sync + 'static,
    {
        Self {
            context,
            kind: MethodKind::Async(Arc::new(original)),
        }
    }

    pub(crate) fn from_kind(context: WrapContext, kind: MethodKind<T>) -> Self {
        Self { context, kind }
    }

    pub fn context(&self) -> &WrapContext {
        &self.context
    }

    pub fn is_async(&self) -> bool {
        self.kind.is_async()
    }

    /// Run one traced invocation.
    ///
    /// Emits the call record, runs the original, and emits the return record
    /// at settlement. The outcome - value or error - is exactly what the
    /// original produced.
    pub fn invoke(&self, recv: &Arc<T>, args: Vec<TraceValue>) -> CallOutcome {
        let started = Instant::now();
        self.context.emit_call(&args);

        match &self.kind {
            MethodKind::Sync(f) => {
                let result = f(recv, &args);
                self.context.emit_return(result.as_ref(), started);
                CallOutcome::Ready(result)
            }
            MethodKind::Async(f) => {
                let future = f(Arc::clone(recv), args);
                let context = self.context.clone();
                CallOutcome::Pending(Box::pin(async move {
                    let result = future.await;
                    context.emit_return(result.as_ref(), started);
                    result
                }))
            }
        }
    }
}

impl<T> fmt::Debug for TracedMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedMethod")
            .field("context", &self.context)
            .field("is_async", &self.is_async())
            .finish()
    }
}

/// The result shape of one traced invocation.
///
/// `Ready` settles synchronously; `Pending` is the wrapper's future, settled
/// by the caller's executor. Dropping a `Pending` outcome without driving it
/// abandons the call along with its return record.
pub enum CallOutcome {
    Ready(CallResult),
    Pending(BoxFuture<'static, CallResult>),
}

impl CallOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Extract a synchronous result; `None` for pending outcomes.
    pub fn ready(self) -> Option<CallResult> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Pending(_) => None,
        }
    }

    /// Await settlement regardless of shape.
    pub async fn settled(self) -> CallResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Single-method interception: one standalone callable, wrapped.
///
/// The source location is captured here, once, at installation; the resolved
/// name honors `options.function_name`. `exclude_methods` does not apply to
/// single wrappings.
pub struct TracedFunction {
    method: TracedMethod<()>,
    recv: Arc<()>,
}

impl TracedFunction {
    /// Wrap a synchronous callable.
    #[track_caller]
    pub fn wrap<F>(
        declared_name: &str,
        class: Option<&str>,
        options: &TraceOptions,
        sink: Arc<dyn EventSink>,
        original: F,
    ) -> Self
    where
        F: Fn(&[TraceValue]) -> CallResult + Send + Sync + 'static,
    {
        let context = WrapContext::new(options.resolve_name(declared_name), class, sink);
        tracing::debug!(
            function = %context.function(),
            file = %context.file(),
            "installed traced function"
        );
        Self {
            method: TracedMethod::wrap_sync(context, move |_recv: &(), args| original(args)),
            recv: Arc::new(()),
        }
    }

    /// Wrap an asynchronous callable.
    #[track_caller]
    pub fn wrap_async<F>(
        declared_name: &str,
        class: Option<&str>,
        options: &TraceOptions,
        sink: Arc<dyn EventSink>,
        original: F,
    ) -> Self
    where
        F: Fn(Vec<TraceValue>) -> BoxFuture<'static, CallResult> + Send + Sync + 'static,
    {
        let context = WrapContext::new(options.resolve_name(declared_name), class, sink);
        tracing::debug!(
            function = %context.function(),
            file = %context.file(),
            "installed traced function"
        );
        Self {
            method: TracedMethod::wrap_async(context, move |_recv, args| original(args)),
            recv: Arc::new(()),
        }
    }

    pub fn context(&self) -> &WrapContext {
        self.method.context()
    }

    pub fn is_async(&self) -> bool {
        self.method.is_async()
    }

    /// Run one traced invocation.
    pub fn invoke(&self, args: Vec<TraceValue>) -> CallOutcome {
        self.method.invoke(&self.recv, args)
    }
}

impl fmt::Debug for TracedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedFunction")
            .field("context", self.method.context())
            .finish()
    }
}
