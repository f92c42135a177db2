//! Type-Wide Interception - traced classes and instances
//!
//! [`TracedClassBuilder`] is the declarative registration step: the caller
//! names a constructor delegate and every method the type exposes, and
//! `build()` computes the eligible set exactly once. Names in
//! `TraceOptions::exclude_methods` stay callable but become untraced
//! passthroughs; `constructor` is reserved (construction is traced through
//! the delegate, not as a method). The class is immutable after `build()` -
//! later registration is impossible, so eligibility never changes per call.
//!
//! One source location is resolved per type, at `builder()`, and shared by
//! every wrapped method and both lifecycle records. Construction emits
//! `class_init` (with the constructor arguments) before delegating; dropping
//! a [`TracedInstance`] emits `class_destroy` once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{Result, TraceError};
use crate::event::{EventSink, TraceEvent};
use crate::location::SourceLocation;
use crate::value::{encode_args, TraceValue};
use crate::wrap::{CallOutcome, CallResult, MethodKind, TraceOptions, TracedMethod, WrapContext};

/// Name reserved for the construction path.
const CONSTRUCTOR: &str = "constructor";

type Constructor<T> = dyn Fn(&[TraceValue]) -> T + Send + Sync;

/// A method after eligibility is decided: wrapped, or excluded passthrough.
enum MethodEntry<T> {
    Traced(TracedMethod<T>),
    Passthrough(MethodKind<T>),
}

/// Declarative registration for one traced type.
///
/// Obtained from [`TracedClass::builder`]; consumed by [`build`]
/// (`TracedClassBuilder::build`), which validates the registration and fixes
/// the eligible method set.
pub struct TracedClassBuilder<T> {
    name: String,
    sink: Arc<dyn EventSink>,
    location: SourceLocation,
    options: TraceOptions,
    constructor: Option<Arc<Constructor<T>>>,
    registrations: Vec<(String, MethodKind<T>)>,
}

impl<T> TracedClassBuilder<T> {
    /// Register the construction delegate. Construction without one fails
    /// with `[SCOPE-002]`.
    pub fn constructor<F>(mut self, delegate: F) -> Self
    where
        F: Fn(&[TraceValue]) -> T + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(delegate));
        self
    }

    /// Register a synchronous method under `name`.
    pub fn method<F>(mut self, name: &str, original: F) -> Self
    where
        F: Fn(&T, &[TraceValue]) -> CallResult + Send + Sync + 'static,
    {
        self.registrations
            .push((name.to_string(), MethodKind::Sync(Arc::new(original))));
        self
    }

    /// Register an asynchronous method under `name`. The closure returns a
    /// boxed future; the instance handle is shared into it.
    pub fn method_async<F>(mut self, name: &str, original: F) -> Self
    where
        F: Fn(Arc<T>, Vec<TraceValue>) -> BoxFuture<'static, CallResult> + Send + Sync + 'static,
    {
        self.registrations
            .push((name.to_string(), MethodKind::Async(Arc::new(original))));
        self
    }

    /// Apply caller-facing options. Type-wide interception reads
    /// `exclude_methods`; `function_name` has no meaning here (methods are
    /// named at registration) and is ignored.
    pub fn options(mut self, options: TraceOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for excluding one method without building options by hand.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.options.exclude_methods.insert(name.into());
        self
    }

    /// Override the captured installation site (codegen, macros).
    pub fn location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Validate the registration and fix the eligible set.
    ///
    /// Duplicate names fail with `[SCOPE-003]`; registering `constructor` as
    /// a method fails with `[SCOPE-004]`. Excluded names become untraced
    /// passthroughs here - exclusion is decided now, never per call.
    pub fn build(self) -> Result<TracedClass<T>> {
        let mut methods: HashMap<String, MethodEntry<T>> = HashMap::new();
        let mut wrapped = 0usize;
        let mut passthrough = 0usize;

        for (name, kind) in self.registrations {
            if name == CONSTRUCTOR {
                return Err(TraceError::ReservedMethodName { method: name });
            }
            if methods.contains_key(&name) {
                return Err(TraceError::DuplicateMethod {
                    class: self.name,
                    method: name,
                });
            }

            let entry = if self.options.exclude_methods.contains(&name) {
                passthrough += 1;
                MethodEntry::Passthrough(kind)
            } else {
                wrapped += 1;
                let context = WrapContext::at(
                    self.location.clone(),
                    &name,
                    Some(&self.name),
                    Arc::clone(&self.sink),
                );
                MethodEntry::Traced(TracedMethod::from_kind(context, kind))
            };
            methods.insert(name, entry);
        }

        tracing::debug!(
            class = %self.name,
            file = %self.location,
            wrapped,
            passthrough,
            "installed traced class"
        );

        Ok(TracedClass {
            core: Arc::new(ClassCore {
                name: Arc::from(self.name),
                file: self.location.as_arc(),
                sink: self.sink,
                constructor: self.constructor,
                methods,
            }),
        })
    }
}

impl<T> fmt::Debug for TracedClassBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedClassBuilder")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("registrations", &self.registrations.len())
            .finish_non_exhaustive()
    }
}

struct ClassCore<T> {
    name: Arc<str>,
    file: Arc<str>,
    sink: Arc<dyn EventSink>,
    constructor: Option<Arc<Constructor<T>>>,
    methods: HashMap<String, MethodEntry<T>>,
}

/// A traced type: the fixed method table plus the decorated constructor.
///
/// Cloning shares the table (the class is one registration, however many
/// handles point at it).
pub struct TracedClass<T> {
    core: Arc<ClassCore<T>>,
}

impl<T> Clone for TracedClass<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> TracedClass<T> {
    /// Start a registration. The source location for the whole type is
    /// captured here, once.
    #[track_caller]
    pub fn builder(name: &str, sink: Arc<dyn EventSink>) -> TracedClassBuilder<T> {
        TracedClassBuilder {
            name: name.to_string(),
            sink,
            location: SourceLocation::capture(),
            options: TraceOptions::new(),
            constructor: None,
            registrations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The location shared by every record this class emits.
    pub fn file(&self) -> &str {
        &self.core.file
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.core.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether `name` is registered and eligible (not excluded).
    pub fn is_traced(&self, name: &str) -> bool {
        matches!(self.core.methods.get(name), Some(MethodEntry::Traced(_)))
    }

    /// Decorated construction: emits `class_init` with the constructor
    /// arguments, then delegates to the registered constructor.
    pub fn construct(&self, args: Vec<TraceValue>) -> Result<TracedInstance<T>> {
        let constructor = self.core.constructor.as_ref().ok_or_else(|| {
            TraceError::MissingConstructor {
                class: self.core.name.to_string(),
            }
        })?;

        self.core.sink.emit(TraceEvent::ClassInit {
            file: Arc::clone(&self.core.file),
            class: Arc::clone(&self.core.name),
            args: encode_args(&args),
        });

        let inner = Arc::new(constructor(&args));
        Ok(TracedInstance {
            class: self.clone(),
            inner,
        })
    }
}

impl<T> fmt::Debug for TracedClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedClass")
            .field("name", &self.core.name)
            .field("file", &self.core.file)
            .field("methods", &self.method_names())
            .finish()
    }
}

/// One constructed instance of a traced type.
///
/// Dispatch goes through the class's fixed method table, so lookup via the
/// instance is traced exactly like lookup via the class. Dropping the
/// instance emits one `class_destroy` record.
pub struct TracedInstance<T> {
    class: TracedClass<T>,
    inner: Arc<T>,
}

impl<T> TracedInstance<T> {
    /// Dispatch one call. Unregistered names fail with `[SCOPE-001]`;
    /// excluded names execute without emitting anything.
    pub fn invoke(&self, name: &str, args: Vec<TraceValue>) -> Result<CallOutcome> {
        match self.class.core.methods.get(name) {
            Some(MethodEntry::Traced(method)) => Ok(method.invoke(&self.inner, args)),
            Some(MethodEntry::Passthrough(kind)) => Ok(kind.call(&self.inner, args)),
            None => Err(TraceError::UnknownMethod {
                class: self.class.core.name.to_string(),
                method: name.to_string(),
            }),
        }
    }

    /// The underlying value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn class(&self) -> &TracedClass<T> {
        &self.class
    }
}

impl<T> Drop for TracedInstance<T> {
    fn drop(&mut self) {
        self.class.core.sink.emit(TraceEvent::ClassDestroy {
            file: Arc::clone(&self.class.core.file),
            class: Arc::clone(&self.class.core.name),
        });
    }
}

impl<T: fmt::Debug> fmt::Debug for TracedInstance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedInstance")
            .field("class", &self.class.core.name)
            .field("inner", &self.inner)
            .finish()
    }
}
