//! Demo: trace a small calculator type, NDJSON to stdout.
//!
//! Run: cargo run --example calc_trace
//!
//! Each line on stdout is one trace record; set RUST_LOG=debug to also see
//! the crate's installation diagnostics on stderr.

use std::sync::Arc;

use futures::FutureExt;
use tracing_subscriber::EnvFilter;

use callscope::{CallError, ConsoleSink, TraceOptions, TraceValue, TracedClass};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let sink = Arc::new(ConsoleSink::stdout());

    let calc = TracedClass::<()>::builder("Calc", sink)
        .constructor(|_args| ())
        .method("add", |_recv, args| {
            let a = args[0].to_json().as_i64().unwrap_or(0);
            let b = args[1].to_json().as_i64().unwrap_or(0);
            Ok(TraceValue::from(a + b))
        })
        .method("div", |_recv, args| {
            let a = args[0].to_json().as_i64().unwrap_or(0);
            let b = args[1].to_json().as_i64().unwrap_or(0);
            if b == 0 {
                return Err(CallError::new("RangeError", "divide by zero"));
            }
            Ok(TraceValue::from(a / b))
        })
        .method_async("add_later", |_recv, args| {
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                let a = args[0].to_json().as_i64().unwrap_or(0);
                let b = args[1].to_json().as_i64().unwrap_or(0);
                Ok(TraceValue::from(a + b))
            }
            .boxed()
        })
        .method("scratch", |_recv, _args| Ok(TraceValue::Null))
        .options(TraceOptions::new().exclude("scratch"))
        .build()?;

    let instance = calc.construct(vec![])?;

    // Plain success: call + return records.
    instance.invoke("add", vec![2i64.into(), 3i64.into()])?;

    // Failure: the return record carries an error descriptor; the caller
    // still gets the original error value.
    let err = instance
        .invoke("div", vec![1i64.into(), 0i64.into()])?
        .ready()
        .expect("div is synchronous")
        .unwrap_err();
    eprintln!("caller observed: {err}");

    // Async: the call record lands now, the return record at settlement.
    instance
        .invoke("add_later", vec![4i64.into(), 5i64.into()])?
        .settled()
        .await?;

    // Excluded: executes silently.
    instance.invoke("scratch", vec![])?;

    // Dropping the instance appends class_destroy.
    drop(instance);
    Ok(())
}
