//! Benchmark: Interception Overhead
//!
//! Measures what wrapping adds on top of a raw call, plus the cost of the
//! payload encoding that dominates each emission.
//!
//! Run: cargo bench --bench wrap_overhead

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use callscope::{MemorySink, NoopSink, TraceOptions, TraceValue, TracedClass, TracedFunction};

fn add(args: &[TraceValue]) -> callscope::CallResult {
    let a = args[0].to_json().as_i64().unwrap_or(0);
    let b = args[1].to_json().as_i64().unwrap_or(0);
    Ok(TraceValue::from(a + b))
}

/// Wrapped call vs the bare closure
fn bench_wrapped_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrapped_call");

    group.bench_function("raw_closure", |b| {
        b.iter(|| {
            let args = vec![TraceValue::from(2i64), TraceValue::from(3i64)];
            black_box(add(black_box(&args)))
        });
    });

    {
        let traced = TracedFunction::wrap(
            "add",
            None,
            &TraceOptions::new(),
            Arc::new(NoopSink),
            |args| add(args),
        );
        group.bench_function("noop_sink", |b| {
            b.iter(|| {
                let args = vec![TraceValue::from(2i64), TraceValue::from(3i64)];
                black_box(traced.invoke(black_box(args)).ready())
            });
        });
    }

    {
        let sink = MemorySink::new();
        let traced = TracedFunction::wrap(
            "add",
            None,
            &TraceOptions::new(),
            Arc::new(sink),
            |args| add(args),
        );
        group.bench_function("memory_sink", |b| {
            b.iter(|| {
                let args = vec![TraceValue::from(2i64), TraceValue::from(3i64)];
                black_box(traced.invoke(black_box(args)).ready())
            });
        });
    }

    group.finish();
}

/// Instance dispatch through a traced method table
fn bench_instance_dispatch(c: &mut Criterion) {
    let class = TracedClass::<i64>::builder("Calc", Arc::new(NoopSink))
        .constructor(|_args| 0)
        .method("add", |recv, args| {
            let n = args[0].to_json().as_i64().unwrap_or(0);
            Ok(TraceValue::from(recv + n))
        })
        .build()
        .expect("registration is valid");
    let instance = class.construct(vec![]).expect("constructor registered");

    c.bench_function("instance_dispatch", |b| {
        b.iter(|| {
            let outcome = instance
                .invoke("add", vec![TraceValue::from(black_box(3i64))])
                .expect("method registered");
            black_box(outcome.ready())
        });
    });
}

/// Payload encoding: flat, nested, and cyclic values
fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    let flat = TraceValue::from(json!({"id": 7, "name": "calc", "ok": true}));
    group.bench_function("flat_object", |b| {
        b.iter(|| black_box(flat.to_json()));
    });

    let nested = TraceValue::from(json!({
        "batch": [{"op": "add", "args": [2, 3]}, {"op": "mul", "args": [4, 5]}],
        "meta": {"depth": [[1, [2, [3]]]]}
    }));
    group.bench_function("nested_tree", |b| {
        b.iter(|| black_box(nested.to_json()));
    });

    let cyclic = TraceValue::object([("id".to_string(), TraceValue::from(1i64))]);
    cyclic.insert("self", cyclic.clone());
    group.bench_function("cyclic_object", |b| {
        b.iter(|| black_box(cyclic.to_json()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_wrapped_call,
    bench_instance_dispatch,
    bench_encoding
);
criterion_main!(benches);
