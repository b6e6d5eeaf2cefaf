use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_engine::Reflector;
use mirror_types::{Boundary, ClassBuilder, ClassRef, Object, Value};

#[derive(Default)]
struct Sample {
    count: i64,
    label: String,
}

fn sample_class(boundary: &Arc<Boundary>, extra_operations: usize) -> ClassRef {
    let mut builder = ClassBuilder::<Sample>::new("bench.Sample").in_boundary(boundary);
    for i in 0..extra_operations {
        builder = builder.getter(&format!("getPadding{}", i), |s| s.count);
    }
    builder
        .getter("getCount", |s| s.count)
        .setter("setCount", |s, v: i64| s.count = v)
        .getter("getLabel", |s| s.label.clone())
        .method1_mut("add", |s, v: i64| {
            s.count += v;
            s.count
        })
        .build()
}

fn bench_indexed_vs_named(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");

    for extra in [0usize, 16, 64] {
        let reflector = Reflector::new();
        let class = sample_class(&Boundary::system(), extra);
        let obj = Object::new(class.clone(), Sample::default());
        let dispatcher = reflector.accessor(&class).unwrap();
        let index = dispatcher.index_of("add").unwrap();
        let args = [Value::Long(1)];

        group.bench_with_input(BenchmarkId::new("indexed", extra), &extra, |b, _| {
            b.iter(|| dispatcher.invoke(Some(&obj), black_box(index), &args).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("by_name", extra), &extra, |b, _| {
            b.iter(|| reflector.invoke(&obj, black_box("add"), &args).unwrap());
        });
    }

    group.finish();
}

fn bench_field_access(c: &mut Criterion) {
    let reflector = Reflector::new();
    let class = sample_class(&Boundary::system(), 8);
    let obj = Object::new(class, Sample::default());

    c.bench_function("get_field_value", |b| {
        b.iter(|| reflector.get_field_value(&obj, black_box("count")).unwrap());
    });

    c.bench_function("set_field_value", |b| {
        b.iter(|| {
            reflector
                .set_field_value(&obj, black_box("count"), Value::Long(3))
                .unwrap()
        });
    });
}

fn bench_cold_synthesis(c: &mut Criterion) {
    c.bench_function("synthesize_cold", |b| {
        b.iter(|| {
            // A fresh boundary per class, so realized tables are dropped with it
            let boundary = Boundary::new("bench");
            let reflector = Reflector::new();
            let class = sample_class(&boundary, 16);
            reflector.accessor(black_box(&class)).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_indexed_vs_named,
    bench_field_access,
    bench_cold_synthesis
);
criterion_main!(benches);
