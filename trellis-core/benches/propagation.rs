//! Signal → memo → effect propagation, through the engine and the facade.

use std::hint::black_box;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use trellis_core::backend::NativeBackend;
use trellis_core::reactive::{Effect, Memo, Scope, Signal};
use trellis_core::{Facade, WatchOptions};

fn engine_chain(c: &mut Criterion) {
    let root = Scope::root();
    let signal = Signal::new(0_i64);
    let sink = Arc::new(AtomicI64::new(0));

    let source = signal.clone();
    let doubled = Memo::new(move || source.get() * 2);
    let sink_clone = sink.clone();
    root.run(|| {
        Effect::new(move || sink_clone.store(doubled.get(), Ordering::Relaxed));
    })
    .expect("fresh root");

    let mut next = 0;
    c.bench_function("engine signal->memo->effect", |b| {
        b.iter(|| {
            next += 1;
            signal.set(black_box(next));
        })
    });

    root.dispose();
}

fn facade_chain(c: &mut Criterion) {
    let rx = Facade::new(NativeBackend::new());
    let sink = Arc::new(AtomicI64::new(0));
    let prop = rx.use_prop(0_i64);
    let doubled = {
        let prop = prop.clone();
        rx.use_formula(move || prop.get() * 2)
    };

    let scope = rx.use_root(|| {
        let sink = sink.clone();
        rx.do_watch(
            move || sink.store(doubled.get(), Ordering::Relaxed),
            WatchOptions::new(),
        );
        Scope::current()
    });

    let mut next = 0;
    c.bench_function("facade prop->formula->watch", |b| {
        b.iter(|| {
            next += 1;
            prop.set(black_box(next));
        })
    });

    if let Some(scope) = scope {
        scope.dispose();
    }
}

criterion_group!(benches, engine_chain, facade_chain);
criterion_main!(benches);
