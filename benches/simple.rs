use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexring::diff_codec::{pack_data, unpack_data};
use lexring::engine::{LexiconEngine, Mode, PutTarget, RuleTarget, SearchFlags};
use lexring::key_codec::{pack_key, unpack_key};
use tempfile::tempdir;

fn build_engine() -> LexiconEngine {
    let dir = tempdir().unwrap();
    let mut engine = LexiconEngine::open(dir.path().join("bench.redb"), Mode::Create).unwrap();
    // Leak the tempdir so the database file outlives this function; the
    // process exits at the end of the benchmark run anyway.
    std::mem::forget(dir);

    engine
        .rule_insert(RuleTarget::LexicalClass, 0, r"^(ab)cd$")
        .unwrap();
    engine
        .rule_insert(RuleTarget::General, 0, r"^(a.*a)")
        .unwrap();
    engine
        .rule_insert(RuleTarget::Corrector, 0, r"(a)\+b 1x")
        .unwrap();
    engine.put("ab", "a+b", PutTarget::ImplicitBase, false).unwrap();
    engine.put("cadidio", "ca+didio", PutTarget::Exception, false).unwrap();
    engine
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexring");
    group.measurement_time(Duration::from_secs(5)).sample_size(100);

    group.bench_function("pack_key short word", |b| {
        b.iter(|| pack_key(black_box(b"cadidio")).unwrap())
    });

    let packed = pack_key(b"cadidio").unwrap();
    group.bench_function("unpack_key short word", |b| {
        b.iter(|| unpack_key(black_box(&packed), 51).unwrap())
    });

    group.bench_function("pack_data replace-heavy diff", |b| {
        b.iter(|| pack_data(black_box(b"cadidio"), black_box(b"ca+didibo")).unwrap())
    });

    let diff = pack_data(b"cadidio", b"ca+didibo").unwrap();
    group.bench_function("unpack_data replace-heavy diff", |b| {
        b.iter(|| unpack_data(black_box(b"cadidio"), black_box(&diff)))
    });

    let mut engine = build_engine();
    group.bench_function("search exception hit", |b| {
        b.iter(|| engine.search(black_box("cadidio"), SearchFlags::ALL).unwrap())
    });
    group.bench_function("search implicit-form hit", |b| {
        b.iter(|| engine.search(black_box("abcd"), SearchFlags::ALL).unwrap())
    });
    group.bench_function("search falls through to general rule", |b| {
        b.iter(|| engine.search(black_box("anna"), SearchFlags::ALL).unwrap())
    });
    group.bench_function("search miss", |b| {
        b.iter(|| engine.search(black_box("zzz"), SearchFlags::ALL).unwrap())
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
