use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexring::engine::{LexiconEngine, Mode, PutTarget, RuleTarget, SearchFlags};
use tempfile::tempdir;

/// Letters safe to combine freely: none are vowels, G1, or G3 members, so no
/// generated key or value below can ever trip an adjacency/initial-letter
/// rejection.
const SAFE: &[u8] = b"npqrstuvwxyz";

/// Encodes `i` as a fixed-width string over [`SAFE`].
fn encode(i: usize, width: usize) -> String {
    let base = SAFE.len();
    let mut idx = i;
    let mut bytes = Vec::with_capacity(width);
    for _ in 0..width {
        bytes.push(SAFE[idx % base]);
        idx /= base;
    }
    String::from_utf8(bytes).unwrap()
}

/// Builds an engine with a moderately sized exception dictionary, to profile
/// lookup cost once the ordered store is not trivially small.
fn build_loaded_engine(n: usize) -> LexiconEngine {
    let dir = tempdir().unwrap();
    let mut engine = LexiconEngine::open(dir.path().join("profile.redb"), Mode::Create).unwrap();
    std::mem::forget(dir);

    engine
        .rule_insert(RuleTarget::General, 0, r"^(a.*a)")
        .unwrap();

    for i in 0..n {
        let key = encode(i, 5);
        // Replace the last letter, so each record carries a nontrivial (but
        // tiny) diff script rather than the empty-diff sentinel.
        let mut value_bytes = key.clone().into_bytes();
        let last = value_bytes.len() - 1;
        value_bytes[last] = SAFE[(i + 1) % SAFE.len()];
        let value = String::from_utf8(value_bytes).unwrap();
        engine.put(&key, &value, PutTarget::Exception, false).unwrap();
    }
    engine
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexring-profiler");
    group.measurement_time(Duration::from_secs(8)).sample_size(50);

    let mut engine = build_loaded_engine(2_000);
    let hit_key = encode(1, 5);
    let miss_key = "zzzzz".to_string();

    group.bench_function("exception lookup in a 2000-record dictionary (hit)", |b| {
        b.iter(|| engine.search(black_box(&hit_key), SearchFlags::ALL).unwrap())
    });

    group.bench_function("exception lookup in a 2000-record dictionary (miss)", |b| {
        b.iter(|| engine.search(black_box(&miss_key), SearchFlags::ALL).unwrap())
    });

    group.bench_function("full ascending cursor walk over 2000 records", |b| {
        b.iter(|| {
            let mut direction = lexring::store::SeqDirection::First;
            let mut count = 0u32;
            loop {
                match engine.seq(lexring::engine::SeqTarget::ExceptionRaw, direction) {
                    Ok(_) => {
                        count += 1;
                        direction = lexring::store::SeqDirection::Next;
                    }
                    Err(_) => break,
                }
            }
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
