use broadside_server::protocol::PlayerIdentity;
use broadside_server::server::{find_compatible_pairs, WaitingEntry};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use uuid::Uuid;

/// Ratings spread over 800..1600 in a fixed pattern so runs are comparable.
fn waiting_room(size: usize) -> Vec<WaitingEntry> {
    (0..size)
        .map(|index| WaitingEntry {
            sequence: index as u64,
            connection_id: Uuid::new_v4(),
            identity: PlayerIdentity {
                user_id: index as i64 + 1,
                username: format!("player{index}"),
                elo: 800 + ((index * 7919) % 800) as i32,
            },
        })
        .collect()
}

fn bench_pairing_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_compatible_pairs");
    for size in [100usize, 1_000, 5_000] {
        let queue = waiting_room(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &queue, |b, queue| {
            b.iter(|| black_box(find_compatible_pairs(black_box(queue), 200)));
        });
    }
    group.finish();

    // Nobody is within range: every outer entry scans the whole tail.
    c.bench_function("find_compatible_pairs_no_match", |b| {
        let queue: Vec<WaitingEntry> = waiting_room(1_000)
            .into_iter()
            .enumerate()
            .map(|(index, mut entry)| {
                entry.identity.elo = index as i32 * 500;
                entry
            })
            .collect();
        b.iter(|| black_box(find_compatible_pairs(black_box(&queue), 200)));
    });
}

criterion_group!(matchmaking_sweep, bench_pairing_sweep);
criterion_main!(matchmaking_sweep);
