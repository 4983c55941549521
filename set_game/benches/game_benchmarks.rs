use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use set_game::{BoardState, CardId, FeatureOracle, SetOracle};

/// Helper to draw `n` distinct cards from a seeded shuffle of the full deck
fn seeded_cards(n: usize, seed: u64) -> Vec<CardId> {
    let mut deck: Vec<CardId> = (0..81).collect();
    deck.shuffle(&mut StdRng::seed_from_u64(seed));
    deck.truncate(n);
    deck
}

/// Benchmark a single set check
fn bench_is_valid_set(c: &mut Criterion) {
    let oracle = FeatureOracle::new(3, 4);

    c.bench_function("is_valid_set", |b| {
        b.iter(|| oracle.is_valid_set(&[0, 40, 80]));
    });
}

/// Benchmark set search over tables of different sizes
fn bench_find_sets(c: &mut Criterion) {
    let oracle = FeatureOracle::new(3, 4);
    let mut group = c.benchmark_group("find_sets");

    for n_cards in [12, 15, 21, 81].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_cards", n_cards)),
            n_cards,
            |b, &n| {
                let cards = seeded_cards(n, 17);
                b.iter(|| oracle.find_sets(&cards, usize::MAX));
            },
        );
    }

    group.finish();
}

/// Benchmark the end-of-game check over the deck and table combined
fn bench_exists_set(c: &mut Criterion) {
    let oracle = FeatureOracle::new(3, 4);
    // (0,0) (1,0) (0,1) (1,1) in the first two features: worst case, no set
    let cap = vec![0, 1, 3, 4];
    let full = seeded_cards(81, 3);

    c.bench_function("exists_set_no_set", |b| {
        b.iter(|| oracle.exists_set(&cap));
    });
    c.bench_function("exists_set_full_deck", |b| {
        b.iter(|| oracle.exists_set(&full));
    });
}

/// Benchmark a round of token toggles on a full table
fn bench_token_toggles(c: &mut Criterion) {
    let mut board = BoardState::new(12, 81, 4, 3);
    for (slot, card) in seeded_cards(12, 5).into_iter().enumerate() {
        board.place_card(card, slot).unwrap();
    }

    c.bench_function("toggle_tokens_4_players", |b| {
        b.iter(|| {
            for player in 0..4 {
                for slot in 0..12 {
                    board.toggle_token(player, slot);
                }
            }
        });
    });
}

criterion_group!(oracle, bench_is_valid_set, bench_find_sets, bench_exists_set);

criterion_group!(board, bench_token_toggles);

criterion_main!(oracle, board);
