use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use valueobj_core::{ValueObject, value_object};

#[derive(Debug, Clone)]
struct Money {
    amount: i64,
    currency: String,
}

value_object!(Money { amount, currency });

#[derive(Debug, Clone)]
struct DiscountedMoney {
    money: Money,
    rate: f64,
}

value_object!(DiscountedMoney { rate } extends money);

/// Hand-written comparison, the baseline the generic engine is measured against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlainMoney {
    amount: i64,
    currency: String,
}

#[derive(Debug, Clone)]
struct Batch {
    lines: Vec<Money>,
}

value_object!(Batch { lines });

fn money(amount: i64) -> Money {
    Money {
        amount,
        currency: "USD".to_string(),
    }
}

fn bench_equality(c: &mut Criterion) {
    let mut group = c.benchmark_group("equality");

    let a = DiscountedMoney {
        money: money(5),
        rate: 0.1,
    };
    let b = a.clone();
    group.bench_function("value_equals_derived", |bench| {
        bench.iter(|| black_box(&a).value_equals(Some(black_box(&b))))
    });

    let plain_a = PlainMoney {
        amount: 5,
        currency: "USD".to_string(),
    };
    let plain_b = plain_a.clone();
    group.bench_function("derived_partial_eq_baseline", |bench| {
        bench.iter(|| black_box(&plain_a) == black_box(&plain_b))
    });

    group.finish();
}

fn bench_hash_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_code");

    for size in [1usize, 16, 256].iter() {
        let batch = Batch {
            lines: (0..*size as i64).map(money).collect(),
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |bench, batch| {
            bench.iter(|| black_box(batch).hash_code())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_equality, bench_hash_code);
criterion_main!(benches);
