use std::hint::black_box;

use churn_scorer::features::{RawRecord, normalize, normalize_one};
use churn_scorer::ml::ChurnScorer;
use churn_scorer::ml::logreg::LogRegModel;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

const BATCH_SIZE: usize = 1_000;

fn raw_rows(count: usize) -> Vec<RawRecord> {
    let contracts = ["Month-to-Month", "one year", "TWO_YEAR", "weekly"];
    let services = ["dsl", "Fiber", "none", ""];
    let payments = ["electronic check", "Mailed-Check", "credit_card", "crypto"];
    (0..count)
        .map(|i| RawRecord {
            tenure_months: if i % 7 == 0 { Value::Null } else { json!(i % 72) },
            monthly_charges: json!(20.0 + (i % 90) as f64),
            total_charges: if i % 11 == 0 {
                json!("n/a")
            } else {
                json!((i * 13 % 8000) as f64)
            },
            contract_type: json!(contracts[i % contracts.len()]),
            internet_service: json!(services[i % services.len()]),
            payment_method: json!(payments[i % payments.len()]),
            paperless_billing: json!(i % 2 == 0),
        })
        .collect()
}

fn trained_like_model() -> LogRegModel {
    let mut model = LogRegModel::neutral();
    for (idx, weight) in model.weights.iter_mut().enumerate() {
        *weight = (idx as f64 - 6.0) * 0.15;
    }
    model.bias = -0.4;
    model
}

fn bench_normalize_batch(c: &mut Criterion) {
    let rows = raw_rows(BATCH_SIZE);
    c.bench_with_input(
        BenchmarkId::new("normalize_batch", BATCH_SIZE),
        &rows,
        |b, rows| b.iter(|| black_box(normalize(black_box(rows)))),
    );
}

fn bench_normalize_one(c: &mut Criterion) {
    let rows = raw_rows(1);
    c.bench_function("normalize_one", |b| {
        b.iter(|| black_box(normalize_one(black_box(&rows[0]))))
    });
}

fn bench_score(c: &mut Criterion) {
    let model = trained_like_model();
    let records = normalize(&raw_rows(BATCH_SIZE));
    c.bench_with_input(
        BenchmarkId::new("logreg_score", BATCH_SIZE),
        &records,
        |b, records| {
            b.iter(|| {
                let mut total = 0.0;
                for record in records {
                    total += model.score(record).unwrap_or(0.0);
                }
                black_box(total)
            })
        },
    );
}

criterion_group!(
    benches,
    bench_normalize_batch,
    bench_normalize_one,
    bench_score
);
criterion_main!(benches);
