//! Benchmarks for candidate fitting and the transform stage.

use std::f64::consts::PI;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use turnover_forecast::core::MonthlySeries;
use turnover_forecast::models::{ARIMAOrder, AutoARIMA, AutoETS, ETSSpec, Forecaster, ARIMA, ETS};
use turnover_forecast::transform::{analyse, guerrero_lambda};

fn turnover_like(n: usize) -> MonthlySeries {
    let values = (0..n)
        .map(|i| {
            let t = i as f64;
            (500.0 + 3.0 * t) * (1.0 + 0.12 * (2.0 * PI * t / 12.0).sin()) + 8.0 * (1.7 * t).sin()
        })
        .collect();
    MonthlySeries::new("bench", NaiveDate::from_ymd_opt(1982, 4, 1).unwrap(), values).unwrap()
}

fn bench_ets(c: &mut Criterion) {
    let mut group = c.benchmark_group("ets_fit");
    for size in [120, 240, 480].iter() {
        let series = turnover_like(*size);
        for spec in ["M,A,M", "A,Ad,A"] {
            let spec: ETSSpec = spec.parse().unwrap();
            group.bench_with_input(BenchmarkId::new(spec.short_name(), size), size, |b, _| {
                b.iter(|| {
                    let mut model = ETS::new(spec, 12);
                    model.fit(black_box(&series)).unwrap();
                })
            });
        }
    }
    group.finish();
}

fn bench_arima(c: &mut Criterion) {
    let mut group = c.benchmark_group("arima_fit");
    let order: ARIMAOrder = "(2,1,0)(0,1,1)".parse().unwrap();
    for size in [120, 240, 480].iter() {
        let series = turnover_like(*size);
        group.bench_with_input(BenchmarkId::new("ARIMA(2,1,0)(0,1,1)", size), size, |b, _| {
            b.iter(|| {
                let mut model = ARIMA::new(order);
                model.fit(black_box(&series)).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_auto(c: &mut Criterion) {
    let mut group = c.benchmark_group("automatic_selection");
    group.sample_size(10);
    let series = turnover_like(240);
    group.bench_function("AutoETS", |b| {
        b.iter(|| {
            let mut model = AutoETS::new(12);
            model.fit(black_box(&series)).unwrap();
        })
    });
    group.bench_function("AutoARIMA", |b| {
        b.iter(|| {
            let mut model = AutoARIMA::new(12);
            model.fit(black_box(&series)).unwrap();
        })
    });
    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let series = turnover_like(480);
    c.bench_function("guerrero_lambda_480", |b| {
        b.iter(|| guerrero_lambda(black_box(series.values()), 12).unwrap())
    });
    c.bench_function("transform_stage_480", |b| {
        b.iter(|| analyse(black_box(series.values()), 12).unwrap())
    });
}

criterion_group!(benches, bench_ets, bench_arima, bench_auto, bench_transform);
criterion_main!(benches);
