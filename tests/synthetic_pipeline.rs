//! End-to-end scenario on a synthetic series with a known trend and season.

use std::f64::consts::PI;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;
use turnover_forecast::config::PipelineConfig;
use turnover_forecast::core::MonthlySeries;
use turnover_forecast::evaluation::{rank_by_aicc, ModelFamily};
use turnover_forecast::models::{BoxCoxForecaster, ETSSpec, Forecaster, ETS};
use turnover_forecast::pipeline::analyse_series;
use turnover_forecast::transform::{analyse, BoxCox};
use turnover_forecast::validation::ljung_box;

const LEVEL: f64 = 200.0;
const SLOPE: f64 = 1.5;
const AMPLITUDE: f64 = 12.0;

fn signal(t: usize) -> f64 {
    LEVEL + SLOPE * t as f64 + AMPLITUDE * (2.0 * PI * t as f64 / 12.0).sin()
}

fn synthetic(n: usize, seed: u64) -> MonthlySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let values = (0..n).map(|t| signal(t) + rng.sample(noise)).collect();
    MonthlySeries::new(
        "synthetic",
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        values,
    )
    .unwrap()
}

#[test]
fn additive_ets_tracks_trend_and_leaves_white_residuals() {
    let series = synthetic(60, 42);
    let split = series.split(12).unwrap();

    let mut model = BoxCoxForecaster::new(
        ETS::new("A,A,A".parse::<ETSSpec>().unwrap(), 12),
        BoxCox::new(1.0).unwrap(),
    );
    model.fit(&split.train).unwrap();

    let forecast = model.predict_with_intervals(12, &[80.0, 95.0]).unwrap();
    assert_eq!(forecast.horizon(), 12);
    for (h, &f) in forecast.point().iter().enumerate() {
        let truth = signal(48 + h);
        assert!(
            (f - truth).abs() < 6.0,
            "h={} forecast {} vs signal {}",
            h + 1,
            f,
            truth
        );
    }
    let pi95 = forecast.interval(95.0).unwrap();
    let pi80 = forecast.interval(80.0).unwrap();
    for h in 0..12 {
        assert!(pi95.lower[h] <= pi80.lower[h] && pi80.upper[h] <= pi95.upper[h]);
    }

    let stats = model.fit_statistics().unwrap();
    let lb = ljung_box(model.residuals().unwrap(), 24, stats.n_coefficients);
    assert!(lb.is_white_noise(0.05), "Ljung-Box p = {}", lb.p_value);
}

#[test]
fn transform_stage_on_synthetic_series() {
    let series = synthetic(60, 7);
    let report = analyse(series.values(), 12).unwrap();
    assert_eq!(report.differenced.len(), 60 - 13);
    assert_eq!(report.nsdiffs, 1);
    assert!(report.kpss_before.p_value <= 0.05);
}

#[test]
fn full_analysis_ranks_both_families() {
    let series = synthetic(84, 11);
    let config = PipelineConfig {
        charts: false,
        ..PipelineConfig::default()
    };
    let analysis = analyse_series(&series, &config).unwrap();
    assert_eq!(analysis.split.train.len(), 60);
    assert_eq!(analysis.outcomes.len(), 6);

    for family in [ModelFamily::Ets, ModelFamily::Arima] {
        let fitted = rank_by_aicc(&analysis.outcomes, family);
        assert_eq!(fitted.len(), 3, "{} candidates failed to fit", family);
        for report in fitted {
            assert!(report.statistics.aicc.is_finite(), "{}", report.name);
            assert!(report.accuracy.rmse.is_finite(), "{}", report.name);
            assert!(
                report.diagnostics.ljung_box.p_value.is_finite(),
                "{}",
                report.name
            );
            assert_eq!(report.forecast.horizon(), 24);
        }
    }

    let best_rmse = analysis
        .outcomes
        .iter()
        .filter_map(|o| o.report())
        .map(|r| r.accuracy.rmse)
        .fold(f64::INFINITY, f64::min);
    assert!(best_rmse < 8.0, "best test RMSE {}", best_rmse);
}
