//! Property-based tests for cleaning, splitting and differencing.
//!
//! Generated tables mix complete series, series with holes, aggregates and
//! rows outside the eight regions; the cleaner must keep exactly the complete
//! regional series.

use chrono::NaiveDate;
use proptest::prelude::*;
use turnover_forecast::core::{add_months, MonthlySeries};
use turnover_forecast::data::{clean, parse_label, Observation, REGIONS};
use turnover_forecast::transform::DifferencingPlan;

const INDUSTRIES: [&str; 4] = [
    "Food retailing",
    "Clothing, footwear and personal accessory retailing",
    "Department stores",
    "Total (Industry)",
];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 4, 1).unwrap()
}

/// One generated series: region index (8 = outside the regions), industry
/// index, values with optional holes.
fn series_strategy() -> impl Strategy<Value = (usize, usize, Vec<Option<f64>>)> {
    (
        0usize..9,
        0usize..INDUSTRIES.len(),
        prop::collection::vec(prop::option::weighted(0.97, 0.0..5000.0_f64), 1..60),
    )
}

fn build_table(specs: &[(usize, usize, Vec<Option<f64>>)]) -> Vec<Observation> {
    let mut rows = Vec::new();
    for (k, (region, industry, values)) in specs.iter().enumerate() {
        let region = REGIONS.get(*region).copied().unwrap_or("Total (State)");
        let label = format!("Turnover ;  {} ;  {} ;", region, INDUSTRIES[*industry]);
        for (i, value) in values.iter().enumerate() {
            rows.push(Observation {
                series_id: format!("A{:04}", k),
                label: label.clone(),
                month: add_months(start(), i).unwrap(),
                value: *value,
            });
        }
    }
    rows
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn retained_series_are_complete_and_labelled(
        specs in prop::collection::vec(series_strategy(), 1..12)
    ) {
        let expected = specs
            .iter()
            .filter(|(r, i, v)| *r < 8 && *i < 3 && v.iter().all(Option::is_some))
            .count();

        match clean(&build_table(&specs)) {
            Ok(collection) => {
                prop_assert_eq!(collection.len(), expected);
                for s in collection.iter() {
                    prop_assert!(s.series.values().iter().all(|v| v.is_finite() && *v >= 0.0));
                    let label = format!(
                        "{} ;  {} ;  {} ;",
                        s.label.category, s.label.region, s.label.industry
                    );
                    let parsed = parse_label(&label).unwrap();
                    prop_assert!(!parsed.category.is_empty());
                    prop_assert!(REGIONS.contains(&parsed.region.as_str()));
                    prop_assert!(!parsed.industry.starts_with("Total"));
                }
            }
            Err(_) => prop_assert_eq!(expected, 0),
        }
    }

    #[test]
    fn split_sizes_are_positional(len in 25usize..400) {
        let values: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
        let series = MonthlySeries::new("s", start(), values).unwrap();
        let split = series.split(24).unwrap();
        prop_assert_eq!(split.test.len(), 24);
        prop_assert_eq!(split.train.len(), len - 24);
        prop_assert_eq!(split.test.values()[0], series.values()[len - 24]);
        prop_assert_eq!(split.test.start(), series.month_at(len - 24).unwrap());
    }

    #[test]
    fn differencing_round_trip(values in prop::collection::vec(1.0..1000.0_f64, 14..200)) {
        let (diffed, plan) = DifferencingPlan::apply(&values, 1, 1, 12);
        prop_assert_eq!(diffed.len(), values.len() - 13);
        let rebuilt = plan.integrate(&diffed);
        prop_assert_eq!(rebuilt.len(), values.len());
        for (a, b) in values.iter().zip(&rebuilt) {
            prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
        }
    }
}

#[test]
fn short_series_cannot_be_split() {
    let series = MonthlySeries::new("s", start(), vec![1.0; 24]).unwrap();
    assert!(series.split(24).is_err());
}
