//! Turning raw observations into complete, labelled monthly series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::core::{months_are_contiguous, MonthlySeries};
use crate::data::observation::Observation;
use crate::error::{Error, Result};

/// The eight states and territories whose turnover series are kept.
pub const REGIONS: [&str; 8] = [
    "New South Wales",
    "Victoria",
    "Queensland",
    "South Australia",
    "Western Australia",
    "Tasmania",
    "Northern Territory",
    "Australian Capital Territory",
];

const CATEGORY: &str = "Turnover";

/// The three fields of a composite label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLabel {
    pub category: String,
    pub region: String,
    pub industry: String,
}

/// Split `"Turnover ;  Victoria ;  Food retailing ;"` into its fields.
///
/// Fields are trimmed and the empty field after the final separator is
/// dropped; anything other than exactly three non-empty fields is an error.
pub fn parse_label(label: &str) -> Result<SeriesLabel> {
    let mut fields: Vec<&str> = label.split(';').map(str::trim).collect();
    if fields.last() == Some(&"") {
        fields.pop();
    }
    match fields.as_slice() {
        [category, region, industry]
            if !category.is_empty() && !region.is_empty() && !industry.is_empty() =>
        {
            Ok(SeriesLabel {
                category: category.to_string(),
                region: region.to_string(),
                industry: industry.to_string(),
            })
        }
        _ => Err(Error::MalformedLabel(label.to_string())),
    }
}

/// Whether a label names turnover for one of the eight [`REGIONS`].
pub fn is_regional_turnover(label: &str) -> bool {
    let mut fields = label.split(';').map(str::trim);
    fields.next() == Some(CATEGORY) && fields.next().map_or(false, |r| REGIONS.contains(&r))
}

/// Industry aggregates such as "Total (Industry)".
pub fn is_aggregate_industry(industry: &str) -> bool {
    industry.starts_with("Total")
}

/// One cleaned series.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnoverSeries {
    pub series_id: String,
    pub label: SeriesLabel,
    pub series: MonthlySeries,
}

impl TurnoverSeries {
    pub fn region(&self) -> &str {
        &self.label.region
    }

    pub fn industry(&self) -> &str {
        &self.label.industry
    }
}

/// Complete series keyed by identifier, in identifier order.
#[derive(Debug, Clone)]
pub struct SeriesCollection {
    series: Vec<TurnoverSeries>,
    dropped: usize,
}

impl SeriesCollection {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TurnoverSeries> {
        self.series.iter()
    }

    /// Series discarded for a missing value or a calendar gap.
    pub fn dropped_incomplete(&self) -> usize {
        self.dropped
    }

    pub fn by_id(&self, series_id: &str) -> Result<&TurnoverSeries> {
        self.series
            .iter()
            .find(|s| s.series_id == series_id)
            .ok_or_else(|| Error::SeriesNotFound(series_id.to_string()))
    }

    pub fn by_region_industry(&self, region: &str, industry: &str) -> Result<&TurnoverSeries> {
        self.series
            .iter()
            .find(|s| s.region() == region && s.industry() == industry)
            .ok_or_else(|| Error::SeriesNotFound(format!("{} / {}", region, industry)))
    }

    /// Draw one series uniformly with a seeded generator.
    pub fn select_random(&self, seed: u64) -> Result<&TurnoverSeries> {
        if self.series.is_empty() {
            return Err(Error::EmptyData);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let index = rng.gen_range(0..self.series.len());
        Ok(&self.series[index])
    }
}

/// Filter, reshape and complete-case the raw table.
///
/// Keeps turnover rows for the eight regions, drops industry aggregates,
/// rejects negative turnover and duplicate months, and discards (with a
/// warning) any series with a missing value or a gap in its months.
pub fn clean(observations: &[Observation]) -> Result<SeriesCollection> {
    let mut grouped: BTreeMap<&str, (SeriesLabel, Vec<(NaiveDate, Option<f64>)>)> =
        BTreeMap::new();
    let mut skipped_rows = 0usize;

    for obs in observations {
        if !is_regional_turnover(&obs.label) {
            skipped_rows += 1;
            continue;
        }
        let label = parse_label(&obs.label)?;
        if is_aggregate_industry(&label.industry) {
            skipped_rows += 1;
            continue;
        }
        if let Some(value) = obs.value {
            if value < 0.0 {
                return Err(Error::NegativeTurnover {
                    series_id: obs.series_id.clone(),
                    value,
                });
            }
        }
        grouped
            .entry(obs.series_id.as_str())
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push((obs.month, obs.value));
    }
    debug!(
        rows = observations.len(),
        skipped_rows,
        series = grouped.len(),
        "filtered table"
    );

    let mut series = Vec::with_capacity(grouped.len());
    let mut dropped = 0usize;
    for (series_id, (label, mut rows)) in grouped {
        rows.sort_by_key(|(month, _)| *month);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::DuplicateMonth {
                series_id: series_id.to_string(),
                month: w[0].0.format("%Y-%m").to_string(),
            });
        }

        let months: Vec<NaiveDate> = rows.iter().map(|(m, _)| *m).collect();
        let values: Option<Vec<f64>> = rows.iter().map(|(_, v)| *v).collect();
        let values = match values {
            Some(values) if months_are_contiguous(&months) => values,
            _ => {
                debug!(series_id, "dropping incomplete series");
                dropped += 1;
                continue;
            }
        };

        series.push(TurnoverSeries {
            series_id: series_id.to_string(),
            series: MonthlySeries::from_months(series_id, &months, values)?,
            label,
        });
    }

    if dropped > 0 {
        warn!(dropped, kept = series.len(), "discarded series with missing months or values");
    }
    if series.is_empty() {
        return Err(Error::NoCompleteSeries { dropped });
    }
    info!(kept = series.len(), dropped, "cleaned turnover series");

    Ok(SeriesCollection { series, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn obs(id: &str, label: &str, m: NaiveDate, value: Option<f64>) -> Observation {
        Observation {
            series_id: id.to_string(),
            label: label.to_string(),
            month: m,
            value,
        }
    }

    fn rows(id: &str, label: &str, values: &[Option<f64>]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| obs(id, label, month(2020 + (i / 12) as i32, (i % 12) as u32 + 1), *v))
            .collect()
    }

    const VIC_FOOD: &str = "Turnover ;  Victoria ;  Food retailing ;";
    const NSW_CAFE: &str = "Turnover ;  New South Wales ;  Cafes, restaurants and takeaway food services ;";

    #[test]
    fn label_decomposes_into_three_fields() {
        let label = parse_label(VIC_FOOD).unwrap();
        assert_eq!(label.category, "Turnover");
        assert_eq!(label.region, "Victoria");
        assert_eq!(label.industry, "Food retailing");
    }

    #[test]
    fn malformed_labels_are_errors() {
        assert!(matches!(
            parse_label("Turnover ;  Victoria ;"),
            Err(Error::MalformedLabel(_))
        ));
        assert!(parse_label("Turnover ; Victoria ;  ;").is_err());
        assert!(parse_label("Turnover ; Victoria ; Food ; Extra ;").is_err());
    }

    #[test]
    fn region_filter() {
        assert!(is_regional_turnover(VIC_FOOD));
        assert!(!is_regional_turnover("Turnover ;  Total (State) ;  Food retailing ;"));
        assert!(!is_regional_turnover("Percentage change ;  Victoria ;  Food retailing ;"));
    }

    #[test]
    fn drops_incomplete_and_aggregate_series() {
        let mut data = rows("A1", VIC_FOOD, &[Some(1.0), Some(2.0), Some(3.0)]);
        data.extend(rows("A2", NSW_CAFE, &[Some(1.0), None, Some(3.0)]));
        data.extend(rows(
            "A3",
            "Turnover ;  Victoria ;  Total (Industry) ;",
            &[Some(5.0), Some(6.0), Some(7.0)],
        ));
        data.extend(rows(
            "A4",
            "Turnover ;  Total (State) ;  Food retailing ;",
            &[Some(5.0), Some(6.0), Some(7.0)],
        ));

        let collection = clean(&data).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.dropped_incomplete(), 1);
        let kept = collection.by_id("A1").unwrap();
        assert_eq!(kept.series.values(), &[1.0, 2.0, 3.0]);
        assert!(collection.by_id("A2").is_err());
        assert_eq!(
            collection
                .by_region_industry("Victoria", "Food retailing")
                .unwrap()
                .series_id,
            "A1"
        );
    }

    #[test]
    fn calendar_gap_drops_series() {
        let mut data = rows("A1", VIC_FOOD, &[Some(1.0), Some(2.0)]);
        data.push(obs("A1", VIC_FOOD, month(2020, 5), Some(3.0)));
        data.extend(rows("A2", NSW_CAFE, &[Some(1.0), Some(2.0)]));
        let collection = clean(&data).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.iter().next().unwrap().series_id, "A2");
    }

    #[test]
    fn unsorted_rows_are_ordered_by_month() {
        let mut data = rows("A1", VIC_FOOD, &[Some(1.0), Some(2.0), Some(3.0)]);
        data.reverse();
        let collection = clean(&data).unwrap();
        assert_eq!(collection.by_id("A1").unwrap().series.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn integrity_errors() {
        let mut dup = rows("A1", VIC_FOOD, &[Some(1.0), Some(2.0)]);
        dup.push(obs("A1", VIC_FOOD, month(2020, 2), Some(2.5)));
        assert!(matches!(clean(&dup), Err(Error::DuplicateMonth { .. })));

        let negative = rows("A1", VIC_FOOD, &[Some(1.0), Some(-2.0)]);
        assert!(matches!(clean(&negative), Err(Error::NegativeTurnover { .. })));

        let bad_label = rows("A1", "Turnover ;  Victoria ;", &[Some(1.0)]);
        assert!(matches!(clean(&bad_label), Err(Error::MalformedLabel(_))));

        let all_missing = rows("A1", VIC_FOOD, &[None, None]);
        assert!(matches!(
            clean(&all_missing),
            Err(Error::NoCompleteSeries { dropped: 1 })
        ));
    }

    #[test]
    fn seeded_selection_is_reproducible() {
        let mut data = Vec::new();
        for (i, region) in REGIONS.iter().enumerate() {
            let label = format!("Turnover ;  {} ;  Food retailing ;", region);
            data.extend(rows(&format!("S{}", i), &label, &[Some(1.0), Some(2.0)]));
        }
        let collection = clean(&data).unwrap();
        assert_eq!(collection.len(), 8);

        let first = collection.select_random(2024).unwrap().series_id.clone();
        let again = collection.select_random(2024).unwrap().series_id.clone();
        assert_eq!(first, again);
    }
}
