//! Printed comparison tables and SVG charts.

pub mod charts;
mod tables;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::{MonthlySeries, TrainTestSplit};
use crate::error::Result;
use crate::evaluation::CandidateOutcome;
use crate::transform::TransformReport;

pub use tables::{
    write_accuracy_table, write_fit_table, write_ljung_box_table, write_transform_summary,
};

/// Months of training history shown before the forecast.
const FORECAST_TAIL: usize = 60;

/// Write all four tables, separated by headings.
pub fn write_tables<W: Write>(
    w: &mut W,
    transform: &TransformReport,
    outcomes: &[CandidateOutcome],
) -> Result<()> {
    writeln!(w, "== Transformation ==")?;
    write_transform_summary(w, transform)?;
    writeln!(w)?;
    writeln!(w, "== Fit (training set) ==")?;
    write_fit_table(w, outcomes)?;
    writeln!(w)?;
    writeln!(w, "== Accuracy (test set) ==")?;
    write_accuracy_table(w, outcomes)?;
    writeln!(w)?;
    writeln!(w, "== Ljung-Box (training residuals) ==")?;
    write_ljung_box_table(w, outcomes)?;
    Ok(())
}

/// File-system friendly version of a model name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Render every chart into `dir` and return the written paths.
pub fn render_charts(
    dir: &Path,
    series: &MonthlySeries,
    split: &TrainTestSplit,
    transform: &TransformReport,
    outcomes: &[CandidateOutcome],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut out = |name: String| {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };

    let title = series.name();
    charts::time_plot(&out("time.svg".into()), series, title)?;
    charts::seasonal_plot(&out("seasonal.svg".into()), series, title)?;
    charts::subseries_plot(&out("subseries.svg".into()), series, title)?;

    let diff_acf = crate::utils::acf(&transform.differenced, 24);
    let bound = 1.96 / (transform.differenced.len().max(1) as f64).sqrt();
    charts::acf_plot(
        &out("differenced_acf.svg".into()),
        &diff_acf,
        bound,
        "ACF of seasonally and ordinarily differenced series",
    )?;

    for report in outcomes.iter().filter_map(CandidateOutcome::report) {
        let stem = slug(&report.name);
        charts::residual_panel(&out(format!("residuals_{}.svg", stem)), report)?;
        charts::forecast_plot(
            &out(format!("forecast_{}.svg", stem)),
            &split.train,
            &split.test,
            report,
            FORECAST_TAIL,
        )?;
    }

    info!(charts = written.len(), dir = %dir.display(), "rendered charts");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::analyse_series;
    use chrono::NaiveDate;
    use std::f64::consts::PI;

    fn synthetic() -> MonthlySeries {
        let values = (0..84)
            .map(|i| {
                let t = i as f64;
                (300.0 + 1.5 * t) * (1.0 + 0.08 * (2.0 * PI * t / 12.0).sin())
                    + 2.0 * (1.7 * t).sin()
            })
            .collect();
        MonthlySeries::new(
            "Victoria / Food retailing",
            NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
            values,
        )
        .unwrap()
    }

    #[test]
    fn renders_every_chart() {
        let series = synthetic();
        let config = PipelineConfig {
            charts: false,
            ..PipelineConfig::default()
        };
        let analysis = analyse_series(&series, &config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("charts");

        let written = render_charts(
            &out,
            &series,
            &analysis.split,
            &analysis.transform,
            &analysis.outcomes,
        )
        .unwrap();

        let fitted: Vec<&str> = analysis
            .outcomes
            .iter()
            .filter_map(CandidateOutcome::report)
            .map(|r| r.name.as_str())
            .collect();
        assert!(!fitted.is_empty());
        assert_eq!(written.len(), 4 + 2 * fitted.len());

        let mut expected: Vec<String> = ["time", "seasonal", "subseries", "differenced_acf"]
            .iter()
            .map(|s| format!("{}.svg", s))
            .collect();
        for name in fitted {
            expected.push(format!("residuals_{}.svg", slug(name)));
            expected.push(format!("forecast_{}.svg", slug(name)));
        }
        for file in expected {
            let path = out.join(&file);
            assert!(written.contains(&path), "{} not reported", file);
            let svg = std::fs::read_to_string(&path).unwrap();
            assert!(svg.contains("<svg"), "{} is not an SVG document", file);
        }
    }

    #[test]
    fn slugs_are_path_safe() {
        assert_eq!(slug("ARIMA(2,1,0)(0,1,1)[12]"), "arima_2_1_0_0_1_1_12");
        assert_eq!(slug("AutoETS ETS(M,Ad,M)"), "autoets_ets_m_ad_m");
    }
}
