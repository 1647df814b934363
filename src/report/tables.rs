//! Plain-text comparison tables.

use std::io::Write;

use crate::error::Result;
use crate::evaluation::{rank_by_aicc, CandidateOutcome, ModelFamily};
use crate::transform::TransformReport;

const NAME_WIDTH: usize = 36;
const FAMILIES: [ModelFamily; 2] = [ModelFamily::Ets, ModelFamily::Arima];

fn num(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else if value.is_infinite() {
        "Inf".to_string()
    } else {
        format!("{:.*}", precision, value)
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| num(v, precision))
}

fn rule<W: Write>(w: &mut W, width: usize) -> Result<()> {
    writeln!(w, "{}", "-".repeat(width))?;
    Ok(())
}

fn failures<'a>(
    outcomes: &'a [CandidateOutcome],
    family: ModelFamily,
) -> impl Iterator<Item = (&'a str, String)> + 'a {
    outcomes.iter().filter_map(move |o| match o {
        CandidateOutcome::Failed {
            name,
            family: f,
            error,
        } if *f == family => Some((name.as_str(), error.to_string())),
        _ => None,
    })
}

/// In-sample fit statistics, each family ranked by AICc.
pub fn write_fit_table<W: Write>(w: &mut W, outcomes: &[CandidateOutcome]) -> Result<()> {
    let width = NAME_WIDTH + 6 + 4 * 13 + 10;
    writeln!(
        w,
        "{:<6} {:<name$} {:>12} {:>12} {:>12} {:>12} {:>9}",
        "Family",
        "Model",
        "AICc",
        "AIC",
        "BIC",
        "sigma^2",
        "converged",
        name = NAME_WIDTH
    )?;
    rule(w, width)?;
    for family in FAMILIES {
        for report in rank_by_aicc(outcomes, family) {
            let s = &report.statistics;
            writeln!(
                w,
                "{:<6} {:<name$} {:>12} {:>12} {:>12} {:>12} {:>9}",
                family.to_string(),
                report.name,
                num(s.aicc, 2),
                num(s.aic, 2),
                num(s.bic, 2),
                num(s.sigma2, 5),
                if s.converged { "yes" } else { "no" },
                name = NAME_WIDTH
            )?;
        }
        for (name, error) in failures(outcomes, family) {
            writeln!(
                w,
                "{:<6} {:<name$} failed: {}",
                family.to_string(),
                name,
                error,
                name = NAME_WIDTH
            )?;
        }
    }
    Ok(())
}

/// Test-set accuracy of every fitted candidate.
pub fn write_accuracy_table<W: Write>(w: &mut W, outcomes: &[CandidateOutcome]) -> Result<()> {
    let width = NAME_WIDTH + 7 * 11;
    writeln!(
        w,
        "{:<name$} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Model",
        "ME",
        "RMSE",
        "MAE",
        "MPE",
        "MAPE",
        "MASE",
        "RMSSE",
        name = NAME_WIDTH
    )?;
    rule(w, width)?;
    for report in outcomes.iter().filter_map(CandidateOutcome::report) {
        let a = &report.accuracy;
        writeln!(
            w,
            "{:<name$} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            report.name,
            num(a.me, 3),
            num(a.rmse, 3),
            num(a.mae, 3),
            opt(a.mpe, 3),
            opt(a.mape, 3),
            opt(a.mase, 3),
            opt(a.rmsse, 3),
            name = NAME_WIDTH
        )?;
    }
    Ok(())
}

/// Ljung-Box results on the training residuals, with the ACF lags that
/// cross the 95 % bound.
pub fn write_ljung_box_table<W: Write>(w: &mut W, outcomes: &[CandidateOutcome]) -> Result<()> {
    writeln!(
        w,
        "{:<name$} {:>10} {:>5} {:>5} {:>10}  {}",
        "Model",
        "Q",
        "lag",
        "df",
        "p-value",
        "ACF lags outside bound",
        name = NAME_WIDTH
    )?;
    rule(w, NAME_WIDTH + 57)?;
    for report in outcomes.iter().filter_map(CandidateOutcome::report) {
        let lb = &report.diagnostics.ljung_box;
        let lags = report.diagnostics.significant_lags();
        let lags = if lags.is_empty() {
            "none".to_string()
        } else {
            lags.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        writeln!(
            w,
            "{:<name$} {:>10} {:>5} {:>5} {:>10}  {}",
            report.name,
            num(lb.statistic, 3),
            lb.lags,
            lb.df,
            num(lb.p_value, 4),
            lags,
            name = NAME_WIDTH
        )?;
    }
    Ok(())
}

/// Box-Cox and differencing summary.
pub fn write_transform_summary<W: Write>(w: &mut W, report: &TransformReport) -> Result<()> {
    writeln!(w, "Box-Cox lambda (Guerrero)   {}", num(report.lambda(), 4))?;
    writeln!(
        w,
        "KPSS before differencing    stat {}  p {}",
        num(report.kpss_before.statistic, 4),
        num(report.kpss_before.p_value, 3)
    )?;
    writeln!(
        w,
        "KPSS after differencing     stat {}  p {}",
        num(report.kpss_after.statistic, 4),
        num(report.kpss_after.p_value, 3)
    )?;
    writeln!(
        w,
        "Strength of trend / season  {} / {}",
        num(report.trend_strength, 3),
        num(report.seasonal_strength, 3)
    )?;
    writeln!(w, "Seasonal differences (nsdiffs)  {}", report.nsdiffs)?;
    writeln!(w, "Ordinary differences (ndiffs)   {}", report.ndiffs)?;
    writeln!(
        w,
        "Differenced length          {} ({} lost)",
        report.differenced.len(),
        report.plan.lost()
    )?;
    Ok(())
}
