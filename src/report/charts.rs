//! SVG charts of the selected series and the candidate fits.

use std::ops::Range;
use std::path::Path;

use chrono::Datelike;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::core::{MonthlySeries, MONTHS_PER_YEAR};
use crate::error::{Error, Result};
use crate::evaluation::{Histogram, ModelReport};

const SIZE: (u32, u32) = (1024, 640);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 24);
const PANEL_FONT: (&str, u32) = ("sans-serif", 16);

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Padded range over the finite values.
fn value_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let pad = if max > min { 0.05 * (max - min) } else { 1.0 };
    (min - pad)..(max + pad)
}

fn year_label(series: &MonthlySeries, x: f64) -> String {
    let index = x.round().max(0.0) as usize;
    series
        .month_at(index)
        .map(|m| m.format("%Y %b").to_string())
        .unwrap_or_default()
}

/// Turnover against month.
pub fn time_plot(path: &Path, series: &MonthlySeries, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..series.len() as f64, value_range(series.values()))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_label_formatter(&|x: &f64| year_label(series, *x))
        .y_desc("Turnover ($m)")
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(
            series.values().iter().enumerate().map(|(i, &v)| (i as f64, v)),
            &BLUE,
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// One line per calendar year over the months of the year.
pub fn seasonal_plot(path: &Path, series: &MonthlySeries, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1f64..MONTHS_PER_YEAR as f64, value_range(series.values()))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Turnover ($m)")
        .draw()
        .map_err(plot_err)?;

    let mut years: Vec<(i32, Vec<(f64, f64)>)> = Vec::new();
    for (month, &value) in series.months().iter().zip(series.values()) {
        let point = (month.month() as f64, value);
        match years.last_mut() {
            Some((year, points)) if *year == month.year() => points.push(point),
            _ => years.push((month.year(), vec![point])),
        }
    }
    for (i, (year, points)) in years.into_iter().enumerate() {
        let color = Palette99::pick(i);
        chart
            .draw_series(LineSeries::new(points, &color))
            .map_err(plot_err)?
            .label(year.to_string())
            .legend(move |(x, y)| {
                PathElement::new(
                    vec![(x, y), (x + 16, y)],
                    Palette99::pick(i).stroke_width(2),
                )
            });
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// One panel per month of the year, each with its mean as a horizontal line.
pub fn subseries_plot(path: &Path, series: &MonthlySeries, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let root = root.titled(title, CAPTION_FONT).map_err(plot_err)?;

    let range = value_range(series.values());
    let panels = root.split_evenly((3, 4));
    for (slot, panel) in panels.iter().enumerate() {
        let position = slot as u32 + 1;
        let points: Vec<(f64, f64)> = series
            .months()
            .iter()
            .zip(series.values())
            .filter(|(m, _)| m.month() == position)
            .enumerate()
            .map(|(i, (_, &v))| (i as f64, v))
            .collect();
        if points.is_empty() {
            continue;
        }
        let mean = points.iter().map(|(_, v)| v).sum::<f64>() / points.len() as f64;
        let width = points.len() as f64;
        let caption = chrono::Month::try_from(position as u8)
            .map(|m| m.name()[..3].to_string())
            .unwrap_or_else(|_| position.to_string());

        let mut chart = ChartBuilder::on(panel)
            .caption(caption, PANEL_FONT)
            .margin(6)
            .y_label_area_size(45)
            .build_cartesian_2d(0f64..width, range.clone())
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_labels(4)
            .draw()
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(points, &BLUE))
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(vec![(0.0, mean), (width, mean)], &RED))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_acf<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    acf: &[f64],
    bound: f64,
    caption: &str,
) -> Result<()> {
    let max_lag = acf.len() as f64 + 1.0;
    let extent = acf
        .iter()
        .fold(bound.abs(), |m, r| if r.is_finite() { m.max(r.abs()) } else { m })
        .max(0.1)
        * 1.1;
    let mut chart = ChartBuilder::on(area)
        .caption(caption, PANEL_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(0f64..max_lag, -extent..extent)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Lag")
        .disable_x_mesh()
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(acf.iter().enumerate().map(|(i, &r)| {
            let lag = (i + 1) as f64;
            PathElement::new(vec![(lag, 0.0), (lag, r)], BLACK.stroke_width(2))
        }))
        .map_err(plot_err)?;
    if bound.is_finite() {
        for level in [bound, -bound] {
            chart
                .draw_series(LineSeries::new(
                    vec![(0.0, level), (max_lag, level)],
                    &BLUE,
                ))
                .map_err(plot_err)?;
        }
    }
    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    histogram: &Histogram,
    caption: &str,
) -> Result<()> {
    let x_range = value_range(histogram.edges.iter());
    let top = histogram.counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.1;
    let mut chart = ChartBuilder::on(area)
        .caption(caption, PANEL_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(x_range, 0f64..top)
        .map_err(plot_err)?;
    chart.configure_mesh().disable_x_mesh().draw().map_err(plot_err)?;
    chart
        .draw_series(
            histogram
                .counts
                .iter()
                .zip(histogram.edges.windows(2))
                .map(|(&count, edge)| {
                    Rectangle::new(
                        [(edge[0], 0.0), (edge[1], count as f64)],
                        BLUE.mix(0.6).filled(),
                    )
                }),
        )
        .map_err(plot_err)?;
    Ok(())
}

/// Bar chart of autocorrelations with dashed significance bounds.
pub fn acf_plot(path: &Path, acf: &[f64], bound: f64, title: &str) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_acf(&root, acf, bound, title)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Innovation residuals over time, their ACF and their histogram.
pub fn residual_panel(path: &Path, report: &ModelReport) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let root = root
        .titled(&format!("Residuals: {}", report.name), CAPTION_FONT)
        .map_err(plot_err)?;
    let (upper, lower) = root.split_vertically(SIZE.1 / 2 - 20);
    let (left, right) = lower.split_horizontally(SIZE.0 / 2);

    let residuals = &report.diagnostics.residuals;
    let mut chart = ChartBuilder::on(&upper)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(0f64..residuals.len().max(1) as f64, value_range(residuals))
        .map_err(plot_err)?;
    chart.configure_mesh().draw().map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(
            residuals.iter().enumerate().map(|(i, &r)| (i as f64, r)),
            &BLACK,
        ))
        .map_err(plot_err)?;

    draw_acf(&left, &report.diagnostics.acf, report.diagnostics.acf_bound, "ACF")?;
    draw_histogram(&right, &report.diagnostics.histogram, "Histogram")?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// The last `tail` training months, the test actuals, and the forecast with
/// its interval bands.
pub fn forecast_plot(
    path: &Path,
    train: &MonthlySeries,
    test: &MonthlySeries,
    report: &ModelReport,
    tail: usize,
) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let offset = train.len().saturating_sub(tail);
    let shown = &train.values()[offset..];
    let end = (train.len() + test.len()) as f64;
    let forecast = &report.forecast;

    let bounds = forecast
        .intervals()
        .iter()
        .flat_map(|pi| pi.lower.iter().chain(&pi.upper));
    let y_range = value_range(
        shown
            .iter()
            .chain(test.values())
            .chain(forecast.point())
            .chain(bounds),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&report.name, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(offset as f64..end, y_range)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_label_formatter(&|x: &f64| {
            let i = x.round().max(0.0) as usize;
            if i < train.len() {
                year_label(train, *x)
            } else {
                year_label(test, (i - train.len()) as f64)
            }
        })
        .y_desc("Turnover ($m)")
        .draw()
        .map_err(plot_err)?;

    let start = train.len();
    let mut intervals: Vec<_> = forecast.intervals().iter().collect();
    intervals.sort_by(|a, b| b.level.total_cmp(&a.level));
    for (i, pi) in intervals.into_iter().enumerate() {
        let mut band: Vec<(f64, f64)> = pi
            .upper
            .iter()
            .enumerate()
            .map(|(h, &u)| ((start + h) as f64, u))
            .collect();
        band.extend(
            pi.lower
                .iter()
                .enumerate()
                .rev()
                .map(|(h, &l)| ((start + h) as f64, l)),
        );
        let shade = BLUE.mix(0.15 + 0.15 * i as f64);
        chart
            .draw_series(std::iter::once(Polygon::new(band, shade.filled())))
            .map_err(plot_err)?
            .label(format!("{:.0}% interval", pi.level))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 16, y + 5)], shade.filled()));
    }

    chart
        .draw_series(LineSeries::new(
            shown.iter().enumerate().map(|(i, &v)| ((offset + i) as f64, v)),
            &BLACK,
        ))
        .map_err(plot_err)?
        .label("training")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], &BLACK));
    chart
        .draw_series(LineSeries::new(
            test.values().iter().enumerate().map(|(h, &v)| ((start + h) as f64, v)),
            &RED,
        ))
        .map_err(plot_err)?
        .label("actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], &RED));
    chart
        .draw_series(LineSeries::new(
            forecast
                .point()
                .iter()
                .enumerate()
                .map(|(h, &v)| ((start + h) as f64, v)),
            &BLUE,
        ))
        .map_err(plot_err)?
        .label("forecast")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], &BLUE));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
