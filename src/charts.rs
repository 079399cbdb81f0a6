//! PNG rendering of [`ChartSpec`]s.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::analyzers::types::{ChartKind, ChartSpec};

const SIZE: (u32, u32) = (1200, 700);
const FONT: &str = "sans-serif";

const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(46, 134, 193),
    RGBColor(231, 76, 60),
    RGBColor(39, 174, 96),
    RGBColor(243, 156, 18),
];

/// Renders every spec into `dir`, overwriting files of the same name.
///
/// A chart that fails is logged and skipped; the others are still written.
/// Returns the paths that were written.
#[tracing::instrument(skip(specs, dir), fields(dir = %dir.display(), charts = specs.len()))]
pub fn render_all(specs: &[ChartSpec], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::new();
    for spec in specs {
        let path = dir.join(spec.file_name);
        match render(spec, &path) {
            Ok(()) => {
                info!(path = %path.display(), "Chart written");
                written.push(path);
            }
            Err(e) => {
                error!(chart = spec.file_name, error = %e, "Chart rendering failed");
            }
        }
    }

    Ok(written)
}

/// Renders one chart to `path`.
pub fn render(spec: &ChartSpec, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    match &spec.kind {
        ChartKind::Bars {
            labels,
            values,
            guides,
        } => draw_bars(&root, spec, labels, values, guides)?,
        ChartKind::GroupedBars { labels, series } => draw_grouped(&root, spec, labels, series)?,
        ChartKind::Heatmap {
            rows,
            columns,
            cells,
        } => draw_heatmap(&root, spec, rows, columns, cells)?,
    }

    root.present()?;
    Ok(())
}

fn draw_bars(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    spec: &ChartSpec,
    labels: &[String],
    values: &[f64],
    guides: &[f64],
) -> Result<()> {
    let n = labels.len().max(1) as i32;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..spec.y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v| segment_label(v, labels))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(SERIES_COLORS[0].filled())
            .margin(8)
            .data(values.iter().enumerate().map(|(i, v)| (i as i32, *v))),
    )?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        Text::new(
            format!("{v:.2}"),
            (SegmentValue::CenterOf(i as i32), *v),
            (FONT, 15).into_font(),
        )
    }))?;

    for guide in guides {
        chart.draw_series(LineSeries::new(
            vec![
                (SegmentValue::Exact(0), *guide),
                (SegmentValue::Exact(n), *guide),
            ],
            SERIES_COLORS[1].stroke_width(2),
        ))?;
    }

    Ok(())
}

fn draw_grouped(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    spec: &ChartSpec,
    labels: &[String],
    series: &[(String, Vec<f64>)],
) -> Result<()> {
    // Each cluster spans one slot per series plus an empty gap slot.
    let stride = series.len() as i32 + 1;
    let slots = (labels.len().max(1) as i32) * stride;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..slots).into_segmented(), 0f64..spec.y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(slots as usize)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(slot) if slot % stride == 0 => labels
                .get((slot / stride) as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    for (s, (name, values)) in series.iter().enumerate() {
        let color = SERIES_COLORS[s % SERIES_COLORS.len()];
        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(color.filled())
                    .margin(4)
                    .data(
                        values
                            .iter()
                            .enumerate()
                            .map(|(i, v)| (i as i32 * stride + s as i32, *v)),
                    ),
            )?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

fn draw_heatmap(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    spec: &ChartSpec,
    rows: &[String],
    columns: &[String],
    cells: &[Vec<Option<f64>>],
) -> Result<()> {
    let nrows = rows.len().max(1) as i32;
    let ncols = columns.len().max(1) as i32;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(140)
        .build_cartesian_2d((0..ncols).into_segmented(), (0..nrows).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(ncols as usize)
        .y_labels(nrows as usize)
        .x_label_formatter(&|v| segment_label(v, columns))
        .y_label_formatter(&|v| segment_label(v, rows))
        .draw()?;

    for (r, row) in cells.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as i32, c as i32);
            let color = match cell {
                Some(v) => heat_color(*v, spec.y_max),
                None => RGBColor(235, 235, 235),
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(c), SegmentValue::Exact(r)),
                    (SegmentValue::Exact(c + 1), SegmentValue::Exact(r + 1)),
                ],
                color.filled(),
            )))?;

            let text = match cell {
                Some(v) => format!("{v:.2}"),
                None => "-".to_string(),
            };
            chart.draw_series(std::iter::once(Text::new(
                text,
                (SegmentValue::CenterOf(c), SegmentValue::CenterOf(r)),
                (FONT, 18).into_font(),
            )))?;
        }
    }

    Ok(())
}

fn segment_label(value: &SegmentValue<i32>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Red for low values through yellow to green for `max`.
fn heat_color(value: f64, max: f64) -> RGBColor {
    let t = if max <= 1.0 {
        0.0
    } else {
        ((value - 1.0) / (max - 1.0)).clamp(0.0, 1.0)
    };
    let (r, g) = if t < 0.5 {
        (230.0, 80.0 + 300.0 * t)
    } else {
        (230.0 - 340.0 * (t - 0.5), 230.0)
    };
    RGBColor(r as u8, g as u8, 90)
}
