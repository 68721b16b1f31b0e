use plotters::prelude::*;
use proxybench_common::{BenchError, Result, Source, CHART_FILE};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::runner::RunOutcome;
use crate::stats::{compute_empirical_cdf, ComparisonReport, EmpiricalCdf};

/// Upper bound of the latency axis (ms). Curves are cut off here.
pub const X_WINDOW_MS: f64 = 5000.0;
pub const CHART_SIZE: (u32, u32) = (1000, 600);
pub const CHART_TITLE: &str = "CDF of Request Latencies (OpenAI API)";

const TEXT_LINE_HEIGHT: i32 = 12;
const TEXT_PADDING: i32 = 6;
const TEXT_BOX_WIDTH: i32 = 190;
const TEXT_BOX_OFFSET: i32 = 10;

/// Latencies read back from both per-source logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Latencies {
    pub direct: Vec<f64>,
    pub proxy: Vec<f64>,
}

/// Numeric value of `value_field` in one log line, or `None` if the line is
/// not JSON or does not carry a numeric value under that field.
pub fn decode_value(line: &str, value_field: &str) -> Option<f64> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get(value_field)?.as_f64()
}

/// Collect `value_field` from every decodable line of the log at `path`.
///
/// Undecodable lines are skipped. A missing file yields no samples.
pub fn load_samples(path: &Path, value_field: &str) -> Result<Vec<f64>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut samples = Vec::new();
    for line in BufReader::new(file).lines() {
        if let Some(v) = decode_value(&line?, value_field) {
            samples.push(v);
        }
    }
    Ok(samples)
}

/// Load both per-source logs from `dir`, each by its own value field.
pub fn load_latencies(dir: &Path) -> Result<Latencies> {
    let load = |source: Source| load_samples(&dir.join(source.log_file()), source.value_field());
    Ok(Latencies {
        direct: load(Source::Direct)?,
        proxy: load(Source::Proxied)?,
    })
}

/// CDF points with `x <= x_max`. If the curve continues past `x_max`, the
/// crossing point on the boundary is added so the line ends at the edge.
pub fn clip_to_window(cdf: &EmpiricalCdf, x_max: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(cdf.len());
    for (x, y) in cdf.points() {
        if x <= x_max {
            points.push((x, y));
            continue;
        }
        if let Some(&(px, py)) = points.last() {
            let t = (x_max - px) / (x - px);
            points.push((x_max, py + (y - py) * t));
        }
        break;
    }
    points
}

fn chart_err<E: std::fmt::Display>(e: E) -> BenchError {
    BenchError::Chart(e.to_string())
}

/// Draw both CDFs and the statistics box to `out`.
///
/// Returns `Ok(None)` without touching `out` when either sample set is empty.
pub fn render_comparison_chart(
    direct: &[f64],
    proxy: &[f64],
    out: &Path,
) -> Result<Option<ComparisonReport>> {
    let Some(report) = ComparisonReport::from_samples(direct, proxy) else {
        println!(
            "Not enough data to generate chart. Check if the JSON files exist and contain valid data."
        );
        return Ok(None);
    };

    let direct_cdf = compute_empirical_cdf(direct);
    let proxy_cdf = compute_empirical_cdf(proxy);

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(CHART_TITLE, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..X_WINDOW_MS, 0f64..1.05f64)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Latency (ms)")
        .y_desc("Cumulative Density")
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(chart_err)?;

    for (cdf, label, color) in [
        (&direct_cdf, "Direct request latency", BLUE),
        (&proxy_cdf, "Proxy request latency", RED),
    ] {
        chart
            .draw_series(LineSeries::new(clip_to_window(cdf, X_WINDOW_MS), color.stroke_width(2)))
            .map_err(chart_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    // Statistics box, anchored bottom-left in pixel space.
    let area = chart.plotting_area().strip_coord_spec();
    let (_, height) = area.dim_in_pixel();
    let text = report.stats_text();
    let lines: Vec<&str> = text.lines().collect();
    let box_height = lines.len() as i32 * TEXT_LINE_HEIGHT + 2 * TEXT_PADDING;
    let top = height as i32 - box_height - TEXT_BOX_OFFSET;
    let corners = [
        (TEXT_BOX_OFFSET, top),
        (TEXT_BOX_OFFSET + TEXT_BOX_WIDTH, top + box_height),
    ];
    area.draw(&Rectangle::new(corners, WHITE.mix(0.8).filled()))
        .map_err(chart_err)?;
    area.draw(&Rectangle::new(corners, BLACK.mix(0.3)))
        .map_err(chart_err)?;
    for (i, line) in lines.iter().enumerate() {
        let pos = (
            TEXT_BOX_OFFSET + TEXT_PADDING,
            top + TEXT_PADDING + i as i32 * TEXT_LINE_HEIGHT,
        );
        area.draw(&Text::new(line.to_string(), pos, ("monospace", 11).into_font()))
            .map_err(chart_err)?;
    }

    root.present().map_err(chart_err)?;
    tracing::info!(path = %out.display(), "chart written");
    Ok(Some(report))
}

/// Load both logs from `dir` and render the chart to its fixed name there.
pub fn generate_cdf_chart(dir: &Path) -> Result<Option<ComparisonReport>> {
    let latencies = load_latencies(dir)?;
    render_comparison_chart(&latencies.direct, &latencies.proxy, &dir.join(CHART_FILE))
}

/// End-of-run output: the summary block, then the chart from the logs in `dir`.
///
/// The summary is printed before rendering so a chart failure does not hide it.
pub fn finish_run(dir: &Path, outcome: &RunOutcome) -> Result<Option<ComparisonReport>> {
    let Some(summary) = outcome.summary() else {
        println!("Not enough data to generate chart. Check the error logs.");
        return Ok(None);
    };

    println!("\n--- Summary Statistics ---");
    for line in summary {
        println!("{line}");
    }

    generate_cdf_chart(dir)
}
