//! SVG rendering of history and forecast

use chrono::NaiveDateTime;
use demand_forecast::export::create_parent_dirs;
use demand_forecast::{ForecastError, ForecastResult, Result, TimeSeries};
use std::fs;
use std::path::Path;
use tracing::debug;

const WIDTH: f64 = 1500.0;
const HEIGHT: f64 = 750.0;
const MARGIN: f64 = 70.0;
const GRID_LINES: usize = 5;

const HISTORY_COLOR: &str = "#222222";
const FORECAST_COLOR: &str = "#1f77b4";
const BAND_COLOR: &str = "#1f77b4";

/// Maps timestamps and values onto the drawing area
struct Canvas {
    t_min: f64,
    t_span: f64,
    y_min: f64,
    y_span: f64,
}

impl Canvas {
    fn new(timestamps: &[NaiveDateTime], values: &[f64]) -> Result<Self> {
        let seconds: Vec<f64> = timestamps.iter().map(|t| epoch_seconds(*t)).collect();
        let (t_min, t_max) = min_max(&seconds)
            .ok_or_else(|| ForecastError::ConfigurationError("nothing to plot".to_string()))?;
        let (y_min, y_max) = min_max(values)
            .ok_or_else(|| ForecastError::ConfigurationError("nothing to plot".to_string()))?;

        // Pad the value axis so lines don't touch the frame
        let pad = ((y_max - y_min) * 0.05).max(1e-6);

        Ok(Self {
            t_min,
            t_span: (t_max - t_min).max(1.0),
            y_min: y_min - pad,
            y_span: (y_max - y_min) + 2.0 * pad,
        })
    }

    fn x(&self, timestamp: NaiveDateTime) -> f64 {
        MARGIN + (epoch_seconds(timestamp) - self.t_min) / self.t_span * (WIDTH - 2.0 * MARGIN)
    }

    fn y(&self, value: f64) -> f64 {
        HEIGHT - MARGIN - (value - self.y_min) / self.y_span * (HEIGHT - 2.0 * MARGIN)
    }
}

/// Render the observed series and the forecast (with its interval band when
/// present) to an SVG file
pub fn render_svg(history: &TimeSeries, forecast: &ForecastResult, path: &Path) -> Result<()> {
    let svg = build_svg(history, forecast)?;
    create_parent_dirs(path)?;
    fs::write(path, svg)?;
    debug!(path = %path.display(), "plot written");
    Ok(())
}

fn build_svg(history: &TimeSeries, forecast: &ForecastResult) -> Result<String> {
    let mut timestamps = history.timestamps();
    timestamps.extend(forecast.timestamps());

    let mut values = history.values();
    for point in forecast.points() {
        values.push(point.point_estimate);
        values.extend(point.lower_bound);
        values.extend(point.upper_bound);
    }
    let canvas = Canvas::new(&timestamps, &values)?;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n",
        w = WIDTH,
        h = HEIGHT
    );

    for i in 0..=GRID_LINES {
        let value = canvas.y_min + canvas.y_span * i as f64 / GRID_LINES as f64;
        let y = canvas.y(value);
        svg.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#dddddd\"/>\n\
             <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"end\">{:.0}</text>\n",
            MARGIN,
            WIDTH - MARGIN,
            MARGIN - 6.0,
            y + 4.0,
            value,
        ));
    }

    if forecast.has_bounds() {
        let upper = forecast
            .points()
            .iter()
            .filter_map(|p| p.upper_bound.map(|u| (p.timestamp, u)));
        let lower = forecast
            .points()
            .iter()
            .rev()
            .filter_map(|p| p.lower_bound.map(|l| (p.timestamp, l)));
        let outline: Vec<String> = upper
            .chain(lower)
            .map(|(t, v)| format!("{:.1},{:.1}", canvas.x(t), canvas.y(v)))
            .collect();
        svg.push_str(&format!(
            "<polygon points=\"{}\" fill=\"{}\" fill-opacity=\"0.2\" stroke=\"none\"/>\n",
            outline.join(" "),
            BAND_COLOR
        ));
    }

    let forecast_line = forecast
        .points()
        .iter()
        .map(|p| (p.timestamp, p.point_estimate));
    svg.push_str(&polyline(&canvas, forecast_line, FORECAST_COLOR, 2.0));

    let history_line = history
        .observations()
        .iter()
        .map(|o| (o.timestamp, o.value));
    svg.push_str(&polyline(&canvas, history_line, HISTORY_COLOR, 1.0));

    let first = history.first().timestamp.format("%Y-%m-%d");
    let last = forecast
        .points()
        .last()
        .map(|p| p.timestamp)
        .unwrap_or(history.last().timestamp)
        .format("%Y-%m-%d");
    svg.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{}</text>\n\
         <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"end\">{}</text>\n\
         <text x=\"{:.1}\" y=\"30\" font-size=\"14\" fill=\"{}\">observed</text>\n\
         <text x=\"{:.1}\" y=\"30\" font-size=\"14\" fill=\"{}\">forecast</text>\n\
         </svg>\n",
        MARGIN,
        HEIGHT - MARGIN + 20.0,
        first,
        WIDTH - MARGIN,
        HEIGHT - MARGIN + 20.0,
        last,
        MARGIN,
        HISTORY_COLOR,
        MARGIN + 90.0,
        FORECAST_COLOR,
    ));

    Ok(svg)
}

fn polyline(
    canvas: &Canvas,
    points: impl Iterator<Item = (NaiveDateTime, f64)>,
    color: &str,
    stroke_width: f64,
) -> String {
    let coords: Vec<String> = points
        .map(|(t, v)| format!("{:.1},{:.1}", canvas.x(t), canvas.y(v)))
        .collect();
    format!(
        "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
        coords.join(" "),
        color,
        stroke_width
    )
}

fn epoch_seconds(timestamp: NaiveDateTime) -> f64 {
    timestamp.and_utc().timestamp() as f64
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
