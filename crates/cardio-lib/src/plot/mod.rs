use crate::{
    analysis::DominantCycle,
    signal::{PhasePortrait, Trace},
};
use serde::{Deserialize, Serialize};

pub const TRACE_COLOR: u32 = 0x1F77B4;
pub const CANDIDATE_COLOR: u32 = 0x9E9E9E;
pub const DOMINANT_COLOR: u32 = 0xFF0000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

impl Style {
    pub fn solid(width: f32, color: u32) -> Self {
        Self {
            width,
            dash: None,
            color: Color(color),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Bounding box `(x_min, x_max, y_min, y_max)` over finite points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for Series::Line(line) in &self.series {
            for &[x, y] in &line.points {
                if !x.is_finite() || !y.is_finite() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, x, y, y),
                    Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
                });
            }
        }
        bounds
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn line(name: &str, points: Vec<[f64; 2]>, style: Style) -> Series {
    Series::Line(LineSeries {
        name: name.into(),
        points,
        style,
    })
}

/// Amplitude (mV) against time (ms).
pub fn figure_from_trace(title: &str, trace: &Trace, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = trace
        .time
        .iter()
        .zip(&trace.amplitude)
        .map(|(&t, &a)| [t, a])
        .collect();
    let mut fig = Figure::new(Some(title.to_string())).with_labels("Time (ms)", "Amplitude (mV)");
    fig.add_series(line(
        title,
        decimate_points(&points, max_points),
        Style::solid(1.4, TRACE_COLOR),
    ));
    fig
}

pub fn figure_from_portrait(
    title: &str,
    portrait: &PhasePortrait,
    x_label: &str,
    y_label: &str,
    max_points: usize,
) -> Figure {
    let points: Vec<[f64; 2]> = portrait.points().collect();
    let mut fig = Figure::new(Some(title.to_string())).with_labels(x_label, y_label);
    fig.add_series(line(
        title,
        decimate_points(&points, max_points),
        Style::solid(1.2, TRACE_COLOR),
    ));
    fig
}

/// Every normalized candidate in grey with the medoid drawn last, in red.
pub fn figure_from_dominant(dominant: &DominantCycle, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("Dominant cycle".to_string())).with_labels("z", "dz");
    for (idx, portrait) in dominant.normalized.iter().enumerate() {
        if idx == dominant.index {
            continue;
        }
        let points: Vec<[f64; 2]> = portrait.points().collect();
        fig.add_series(line(
            &format!("candidate {}", idx),
            decimate_points(&points, max_points),
            Style::solid(1.0, CANDIDATE_COLOR),
        ));
    }
    if let Some(medoid) = dominant.normalized.get(dominant.index) {
        let points: Vec<[f64; 2]> = medoid.points().collect();
        fig.add_series(line(
            &format!("dominant {}", dominant.index),
            decimate_points(&points, max_points),
            Style::solid(2.0, DOMINANT_COLOR),
        ));
    }
    fig
}
