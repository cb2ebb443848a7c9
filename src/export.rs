#![cfg(feature = "web")]
use crate::error::{DashError, Result};
use crate::figure::{Figure, TraceKind};
use plotters::prelude::*;
use std::io::Cursor;
use std::ops::Range;

/// Largest image edge accepted by [`figure_to_png`]
pub const MAX_EDGE: u32 = 4096;

fn plot_err(e: impl std::fmt::Display) -> DashError {
    DashError::Export(e.to_string())
}

/// Axis ranges covering every point, padded so that a single point or a
/// flat series still gets a non-empty range
///
/// Bar figures always include zero on the Y-axis.
pub fn axis_ranges(figure: &Figure) -> (Range<f64>, Range<f64>) {
    let (min_x, max_x, mut min_y, mut max_y) = figure.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    if figure.data.iter().any(|t| t.kind == TraceKind::Bar) {
        min_y = min_y.min(0.0);
        max_y = max_y.max(0.0);
    }
    let pad = |min: f64, max: f64| {
        if max > min {
            let margin = (max - min) * 0.05;
            (min - margin)..(max + margin)
        } else {
            (min - 1.0)..(max + 1.0)
        }
    };
    (pad(min_x, max_x), pad(min_y, max_y))
}

/// Renders a figure to PNG bytes
///
/// Line traces are drawn as connected lines, scatter traces as circles and
/// bar traces as filled rectangles centred on their x value. Named traces
/// appear in a legend.
pub fn figure_to_png(figure: &Figure, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 || width > MAX_EDGE || height > MAX_EDGE {
        return Err(DashError::Export(format!(
            "image size {}x{} outside 1..={}",
            width, height, MAX_EDGE
        )));
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let (x_range, y_range) = axis_ranges(figure);
        let mut chart = ChartBuilder::on(&root)
            .caption(&figure.layout.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc(&figure.layout.x_label)
            .y_desc(&figure.layout.y_label)
            .draw()
            .map_err(plot_err)?;

        for (i, trace) in figure.data.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            let series = match trace.kind {
                TraceKind::Line => chart.draw_series(LineSeries::new(trace.points(), &color)),
                TraceKind::Scatter => chart.draw_series(
                    trace
                        .points()
                        .map(|point| Circle::new(point, 4, color.filled())),
                ),
                TraceKind::Bar => chart.draw_series(trace.points().map(|(x, y)| {
                    Rectangle::new([(x - 0.4, 0.0), (x + 0.4, y)], color.filled())
                })),
            }
            .map_err(plot_err)?;
            if !trace.name.is_empty() {
                series
                    .label(trace.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }
        }

        if figure.data.iter().any(|t| !t.name.is_empty()) {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| DashError::Export("bitmap size mismatch".to_string()))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(plot_err)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Trace;

    #[test]
    fn bar_ranges_include_zero() {
        let fig = Figure::new("b").with_trace(Trace::bar("", vec![1.0, 3.0], vec![5.0, 9.0]));
        let (x, y) = axis_ranges(&fig);
        assert!(x.start < 1.0 && x.end > 3.0);
        assert!(y.start <= 0.0 && y.end > 9.0);
    }

    #[test]
    fn flat_series_gets_a_range() {
        let fig = Figure::new("f").with_trace(Trace::line("", vec![2.0], vec![2.0]));
        let (x, y) = axis_ranges(&fig);
        assert_eq!(x, 1.0..3.0);
        assert_eq!(y, 1.0..3.0);
    }

    #[test]
    fn rejects_oversized_images() {
        assert!(matches!(
            figure_to_png(&Figure::default(), 0, 10),
            Err(DashError::Export(_))
        ));
        assert!(figure_to_png(&Figure::default(), MAX_EDGE + 1, 10).is_err());
    }

    #[test]
    fn renders_png_or_reports_export_error() {
        // Text rendering needs a system font; headless hosts may lack one.
        let fig = Figure::new("t").with_trace(Trace::scatter("s", vec![1.0, 2.0], vec![3.0, 1.0]));
        match figure_to_png(&fig, 320, 240) {
            Ok(png) => assert_eq!(&png[..4], b"\x89PNG"),
            Err(e) => assert!(matches!(e, DashError::Export(_))),
        }
    }
}
