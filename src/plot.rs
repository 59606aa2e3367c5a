//! Predicted-vs-actual scatter plot rendered as standalone SVG

use std::fmt;

/// Artifact name of the evaluation plot.
pub const PLOT_ARTIFACT: &str = "plot.svg";

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const MARGIN: f64 = 56.0;

/// Render actual labels (x axis) against predictions (y axis).
///
/// Both axes share one range so the dashed identity diagonal marks a
/// perfect prediction. Pairs beyond the shorter input are ignored.
#[must_use]
pub fn render_prediction_plot(y_true: &[f64], y_pred: &[f64]) -> String {
    let mut svg = String::with_capacity(256 + y_true.len().min(y_pred.len()) * 64);
    write_prediction_plot(&mut svg, y_true, y_pred).ok();
    svg
}

/// Stream the prediction plot into any [`fmt::Write`] sink.
///
/// # Errors
///
/// Returns the sink's [`fmt::Error`] on the first failed write.
pub fn write_prediction_plot<W: fmt::Write>(out: &mut W, y_true: &[f64], y_pred: &[f64]) -> fmt::Result {
    let points: Vec<(f64, f64)> = y_true
        .iter()
        .copied()
        .zip(y_pred.iter().copied())
        .filter(|(t, p)| t.is_finite() && p.is_finite())
        .collect();
    let (lo, hi) = shared_range(&points);

    let sx = |v: f64| MARGIN + (v - lo) / (hi - lo) * (WIDTH - 2.0 * MARGIN);
    let sy = |v: f64| HEIGHT - MARGIN - (v - lo) / (hi - lo) * (HEIGHT - 2.0 * MARGIN);

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        out,
        r#"<text x="{}" y="28" text-anchor="middle" font-family="sans-serif" font-size="16">Predicted vs actual ({} points)</text>"#,
        WIDTH / 2.0,
        points.len()
    )?;
    writeln!(
        out,
        r#"<line x1="{MARGIN}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/><line x1="{MARGIN}" y1="{MARGIN}" x2="{MARGIN}" y2="{b}" stroke="black"/>"#,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN
    )?;
    writeln!(
        out,
        r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#d62728" stroke-dasharray="6,4"/>"##,
        sx(lo),
        sy(lo),
        sx(hi),
        sy(hi)
    )?;
    for (t, p) in &points {
        writeln!(
            out,
            r##"<circle cx="{:.2}" cy="{:.2}" r="3" fill="#1f77b4" fill-opacity="0.5"/>"##,
            sx(*t),
            sy(*p)
        )?;
    }
    for (label, x, y, anchor) in [
        (format!("{lo:.2}"), MARGIN, HEIGHT - MARGIN + 18.0, "start"),
        (format!("{hi:.2}"), WIDTH - MARGIN, HEIGHT - MARGIN + 18.0, "end"),
        ("actual".to_string(), WIDTH / 2.0, HEIGHT - 12.0, "middle"),
    ] {
        writeln!(
            out,
            r#"<text x="{x}" y="{y}" text-anchor="{anchor}" font-family="sans-serif" font-size="12">{label}</text>"#
        )?;
    }
    writeln!(
        out,
        r#"<text x="16" y="{}" transform="rotate(-90 16 {})" text-anchor="middle" font-family="sans-serif" font-size="12">predicted</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    )?;
    out.write_str("</svg>\n")
}

/// Padded `[lo, hi]` covering both coordinates of every point.
fn shared_range(points: &[(f64, f64)]) -> (f64, f64) {
    let (mut lo, mut hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (t, p)| {
            (lo.min(*t).min(*p), hi.max(*t).max(*p))
        });
    if !lo.is_finite() {
        (lo, hi) = (0.0, 1.0);
    }
    if hi - lo < f64::EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}
