use crate::config::OutputConfig;
use crate::error::{CorrelationError, Result};
use crate::types::HR_MAX_VALUE;
use std::fmt::Write as _;
use std::path::Path;

const X_OFFSET: usize = 50;
const Y_OFFSET: usize = 100;
const FORMULA_X: usize = 1500;
const CIRCLE_RADIUS: usize = 3;

/// SVG scatter of generated (red) against target (blue) values, scaled back
/// to beats per minute, with the formula as a caption.
pub fn render_plot(
    generated: &[f32],
    target: &[f32],
    formula: &str,
    options: &OutputConfig,
) -> Result<String> {
    if generated.len() != target.len() {
        return Err(CorrelationError::SizeMismatch {
            left: generated.len(),
            right: target.len(),
        });
    }

    let downscale = options.downscale.max(1);
    let height = options.plot_height;
    let width = target.len() / downscale;
    let baseline = (Y_OFFSET + height / 2) as f32;

    let mut svg = String::with_capacity(128 * (width + 8));
    // Writing into a String cannot fail
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">"#,
        width + X_OFFSET,
        height + Y_OFFSET
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-size="20" text-anchor="middle">Correlation formula: {}</text>"#,
        FORMULA_X,
        Y_OFFSET / 3,
        escape(formula)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-size="20" text-anchor="middle">0</text>"#,
        X_OFFSET / 2,
        baseline
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x}" y1="{y}" x2="{x2}" y2="{y}" stroke="black"/>"#,
        x = X_OFFSET,
        y = baseline,
        x2 = width + X_OFFSET
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x}" y1="{y1}" x2="{x}" y2="{y2}" stroke="black"/>"#,
        x = X_OFFSET,
        y1 = Y_OFFSET,
        y2 = baseline
    );

    for i in (0..target.len()).step_by(downscale) {
        let cx = X_OFFSET + i / downscale;
        let generated_y = baseline - (generated[i] * HR_MAX_VALUE).abs();
        let target_y = baseline - target[i] * HR_MAX_VALUE;
        let _ = writeln!(
            svg,
            r#"<circle cx="{}" cy="{:.2}" r="{}" fill="red"/>"#,
            cx, generated_y, CIRCLE_RADIUS
        );
        let _ = writeln!(
            svg,
            r#"<circle cx="{}" cy="{:.2}" r="{}" fill="blue"/>"#,
            cx, target_y, CIRCLE_RADIUS
        );
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

pub fn write_plot(
    path: &Path,
    generated: &[f32],
    target: &[f32],
    formula: &str,
    options: &OutputConfig,
) -> Result<()> {
    let svg = render_plot(generated, target, formula, options)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    Ok(())
}

/// `patient_<id>_axis_<axis>_<device>.svg`, with the device name made path-safe.
pub fn plot_file_name(subject_id: usize, axis: impl std::fmt::Display, device: &str) -> String {
    let device: String = device
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("patient_{}_axis_{}_{}.svg", subject_id, axis, device)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
