//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - per-point `ksig_sp` data: `o`
//! - fitted saturation curve: `-` line

use crate::domain::{HydrationDiagnostics, SaturationFit};
use crate::models::saturation_curve;

/// Render `ksig_sp` against power with the fitted saturation curve.
pub fn render_saturation_plot(diagnostics: &HydrationDiagnostics, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = diagnostics
        .power
        .iter()
        .copied()
        .zip(diagnostics.ksig_sp.iter().copied())
        .collect();
    let (p_min, p_max) = power_range(&points).unwrap_or((0.0, 1.0));
    let curve = sample_curve(&diagnostics.saturation, p_min, p_max, width.max(2));
    render_plot(&points, &curve, p_min, p_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    curve: &[(f64, f64)],
    p_min: f64,
    p_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so data points overlay it.
    draw_curve(&mut grid, curve, p_min, p_max, y_min, y_max);

    for &(p, y) in points {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(p, p_min, p_max, width);
        let y = map_y(y, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: power=[{p_min:.3}, {p_max:.3}] W | ksig_sp=[{y_min:.2}, {y_max:.2}] 1/(s*M)\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn power_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_p = f64::INFINITY;
    let mut max_p = f64::NEG_INFINITY;
    for &(p, _) in points {
        min_p = min_p.min(p);
        max_p = max_p.max(p);
    }
    if min_p.is_finite() && max_p.is_finite() && max_p > min_p {
        Some((min_p, max_p))
    } else {
        None
    }
}

fn sample_curve(fit: &SaturationFit, p_min: f64, p_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let p = p_min + u * (p_max - p_min);
            (p, saturation_curve(p, fit.ksig_smax, fit.p_12))
        })
        .filter(|(_, y)| y.is_finite())
        .collect()
}

fn y_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
