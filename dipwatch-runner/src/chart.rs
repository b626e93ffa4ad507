//! Text chart of close with the three Bollinger lines and buy markers.
//!
//! One column per row (the most recent `width` rows). Glyphs, later ones
//! drawn over earlier ones: `.` middle band, `-` upper/lower band,
//! `*` close, `B` close on a buy day.

use std::fmt::Write as _;

use dipwatch_core::{SignalRow, SignalTable};

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub width: usize,
    pub height: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 100,
            height: 20,
        }
    }
}

fn plotted(row: &SignalRow) -> impl Iterator<Item = f64> {
    [Some(row.close), row.bb_lower, row.bb_mid, row.bb_upper]
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
}

pub fn render_chart(table: &SignalTable, opts: ChartOptions) -> String {
    let width = opts.width.max(1);
    let height = opts.height.max(2);
    let rows = table.rows();
    let window = &rows[rows.len().saturating_sub(width)..];
    if window.is_empty() {
        return "(no data)\n".to_string();
    }

    let (mut lo, mut hi) = window
        .iter()
        .flat_map(plotted)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if hi - lo < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let level = |v: f64| (((hi - v) / (hi - lo)) * (height - 1) as f64).round() as usize;

    let mut grid = vec![vec![' '; window.len()]; height];
    for (x, row) in window.iter().enumerate() {
        let mut put = |v: Option<f64>, glyph: char| {
            if let Some(v) = v.filter(|v| v.is_finite()) {
                grid[level(v).min(height - 1)][x] = glyph;
            }
        };
        put(row.bb_mid, '.');
        put(row.bb_upper, '-');
        put(row.bb_lower, '-');
        put(Some(row.close), if row.buy_signal { 'B' } else { '*' });
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} close with Bollinger bands", table.ticker());
    for (y, line) in grid.iter().enumerate() {
        let label = if y == 0 {
            format!("{hi:>10.2}")
        } else if y == height - 1 {
            format!("{lo:>10.2}")
        } else {
            " ".repeat(10)
        };
        let body: String = line.iter().collect();
        let _ = writeln!(out, "{label} |{}", body.trim_end());
    }
    let _ = writeln!(out, "{} +{}", " ".repeat(10), "-".repeat(window.len()));

    let first = window[0].date.to_string();
    let last = window[window.len() - 1].date.to_string();
    let gap = window.len().saturating_sub(first.len() + last.len()).max(1);
    let _ = writeln!(out, "{}  {first}{}{last}", " ".repeat(10), " ".repeat(gap));
    let _ = writeln!(out, "legend: * close  B buy  - bands  . middle");
    out
}
