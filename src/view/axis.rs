// Axis ticks - label positions for the frequency, time and dB axes
//
// Pure geometry: offsets are in device pixels from the plot's top edge (for
// vertical axes) or left edge (for the time axis). Drawing is up to the host.

use serde::{Deserialize, Serialize};

use crate::spectrum::{log_max_frequency, palette, Rgba, LOG_MIN_HZ, MAX_DB, MIN_DB};

const LINEAR_FREQ_STEPS: [f64; 6] = [1e3, 2e3, 5e3, 1e4, 2e4, 5e4];
const LOG_FREQ_MARKS: [f64; 10] = [20.0, 50.0, 100.0, 200.0, 500.0, 1e3, 2e3, 5e3, 1e4, 2e4];
const TIME_STEPS: [f64; 10] = [1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0];
const DB_STEPS: [f64; 5] = [10.0, 20.0, 30.0, 40.0, 60.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub offset: f64,
    pub label: String,
}

/// First step that keeps `span / step` within `max(2, budget)`, else the last
fn pick_step(steps: &[f64], span: f64, budget: f64) -> f64 {
    let limit = budget.max(2.0);
    steps
        .iter()
        .copied()
        .find(|step| span / step <= limit)
        .unwrap_or(steps[steps.len() - 1])
}

/// Frequency axis ticks for a plot `height` pixels tall
pub fn frequency_ticks(sample_rate: u32, log_scale: bool, height: u32, font_size: f64) -> Vec<Tick> {
    let h = height as f64;
    let nyquist = sample_rate as f64 / 2.0;

    if log_scale {
        let max_freq = log_max_frequency(sample_rate);
        let span = (max_freq / LOG_MIN_HZ).ln();
        if span <= 0.0 {
            return Vec::new();
        }
        return LOG_FREQ_MARKS
            .iter()
            .filter(|&&f| f <= max_freq)
            .map(|&f| Tick {
                offset: h - (f / LOG_MIN_HZ).ln() / span * h,
                label: if f >= 1e3 {
                    format!("{}k", f / 1e3)
                } else {
                    format!("{}", f)
                },
            })
            .collect();
    }

    if nyquist <= 0.0 {
        return Vec::new();
    }
    let step = pick_step(&LINEAR_FREQ_STEPS, nyquist, h / (font_size * 2.5));
    (0..)
        .map(|i| i as f64 * step)
        .take_while(|f| *f <= nyquist)
        .map(|f| Tick {
            offset: h - f / nyquist * h,
            label: format!("{}", (f / 1e3).round()),
        })
        .collect()
}

/// `Ns` under a minute, `m:ss` from there on
pub fn time_label(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (m, s) = (total / 60, total % 60);
    if m > 0 {
        format!("{}:{:02}", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Time axis ticks over the visible window of a `duration`-second source
pub fn time_ticks(duration: f64, zoom: f64, pan: f64, width: u32, font_size: f64) -> Vec<Tick> {
    let w = width as f64;
    let visible = duration / zoom.max(1.0);
    if visible.is_nan() || visible <= 0.0 {
        return Vec::new();
    }
    let start = pan * duration;
    let step = pick_step(&TIME_STEPS, visible, w / (font_size * 4.0));

    let first = (start / step).ceil() as i64;
    (first..)
        .map(|i| i as f64 * step)
        .take_while(|t| *t <= start + visible)
        .filter_map(|t| {
            let offset = (t - start) / visible * w;
            (offset >= 0.0 && offset <= w).then(|| Tick {
                offset,
                label: time_label(t),
            })
        })
        .collect()
}

/// dB legend ticks from the floor to 0 dB
pub fn db_ticks(height: u32, font_size: f64) -> Vec<Tick> {
    let h = height as f64;
    let range = MAX_DB - MIN_DB;
    let step = pick_step(&DB_STEPS, range, h / (font_size * 2.0));

    (0..)
        .map(|i| MIN_DB + i as f64 * step)
        .take_while(|db| *db <= MAX_DB)
        .map(|db| Tick {
            offset: h - (db - MIN_DB) / range * (h + 1.0),
            label: format!("{}", db as i64),
        })
        .collect()
}

/// Legend gradient colour for row `y` of an `height`-pixel legend (top = 0 dB)
pub fn legend_color(y: u32, height: u32) -> Rgba {
    let t = 1.0 - y as f64 / height.max(1) as f64;
    palette()[(t * 255.0).clamp(0.0, 255.0) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ticks: &[Tick]) -> Vec<&str> {
        ticks.iter().map(|t| t.label.as_str()).collect()
    }

    #[test]
    fn test_linear_frequency_ticks() {
        // 300 / (12 * 2.5) = 10 labels allowed: 22.05k / 5k fits
        let ticks = frequency_ticks(44_100, false, 300, 12.0);
        assert_eq!(labels(&ticks), vec!["0", "5", "10", "15", "20"]);
        assert_eq!(ticks[0].offset, 300.0);
        assert!(ticks.windows(2).all(|w| w[1].offset < w[0].offset));
    }

    #[test]
    fn test_linear_frequency_ticks_small_plot_use_largest_fitting_step() {
        // budget clamps to 2: 22.05k / 20k
        let ticks = frequency_ticks(44_100, false, 20, 12.0);
        assert_eq!(labels(&ticks), vec!["0", "20"]);
    }

    #[test]
    fn test_log_frequency_ticks() {
        let ticks = frequency_ticks(44_100, true, 400, 12.0);
        assert_eq!(
            labels(&ticks),
            vec!["20", "50", "100", "200", "500", "1k", "2k", "5k", "10k", "20k"]
        );
        assert!((ticks[0].offset - 400.0).abs() < 1e-9);
        assert!(ticks.last().unwrap().offset.abs() < 1e-9);

        let ticks = frequency_ticks(8_000, true, 400, 12.0);
        assert_eq!(labels(&ticks).last(), Some(&"2k"));
    }

    #[test]
    fn test_time_ticks_full_view() {
        // 10 s, 400 px, budget 400 / 48 = 8.3 → 2 s steps
        let ticks = time_ticks(10.0, 1.0, 0.0, 400, 12.0);
        assert_eq!(labels(&ticks), vec!["0s", "2s", "4s", "6s", "8s", "10s"]);
        assert_eq!(ticks[1].offset, 80.0);
    }

    #[test]
    fn test_time_ticks_zoomed_window() {
        // visible 25 s starting at 50 s
        let ticks = time_ticks(200.0, 8.0, 0.25, 400, 12.0);
        assert_eq!(labels(&ticks).first(), Some(&"50s"));
        assert_eq!(labels(&ticks).last(), Some(&"1:15"));
        assert!(ticks.iter().all(|t| t.offset >= 0.0 && t.offset <= 400.0));
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(0.0), "0s");
        assert_eq!(time_label(59.0), "59s");
        assert_eq!(time_label(60.0), "1:00");
        assert_eq!(time_label(1830.0), "30:30");
    }

    #[test]
    fn test_db_ticks() {
        // 240 / 24 = 10 → 20 dB steps
        let ticks = db_ticks(240, 12.0);
        assert_eq!(
            labels(&ticks),
            vec!["-120", "-100", "-80", "-60", "-40", "-20", "0"]
        );
        assert_eq!(ticks[0].offset, 240.0);
        assert_eq!(ticks.last().unwrap().offset, -1.0);
    }

    #[test]
    fn test_legend_gradient_endpoints() {
        assert_eq!(legend_color(0, 100), palette()[255]);
        assert_eq!(legend_color(100, 100), palette()[0]);
    }
}
