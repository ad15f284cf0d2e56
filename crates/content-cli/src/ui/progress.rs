//! Progress bars
//!
//! Plain string rendering so the reporter can redraw a single line.

const FILLED: char = '█';
const EMPTY: char = '░';

/// Render a bar of `width` cells for `percent` in `[0, 100]`.
pub fn progress_bar(percent: f32, width: usize) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f32).round() as usize;
    let filled = filled.min(width);
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, width - filled));
    bar
}

/// Format a percentage as a fixed-width status word, e.g. ` 42%`.
pub fn format_percent(percent: f32) -> String {
    format!("{:>3}%", percent.clamp(0.0, 100.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_width_is_constant() {
        for p in [0.0, 12.5, 50.0, 99.9, 100.0, 250.0, -3.0] {
            assert_eq!(progress_bar(p, 20).chars().count(), 20);
        }
    }

    #[test]
    fn bar_fill() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(100.0, 4), "████");
    }

    #[test]
    fn percent_is_padded() {
        assert_eq!(format_percent(5.0), "  5%");
        assert_eq!(format_percent(100.0), "100%");
        assert_eq!(format_percent(120.0), "100%");
    }
}
