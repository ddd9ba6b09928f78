//! Color utilities for posgrid.
//!
//! Two palettes share the same semantics:
//! - Plots: diverging red-white-blue on standardized difference
//!   (red below baseline, white at baseline, blue above)
//! - Terminal: green above baseline, red below, dimmed at zero

use owo_colors::{OwoColorize, Style};

const NEGATIVE: (f64, f64, f64) = (178.0, 24.0, 43.0);
const NEUTRAL: (f64, f64, f64) = (247.0, 247.0, 247.0);
const POSITIVE: (f64, f64, f64) = (33.0, 102.0, 172.0);

/// Diverging color for a standardized difference, clamped to [-1, 1].
pub fn diverging(value: f64) -> (u8, u8, u8) {
    let t = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    let (end, t) = if t < 0.0 { (NEGATIVE, -t) } else { (POSITIVE, t) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (
        lerp(NEUTRAL.0, end.0),
        lerp(NEUTRAL.1, end.1),
        lerp(NEUTRAL.2, end.2),
    )
}

/// Terminal styling, a no-op when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Colorizer {
    pub enabled: bool,
}

impl Colorizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, s: &str, style: Style) -> String {
        if self.enabled {
            s.style(style).to_string()
        } else {
            s.to_string()
        }
    }

    /// Signed value with four decimals, green above zero and red below.
    pub fn signed(&self, value: f64) -> String {
        let text = format!("{:+.4}", value);
        let style = if value > 0.0 {
            Style::new().green()
        } else if value < 0.0 {
            Style::new().red()
        } else {
            Style::new().dimmed()
        };
        self.paint(&text, style)
    }

    pub fn header(&self, s: &str) -> String {
        self.paint(s, Style::new().bold())
    }

    /// Factor or column names (cyan)
    pub fn factor(&self, s: &str) -> String {
        self.paint(s, Style::new().cyan())
    }

    pub fn bar(&self, s: &str) -> String {
        self.paint(s, Style::new().cyan())
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(s, Style::new().dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diverging_endpoints() {
        assert_eq!(diverging(0.0), (247, 247, 247));
        assert_eq!(diverging(-1.0), (178, 24, 43));
        assert_eq!(diverging(1.0), (33, 102, 172));
        // Clamped outside [-1, 1]
        assert_eq!(diverging(-3.0), diverging(-1.0));
        assert_eq!(diverging(f64::NAN), diverging(0.0));
    }

    #[test]
    fn test_diverging_midpoint() {
        let (r, _, b) = diverging(0.5);
        assert!(r < 247 && r > 33);
        assert!(b < 247 && b > 172);
    }

    #[test]
    fn test_plain_colorizer() {
        let c = Colorizer::new(false);
        assert_eq!(c.signed(0.25), "+0.2500");
        assert_eq!(c.signed(-0.1), "-0.1000");
        assert_eq!(c.header("x"), "x");
    }

    #[test]
    fn test_colored_output_has_escapes() {
        let c = Colorizer::new(true);
        assert!(c.signed(0.5).contains('\u{1b}'));
        assert!(c.signed(0.5).contains("+0.5000"));
    }
}
