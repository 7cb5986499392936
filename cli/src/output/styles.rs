//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// `[i]` info prefix (cyan)
    pub info: Style,
    /// `[w]` warning prefix (yellow)
    pub warning: Style,
    /// `[e]` error prefix (red)
    pub error: Style,
    /// `[v]` verbose prefix (dimmed)
    pub verbose: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Bold text
    pub bold: Style,
    /// Headers/section titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.info = Style::new().cyan();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.verbose = Style::new().dimmed();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }
}
