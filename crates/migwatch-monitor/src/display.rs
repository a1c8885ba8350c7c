use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

/// Width of the bar itself, in cells.
const BAR_WIDTH: usize = 50;

/// Where progress bars are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Redraw on stdout. indicatif hides itself when stdout is not a TTY.
    #[default]
    Terminal,
    /// Track state without drawing anything (tests).
    Hidden,
}

/// The shared terminal display for one watch session.
///
/// Acquired when the session starts polling and released when it reaches a
/// terminal state. Dropping the session releases it, so early returns and
/// transport failures cannot leave the display attached.
pub struct DisplaySession {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl DisplaySession {
    pub fn acquire(mode: DisplayMode) -> Self {
        let target = match mode {
            DisplayMode::Terminal => ProgressDrawTarget::stdout(),
            DisplayMode::Hidden => ProgressDrawTarget::hidden(),
        };
        let template = format!("{{prefix}} {{bar:{BAR_WIDTH}}} {{pos:>3}}%");
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

        debug!(?mode, "Progress display acquired");
        Self {
            multi: MultiProgress::with_draw_target(target),
            style,
        }
    }

    /// Add one indicator bounded to 0..=100, drawn below the previous ones.
    pub fn add_bar(&self) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(self.style.clone());
        bar
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DisplaySession {
    fn drop(&mut self) {
        debug!("Progress display released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bars_track_position() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let bar = display.add_bar();
        assert_eq!(bar.length(), Some(100));

        bar.set_position(42);
        assert_eq!(bar.position(), 42);
        display.release();

        // Bars outlive the session and keep their state.
        assert_eq!(bar.position(), 42);
    }

    #[test]
    fn test_default_mode_is_terminal() {
        assert_eq!(DisplayMode::default(), DisplayMode::Terminal);
    }
}
