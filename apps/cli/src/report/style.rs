use crossterm::style::Stylize;
use crossterm::tty::IsTty;

/// Semantic color of a piece of report text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Muted,
    Heading,
}

pub trait Styler: Send + Sync {
    fn paint(&self, text: &str, tone: Tone) -> String;
}

/// ANSI colors through crossterm
pub struct AnsiStyler;

impl Styler for AnsiStyler {
    fn paint(&self, text: &str, tone: Tone) -> String {
        match tone {
            Tone::Good => text.green().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Muted => text.dark_grey().to_string(),
            Tone::Heading => text.cyan().bold().to_string(),
        }
    }
}

pub struct PlainStyler;

impl Styler for PlainStyler {
    fn paint(&self, text: &str, _tone: Tone) -> String {
        text.to_string()
    }
}

/// Colors unless disabled or stdout is not a terminal
pub fn detect(no_color: bool) -> Box<dyn Styler> {
    if no_color || !std::io::stdout().is_tty() {
        Box::new(PlainStyler)
    } else {
        Box::new(AnsiStyler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_styler_is_identity() {
        assert_eq!(PlainStyler.paint("ready", Tone::Good), "ready");
    }

    #[test]
    fn test_ansi_styler_wraps_text() {
        let painted = AnsiStyler.paint("fail", Tone::Bad);
        assert!(painted.contains("fail"));
        assert!(painted.starts_with('\u{1b}'));
    }

    #[test]
    fn test_no_color_forces_plain() {
        assert_eq!(detect(true).paint("x", Tone::Heading), "x");
    }
}
