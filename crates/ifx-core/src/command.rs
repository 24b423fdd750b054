//! Single-character filter selection.
//!
//! `'0'` shows the menu, `'1'..='9'` selects a filter, everything else is
//! ignored by the caller.

use crate::filter::FilterId;

/// A parsed menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Print the filter menu.
    ShowMenu,
    /// Dispatch a filter.
    Apply(FilterId),
}

impl MenuCommand {
    /// Parses one command character.
    pub fn parse(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::ShowMenu),
            _ => FilterId::from_shortcut(c).map(Self::Apply),
        }
    }
}

/// The filter menu as printed to the terminal.
pub fn menu_text() -> String {
    let mut out = String::from("Select filter effect number: \n");
    for f in FilterId::ALL {
        out.push_str(&format!("{}. {}\n", f.shortcut(), f.label()));
    }
    out.push_str("Select 0 for this menu\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_digits() {
        assert_eq!(MenuCommand::parse('0'), Some(MenuCommand::ShowMenu));
        assert_eq!(MenuCommand::parse('6'), Some(MenuCommand::Apply(FilterId::GaussianBlur)));
        assert_eq!(MenuCommand::parse('q'), None);
        assert_eq!(MenuCommand::parse(' '), None);
    }

    #[test]
    fn menu_lists_every_filter() {
        let menu = menu_text();
        assert!(menu.starts_with("Select filter effect number"));
        assert!(menu.contains("1. Invert\n"));
        assert!(menu.contains("9. Blue channel\n"));
        assert!(menu.ends_with("Select 0 for this menu\n"));
        assert_eq!(menu.lines().count(), 11);
    }
}
