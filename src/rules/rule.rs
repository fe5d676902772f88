use crate::events::Rect;

pub const KEY_TITLE: &str = "windowtitle";
pub const KEY_USE_REGEX: &str = "useregex";
pub const KEY_CASE_SENSITIVE: &str = "casesensitive";
pub const KEY_CHILD_WINDOW: &str = "childwindow";
pub const KEY_ON_TOP: &str = "ontop";
pub const KEY_POS_X0: &str = "posx0";
pub const KEY_POS_Y0: &str = "posy0";
pub const KEY_POS_X1: &str = "posx1";
pub const KEY_POS_Y1: &str = "posy1";

pub const RECT_KEYS: [&str; 4] = [KEY_POS_X0, KEY_POS_Y0, KEY_POS_X1, KEY_POS_Y1];

/// Правило для одного отслеживаемого окна (одна секция конфигурации)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub title_pattern: String,
    pub use_regex: bool,
    pub case_sensitive: bool,
    pub match_child_windows: bool,
    pub keep_on_top: bool,
    pub saved_rect: Option<Rect>,
}

impl Rule {
    /// Правило со значениями по умолчанию: заголовок совпадает с именем секции
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title_pattern: name.clone(),
            name,
            use_regex: false,
            case_sensitive: true,
            match_child_windows: false,
            keep_on_top: false,
            saved_rect: None,
        }
    }

    pub fn with_title(mut self, title_pattern: impl Into<String>) -> Self {
        self.title_pattern = title_pattern.into();
        self
    }

    pub fn with_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_child_windows(mut self, match_child_windows: bool) -> Self {
        self.match_child_windows = match_child_windows;
        self
    }

    pub fn with_keep_on_top(mut self, keep_on_top: bool) -> Self {
        self.keep_on_top = keep_on_top;
        self
    }

    pub fn with_saved_rect(mut self, rect: Rect) -> Self {
        self.saved_rect = Some(rect);
        self
    }
}

/// Булево значение в стиле INI: 1/0, true/false, yes/no, on/off
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_coordinate(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

/// Снять одинаковые кавычки вокруг заголовка: `"Notepad"` -> `Notepad`
pub fn remove_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("-8"), Some(-8));
        assert_eq!(parse_coordinate(" 1770 "), Some(1770));
        assert_eq!(parse_coordinate("abc"), None);
        assert_eq!(parse_coordinate("12.5"), None);
    }

    #[test]
    fn test_remove_quotes() {
        assert_eq!(remove_quotes("\"Notepad\""), "Notepad");
        assert_eq!(remove_quotes("'Total Commander.+'"), "Total Commander.+");
        assert_eq!(remove_quotes("\"half"), "\"half");
        assert_eq!(remove_quotes("plain"), "plain");
    }

    #[test]
    fn test_rule_defaults() {
        let rule = Rule::new("Calculator");
        assert_eq!(rule.title_pattern, "Calculator");
        assert!(rule.case_sensitive);
        assert!(!rule.use_regex);
        assert!(!rule.match_child_windows);
        assert!(!rule.keep_on_top);
        assert_eq!(rule.saved_rect, None);
    }
}
