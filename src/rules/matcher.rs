use crate::events::{WindowHandle, WindowInfo};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::error;

use super::{Rule, RuleSet};

/// Скомпилированный шаблон заголовка одного правила
#[derive(Debug)]
enum TitlePattern {
    Exact(String),
    ExactIgnoreCase(String),
    Regex(Regex),
    /// Регулярное выражение не компилируется: правило отключено до конца работы
    Disabled,
}

impl TitlePattern {
    fn compile(rule: &Rule) -> Self {
        if !rule.use_regex {
            return if rule.case_sensitive {
                Self::Exact(rule.title_pattern.clone())
            } else {
                Self::ExactIgnoreCase(rule.title_pattern.to_lowercase())
            };
        }

        // Совпадение должно покрывать весь заголовок
        let anchored = format!("^(?:{})$", rule.title_pattern);
        match RegexBuilder::new(&anchored)
            .case_insensitive(!rule.case_sensitive)
            .build()
        {
            Ok(regex) => Self::Regex(regex),
            Err(e) => {
                error!(
                    "[{}] неверное регулярное выражение '{}': {}. Правило отключено",
                    rule.name, rule.title_pattern, e
                );
                Self::Disabled
            }
        }
    }

    fn matches(&self, title: &str) -> bool {
        match self {
            Self::Exact(expected) => title == expected,
            Self::ExactIgnoreCase(expected) => title.to_lowercase() == *expected,
            Self::Regex(regex) => regex.is_match(title),
            Self::Disabled => false,
        }
    }
}

/// Поиск живого окна по правилу. Шаблоны компилируются один раз на правило.
#[derive(Debug, Default)]
pub struct WindowMatcher {
    patterns: HashMap<String, TitlePattern>,
}

impl WindowMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Скомпилировать шаблоны всех правил заранее, чтобы ошибки всплыли при старте
    pub fn for_rules(rules: &RuleSet) -> Self {
        let mut matcher = Self::new();
        for rule in rules.rules() {
            matcher.pattern(rule);
        }
        matcher
    }

    fn pattern(&mut self, rule: &Rule) -> &TitlePattern {
        self.patterns
            .entry(rule.name.clone())
            .or_insert_with(|| TitlePattern::compile(rule))
    }

    /// Правило отключено из-за неверного шаблона
    pub fn is_disabled(&mut self, rule: &Rule) -> bool {
        matches!(self.pattern(rule), TitlePattern::Disabled)
    }

    /// Первое окно в порядке перечисления, подходящее под правило.
    ///
    /// Верхнеуровневые и дочерние окна - взаимоисключающие области поиска:
    /// `match_child_windows` выбирает только дочерние окна.
    pub fn find(&mut self, rule: &Rule, windows: &[WindowInfo]) -> Option<WindowHandle> {
        let pattern = self.pattern(rule);
        if matches!(pattern, TitlePattern::Disabled) {
            return None;
        }

        windows
            .iter()
            .filter(|window| window.top_level != rule.match_child_windows)
            .filter(|window| !window.title.is_empty())
            .find(|window| pattern.matches(&window.title))
            .map(|window| window.handle)
    }
}
