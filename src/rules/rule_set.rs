use crate::error::Result;
use crate::events::Rect;
use crate::store::{ConfigStore, DEFAULT_SECTION};
use tracing::{debug, info, warn};

use super::rule::{
    parse_bool, parse_coordinate, remove_quotes, Rule, KEY_CASE_SENSITIVE, KEY_CHILD_WINDOW,
    KEY_ON_TOP, KEY_TITLE, KEY_USE_REGEX, RECT_KEYS,
};

/// Значение старого формата для ещё не наблюдавшегося окна
const UNSET_RECT: Rect = Rect::new(-1, -1, -1, -1);

/// Результат чтения четырёх координат одной секции
#[derive(Debug, PartialEq, Eq)]
enum RectField {
    Missing,
    Malformed,
    Present(Rect),
}

/// Все правила в порядке секций файла
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    #[allow(dead_code)]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Построить правила из хранилища; пропущенные поля наследуются из DEFAULT
    pub fn load(store: &dyn ConfigStore) -> Self {
        let rules: Vec<Rule> = store
            .sections()
            .into_iter()
            .filter(|section| section != DEFAULT_SECTION)
            .map(|section| Self::load_rule(store, &section))
            .collect();

        info!("Загружено {} правил", rules.len());
        Self { rules }
    }

    fn load_rule(store: &dyn ConfigStore, section: &str) -> Rule {
        let title = store.get_or(section, KEY_TITLE, section);
        let flag = |key: &str, fallback: bool| Self::inherited_flag(store, section, key, fallback);

        let rule = Rule::new(section)
            .with_title(remove_quotes(&title))
            .with_regex(flag(KEY_USE_REGEX, false))
            .with_case_sensitive(flag(KEY_CASE_SENSITIVE, true))
            .with_child_windows(flag(KEY_CHILD_WINDOW, false))
            .with_keep_on_top(flag(KEY_ON_TOP, false));

        let rect = match Self::read_rect(store, section) {
            RectField::Present(rect) => Some(rect),
            RectField::Malformed => None,
            RectField::Missing => match Self::read_rect(store, DEFAULT_SECTION) {
                RectField::Present(rect) => Some(rect),
                _ => None,
            },
        };

        let rule = match rect {
            Some(rect) => rule.with_saved_rect(rect),
            None => rule,
        };

        debug!("Правило [{}]: {:?}", section, rule);
        rule
    }

    fn inherited_flag(store: &dyn ConfigStore, section: &str, key: &str, fallback: bool) -> bool {
        for source in [section, DEFAULT_SECTION] {
            if let Some(raw) = store.get(source, key) {
                match parse_bool(&raw) {
                    Some(value) => return value,
                    None => warn!("[{}] {} = '{}' не является 0/1, значение проигнорировано", source, key, raw),
                }
            }
        }
        fallback
    }

    fn read_rect(store: &dyn ConfigStore, section: &str) -> RectField {
        let raw: Vec<Option<String>> = RECT_KEYS.iter().map(|key| store.get(section, key)).collect();
        if raw.iter().all(Option::is_none) {
            return RectField::Missing;
        }

        let coords: Option<Vec<i32>> = raw
            .iter()
            .map(|value| value.as_deref().and_then(parse_coordinate))
            .collect();

        let Some(coords) = coords else {
            warn!("[{}] координаты окна не числовые или неполные, позиция не будет восстановлена", section);
            return RectField::Malformed;
        };

        let rect = Rect::new(coords[0], coords[1], coords[2], coords[3]);
        if rect == UNSET_RECT {
            return RectField::Malformed;
        }
        if !rect.is_restorable() {
            warn!("[{}] сохранённый прямоугольник {} вырожден, позиция не будет восстановлена", section, rect);
            return RectField::Malformed;
        }

        RectField::Present(rect)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[allow(dead_code)]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Нужен ли поиск среди дочерних окон хотя бы одному правилу
    pub fn needs_child_windows(&self) -> bool {
        self.rules.iter().any(|rule| rule.match_child_windows)
    }

    /// Запомнить геометрию окна в памяти; вырожденные прямоугольники отвергаются
    pub fn update(&mut self, name: &str, rect: Rect) -> bool {
        if !rect.is_restorable() {
            return false;
        }

        match self.rules.iter_mut().find(|rule| rule.name == name) {
            Some(rule) => {
                rule.saved_rect = Some(rect);
                true
            }
            None => false,
        }
    }

    /// Записать геометрию всех правил в хранилище; остальные ключи не трогаются
    pub fn flush(&self, store: &mut dyn ConfigStore) -> Result<()> {
        let mut written = 0;
        for rule in &self.rules {
            let Some(rect) = rule.saved_rect else {
                continue;
            };

            let values = [rect.x0, rect.y0, rect.x1, rect.y1];
            for (key, value) in RECT_KEYS.iter().zip(values) {
                store.set(&rule.name, key, i64::from(value));
            }
            written += 1;
        }

        store.save()?;
        debug!("Сохранены позиции {} окон", written);
        Ok(())
    }
}
