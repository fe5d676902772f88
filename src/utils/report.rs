use std::collections::HashSet;

/// Категория однократно сообщаемой ошибки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Enumerate,
    ReadRect,
    Restore,
    Topmost,
}

/// Помнит, о каких ошибках уже сообщили, чтобы не засорять лог на частом тике.
#[derive(Debug, Default)]
pub struct ReportOnce {
    seen: HashSet<(ReportKind, String)>,
}

impl ReportOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` только при первом обращении для пары (категория, субъект)
    pub fn first(&mut self, kind: ReportKind, subject: &str) -> bool {
        self.seen.insert((kind, subject.to_string()))
    }

    /// Сбросить категорию: следующая такая ошибка снова будет сообщена
    pub fn clear(&mut self, kind: ReportKind, subject: &str) {
        self.seen.remove(&(kind, subject.to_string()));
    }
}
