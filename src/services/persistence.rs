use crate::error::Result;
use crate::rules::RuleSet;
use crate::store::ConfigStore;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// Периодическая запись геометрии в хранилище, независимо от каденции трекинга
pub struct PersistenceScheduler {
    interval: Duration,
    last_flush: Instant,
    failures: u32,
}

impl PersistenceScheduler {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_flush: now,
            failures: 0,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.interval
    }

    /// Сохранить, если подошёл срок. Возвращает `true`, если была попытка записи.
    ///
    /// Ошибка записи только логируется: следующая попытка будет в следующий срок.
    pub fn poll(&mut self, now: Instant, rules: &RuleSet, store: &mut dyn ConfigStore) -> bool {
        if !self.is_due(now) {
            return false;
        }

        if let Err(e) = self.flush_now(now, rules, store) {
            error!(
                "Не удалось сохранить позиции окон (неудачных попыток подряд: {}): {}",
                self.failures, e
            );
        }
        true
    }

    /// Сохранить немедленно и начать новый отсчёт
    pub fn flush_now(&mut self, now: Instant, rules: &RuleSet, store: &mut dyn ConfigStore) -> Result<()> {
        self.last_flush = now;
        match rules.flush(store) {
            Ok(()) => {
                if self.failures > 0 {
                    info!("Сохранение позиций снова работает");
                }
                self.failures = 0;
                Ok(())
            }
            Err(e) => {
                self.failures += 1;
                Err(e)
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Rect;
    use crate::store::TomlStore;
    use std::fs;

    #[test]
    fn test_flush_only_when_due() {
        let start = Instant::now();
        let mut store = TomlStore::in_memory("[w]\n").unwrap();
        let mut rules = RuleSet::load(&store);
        rules.update("w", Rect::new(1, 2, 3, 4));
        let mut scheduler = PersistenceScheduler::new(Duration::from_secs(60), start);

        assert!(!scheduler.poll(start + Duration::from_secs(59), &rules, &mut store));
        assert_eq!(store.get("w", "posx0"), None);

        assert!(scheduler.poll(start + Duration::from_secs(60), &rules, &mut store));
        assert_eq!(store.get("w", "posx0").as_deref(), Some("1"));

        // Отсчёт начинается заново от последней записи
        assert!(!scheduler.poll(start + Duration::from_secs(90), &rules, &mut store));
        assert!(scheduler.poll(start + Duration::from_secs(120), &rules, &mut store));
    }

    #[test]
    fn test_failed_flush_is_retried_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[w]\n").unwrap();
        let mut store = TomlStore::open(&path).unwrap();
        let mut rules = RuleSet::load(&store);
        rules.update("w", Rect::new(10, 20, 30, 40));

        let start = Instant::now();
        let mut scheduler = PersistenceScheduler::new(Duration::from_secs(60), start);

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        assert!(scheduler.poll(start + Duration::from_secs(60), &rules, &mut store));
        assert_eq!(scheduler.failures, 1);

        fs::remove_dir(&path).unwrap();
        assert!(scheduler.poll(start + Duration::from_secs(120), &rules, &mut store));
        assert_eq!(scheduler.failures, 0);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("posx0 = 10"));
        assert!(written.contains("posy1 = 40"));
    }
}
