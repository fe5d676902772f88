use crate::config::Settings;
use crate::error::Result;
use crate::events::WindowEvent;
use crate::rules::{RuleSet, WindowMatcher};
use crate::services::persistence::PersistenceScheduler;
use crate::services::tracker::GeometryTracker;
use crate::services::window_system::WindowSystem;
use crate::store::ConfigStore;
use crate::utils::report::{ReportKind, ReportOnce};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Главный цикл: трекинг на короткой каденции, сохранение на длинной.
///
/// Обе каденции проверяются независимо на каждой итерации одного потока,
/// поэтому они не обязаны быть кратны друг другу.
pub struct WindowKeeper {
    rules: RuleSet,
    store: Box<dyn ConfigStore>,
    system: Box<dyn WindowSystem>,
    tracker: GeometryTracker,
    persistence: PersistenceScheduler,
    refresh_interval: Duration,
    list_windows: bool,
    reports: ReportOnce,
}

impl WindowKeeper {
    pub fn new(
        settings: &Settings,
        rules: RuleSet,
        store: Box<dyn ConfigStore>,
        system: Box<dyn WindowSystem>,
        list_windows: bool,
    ) -> Self {
        let mut matcher = WindowMatcher::for_rules(&rules);
        let disabled = rules
            .rules()
            .iter()
            .filter(|rule| matcher.is_disabled(rule))
            .count();
        if disabled > 0 {
            warn!("Отключено правил из-за неверных шаблонов: {}", disabled);
        }

        let tracker = GeometryTracker::new(matcher);
        Self {
            rules,
            store,
            system,
            tracker,
            persistence: PersistenceScheduler::new(settings.save_interval(), Instant::now()),
            refresh_interval: settings.refresh_interval(),
            list_windows,
            reports: ReportOnce::new(),
        }
    }

    #[allow(dead_code)]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[allow(dead_code)]
    pub fn tracker(&self) -> &GeometryTracker {
        &self.tracker
    }

    /// Одна итерация цикла
    pub async fn tick(&mut self, now: Instant) -> Vec<WindowEvent> {
        let events = match self.system.list_windows().await {
            Ok(windows) => {
                self.reports.clear(ReportKind::Enumerate, "");

                if self.list_windows {
                    println!("--- Открытые окна ({}) ---", windows.len());
                    for window in &windows {
                        println!("{}", window);
                    }
                }

                let events = self
                    .tracker
                    .tick(&mut self.rules, &windows, self.system.as_ref())
                    .await;
                for event in &events {
                    info!("{}", event);
                }
                self.tracker.log_summary(&self.rules);
                events
            }
            Err(e) => {
                // Состояния не сбрасываем: пропуск тика не означает закрытие окон
                if self.reports.first(ReportKind::Enumerate, "") {
                    warn!("Не удалось получить список окон, тик пропущен: {}", e);
                }
                Vec::new()
            }
        };

        self.persistence
            .poll(now, &self.rules, self.store.as_mut());
        events
    }

    /// Сохранить позиции немедленно
    pub fn flush(&mut self) -> Result<()> {
        self.persistence
            .flush_now(Instant::now(), &self.rules, self.store.as_mut())
    }

    /// Работать до завершения `shutdown`, затем попытаться сохранить позиции
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Отслеживание {} окон: опрос каждые {:?}, сохранение каждые {:?}",
            self.rules.len(),
            self.refresh_interval,
            self.persistence.interval()
        );

        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                now = ticker.tick() => {
                    self.tick(now).await;
                }
            }
        }

        info!("Сохранение позиций перед выходом...");
        if let Err(e) = self.flush() {
            warn!("Финальное сохранение не удалось: {}", e);
        }
        Ok(())
    }
}
