use crate::debug_if_enabled;
use crate::events::{Rect, WindowEvent, WindowEventType, WindowHandle, WindowInfo};
use crate::rules::{Rule, RuleSet, WindowMatcher};
use crate::services::window_system::WindowSystem;
use crate::utils::report::{ReportKind, ReportOnce};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Фаза сопоставления правила с живым окном
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    Unmatched,
    MatchedPendingRestore,
    MatchedTracking,
}

/// Состояние правила во время работы; на диск не сохраняется
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    pub handle: Option<WindowHandle>,
    pub phase: MatchPhase,
    pub last_observed_rect: Option<Rect>,
    pub title: Option<String>,
}

impl MatchState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-rule state machine: match, restore once, then only observe.
///
/// A window is moved to its saved rectangle exactly once per appearance. After
/// that the tracker only reads its geometry, so a user moving the window by
/// hand is recorded instead of being fought.
pub struct GeometryTracker {
    matcher: WindowMatcher,
    states: HashMap<String, MatchState>,
    reports: ReportOnce,
}

impl GeometryTracker {
    pub fn new(matcher: WindowMatcher) -> Self {
        Self {
            matcher,
            states: HashMap::new(),
            reports: ReportOnce::new(),
        }
    }

    pub fn state(&self, rule: &str) -> Option<&MatchState> {
        self.states.get(rule)
    }

    /// Обработать все правила на одном снимке списка окон
    pub async fn tick(
        &mut self,
        rules: &mut RuleSet,
        windows: &[WindowInfo],
        system: &dyn WindowSystem,
    ) -> Vec<WindowEvent> {
        let mut events = Vec::new();

        for rule in rules.rules().to_vec() {
            let mut state = self.states.remove(&rule.name).unwrap_or_default();
            self.track_rule(&rule, &mut state, rules, windows, system, &mut events)
                .await;
            self.states.insert(rule.name.clone(), state);
        }

        events
    }

    async fn track_rule(
        &mut self,
        rule: &Rule,
        state: &mut MatchState,
        rules: &mut RuleSet,
        windows: &[WindowInfo],
        system: &dyn WindowSystem,
        events: &mut Vec<WindowEvent>,
    ) {
        if let Some(handle) = state.handle {
            if !windows.iter().any(|w| w.handle == handle) {
                self.vanish(rule, state, events);
            }
        }

        if state.phase == MatchPhase::Unmatched {
            let Some(handle) = self.matcher.find(rule, windows) else {
                return;
            };
            state.handle = Some(handle);
            state.phase = MatchPhase::MatchedPendingRestore;
            state.title = windows
                .iter()
                .find(|w| w.handle == handle)
                .map(|w| w.title.clone());
            events.push(WindowEvent::new(&rule.name, handle, WindowEventType::Matched));
        }

        match state.phase {
            MatchPhase::MatchedPendingRestore => {
                self.restore(rule, state, rules, system, events).await
            }
            MatchPhase::MatchedTracking => self.observe(rule, state, rules, system, events).await,
            MatchPhase::Unmatched => {}
        }
    }

    /// Окно закрыто: следующее появление начинает цикл заново, в том числе отчёты об ошибках
    fn vanish(&mut self, rule: &Rule, state: &mut MatchState, events: &mut Vec<WindowEvent>) {
        if let Some(handle) = state.handle {
            events.push(WindowEvent::new(&rule.name, handle, WindowEventType::Vanished));
        }
        state.reset();

        for kind in [ReportKind::Restore, ReportKind::ReadRect, ReportKind::Topmost] {
            self.reports.clear(kind, &rule.name);
        }
    }

    /// Однократный переход MatchedPendingRestore -> MatchedTracking
    async fn restore(
        &mut self,
        rule: &Rule,
        state: &mut MatchState,
        rules: &mut RuleSet,
        system: &dyn WindowSystem,
        events: &mut Vec<WindowEvent>,
    ) {
        let Some(handle) = state.handle else {
            state.reset();
            return;
        };

        let mut restored = false;
        if let Some(saved) = rule.saved_rect.filter(Rect::is_restorable) {
            match system.set_rect(handle, saved).await {
                Ok(()) => {
                    state.last_observed_rect = Some(saved);
                    events.push(WindowEvent::new(&rule.name, handle, WindowEventType::Restored(saved)));
                    restored = true;
                }
                Err(e) => {
                    if self.reports.first(ReportKind::Restore, &rule.name) {
                        warn!("[{}] не удалось восстановить позицию окна {}: {}", rule.name, handle, e);
                    }
                }
            }
        }

        if !restored {
            // Текущий прямоугольник становится исходной точкой
            match system.get_rect(handle).await {
                Ok(rect) if rect.is_restorable() => {
                    state.last_observed_rect = Some(rect);
                    rules.update(&rule.name, rect);
                    debug!("[{}] окно {} найдено в {}", rule.name, handle, rect);
                }
                Ok(rect) => {
                    debug!("[{}] окно {} свёрнуто или вырождено: {}", rule.name, handle, rect);
                }
                Err(e) => {
                    debug!("[{}] окно {} исчезло при чтении геометрии: {}", rule.name, handle, e);
                    self.vanish(rule, state, events);
                    return;
                }
            }
        }

        state.phase = MatchPhase::MatchedTracking;
        self.assert_topmost(rule, handle, system).await;
    }

    /// Тик в фазе MatchedTracking: только наблюдение
    async fn observe(
        &mut self,
        rule: &Rule,
        state: &mut MatchState,
        rules: &mut RuleSet,
        system: &dyn WindowSystem,
        events: &mut Vec<WindowEvent>,
    ) {
        let Some(handle) = state.handle else {
            state.reset();
            return;
        };

        let rect = match system.get_rect(handle).await {
            Ok(rect) => rect,
            Err(e) => {
                if self.reports.first(ReportKind::ReadRect, &rule.name) {
                    debug!("[{}] не удалось прочитать геометрию окна {}: {}", rule.name, handle, e);
                }
                self.vanish(rule, state, events);
                return;
            }
        };

        if state.last_observed_rect != Some(rect) && rect.is_restorable() {
            state.last_observed_rect = Some(rect);
            rules.update(&rule.name, rect);
            events.push(WindowEvent::new(&rule.name, handle, WindowEventType::GeometryChanged(rect)));
        }

        self.assert_topmost(rule, handle, system).await;
    }

    /// ОС может молча снять флаг "поверх всех", поэтому он повторяется каждый тик
    async fn assert_topmost(&mut self, rule: &Rule, handle: WindowHandle, system: &dyn WindowSystem) {
        if !rule.keep_on_top {
            return;
        }
        if let Err(e) = system.set_topmost(handle).await {
            if self.reports.first(ReportKind::Topmost, &rule.name) {
                warn!("[{}] не удалось закрепить окно {} поверх остальных: {}", rule.name, handle, e);
            }
        }
    }

    /// Сводка по всем правилам в отладочный лог
    pub fn log_summary(&self, rules: &RuleSet) {
        for rule in rules.rules() {
            let state = self.state(&rule.name).cloned().unwrap_or_default();
            let handle = state.handle.map_or("N/A".to_string(), |h| h.to_string());
            let position = state
                .last_observed_rect
                .map_or("N/A".to_string(), |r| r.to_string());
            debug_if_enabled!(
                "[{}] {:?} handle={} title={:?} position={}",
                rule.name,
                state.phase,
                handle,
                state.title.as_deref().unwrap_or("N/A"),
                position
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::window_system::DryRunWindowSystem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    /// Считает события уровня ERROR
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn tracker_for(rules: &RuleSet) -> GeometryTracker {
        GeometryTracker::new(WindowMatcher::for_rules(rules))
    }

    async fn tick(
        tracker: &mut GeometryTracker,
        rules: &mut RuleSet,
        system: &DryRunWindowSystem,
    ) -> Vec<WindowEventType> {
        let windows = system.list_windows().await.unwrap();
        tracker
            .tick(rules, &windows, system)
            .await
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[tokio::test]
    async fn test_restore_on_match() {
        let saved = Rect::new(194, 37, 1770, 912);
        let mut rules = RuleSet::new(vec![Rule::new("Notepad").with_saved_rect(saved)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        let handle = system.open("Notepad", Rect::new(0, 0, 300, 200));

        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events, vec![WindowEventType::Matched, WindowEventType::Restored(saved)]);
        assert_eq!(system.rect_of(handle), Some(saved));

        let state = tracker.state("Notepad").unwrap();
        assert_eq!(state.phase, MatchPhase::MatchedTracking);
        assert_eq!(state.last_observed_rect, Some(saved));
    }

    #[tokio::test]
    async fn test_restore_happens_once_then_observes() {
        let saved = Rect::new(10, 10, 410, 310);
        let mut rules = RuleSet::new(vec![Rule::new("Notepad").with_saved_rect(saved)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        let handle = system.open("Notepad", Rect::new(0, 0, 300, 200));

        tick(&mut tracker, &mut rules, &system).await;
        let moved = Rect::new(500, 500, 900, 800);
        system.user_move(handle, moved);

        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events, vec![WindowEventType::GeometryChanged(moved)]);
        assert_eq!(system.rect_of(handle), Some(moved));
        assert_eq!(system.moves_of(handle), 1);
        assert_eq!(rules.get("Notepad").unwrap().saved_rect, Some(moved));

        // Без изменений - без событий
        assert!(tick(&mut tracker, &mut rules, &system).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_saved_rect_keeps_window_and_sets_baseline() {
        let mut rules = RuleSet::new(vec![Rule::new("Notepad")]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        let current = Rect::new(20, 30, 620, 430);
        let handle = system.open("Notepad", current);

        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events, vec![WindowEventType::Matched]);
        assert_eq!(system.moves_of(handle), 0);
        assert_eq!(tracker.state("Notepad").unwrap().last_observed_rect, Some(current));
        assert_eq!(rules.get("Notepad").unwrap().saved_rect, Some(current));
    }

    #[tokio::test]
    async fn test_reappearance_restarts_cycle() {
        let saved = Rect::new(10, 10, 410, 310);
        let mut rules = RuleSet::new(vec![Rule::new("Notepad").with_saved_rect(saved)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();

        let first = system.open("Notepad", Rect::new(0, 0, 300, 200));
        tick(&mut tracker, &mut rules, &system).await;
        let moved = Rect::new(50, 60, 450, 360);
        system.user_move(first, moved);
        tick(&mut tracker, &mut rules, &system).await;

        system.close(first);
        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events, vec![WindowEventType::Vanished]);
        let state = tracker.state("Notepad").unwrap();
        assert_eq!(state.phase, MatchPhase::Unmatched);
        assert_eq!(state.last_observed_rect, None);

        // Новое окно восстанавливается в последнюю наблюдённую позицию
        let second = system.open("Notepad", Rect::new(0, 0, 300, 200));
        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events, vec![WindowEventType::Matched, WindowEventType::Restored(moved)]);
        assert_eq!(system.rect_of(second), Some(moved));
    }

    #[tokio::test]
    async fn test_vanish_and_rematch_in_same_tick() {
        let mut rules = RuleSet::new(vec![Rule::new("Notepad")]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();

        let first = system.open("Notepad", Rect::new(0, 0, 300, 200));
        tick(&mut tracker, &mut rules, &system).await;
        system.close(first);
        let second = system.open("Notepad", Rect::new(0, 0, 300, 200));

        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(
            events,
            vec![
                WindowEventType::Vanished,
                WindowEventType::Matched,
                WindowEventType::Restored(Rect::new(0, 0, 300, 200)),
            ]
        );
        assert_eq!(tracker.state("Notepad").unwrap().handle, Some(second));
    }

    #[tokio::test]
    async fn test_minimized_window_is_not_recorded() {
        let mut rules = RuleSet::new(vec![Rule::new("Notepad")]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        let normal = Rect::new(0, 0, 300, 200);
        let handle = system.open("Notepad", normal);

        tick(&mut tracker, &mut rules, &system).await;
        system.user_move(handle, Rect::new(-32000, -32000, -31840, -31972));
        assert!(tick(&mut tracker, &mut rules, &system).await.is_empty());
        assert_eq!(rules.get("Notepad").unwrap().saved_rect, Some(normal));
        assert_eq!(tracker.state("Notepad").unwrap().phase, MatchPhase::MatchedTracking);
    }

    #[tokio::test]
    async fn test_keep_on_top_reasserted_every_tick() {
        let mut rules = RuleSet::new(vec![Rule::new("Clock").with_keep_on_top(true)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        let handle = system.open("Clock", Rect::new(0, 0, 100, 100));

        tick(&mut tracker, &mut rules, &system).await;
        assert!(system.is_topmost(handle));

        // Оконный менеджер снял флаг - трекер ставит его снова без изменения геометрии
        system.revoke_topmost(handle);
        assert!(tick(&mut tracker, &mut rules, &system).await.is_empty());
        assert!(system.is_topmost(handle));
    }

    #[tokio::test]
    async fn test_invalid_regex_reported_once_across_ticks() {
        let errors = Arc::new(AtomicUsize::new(0));
        let _guard = tracing_subscriber::registry()
            .with(ErrorCounter(errors.clone()))
            .set_default();

        let mut rules = RuleSet::new(vec![Rule::new("broken").with_title("(").with_regex(true)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        system.open("(", Rect::new(0, 0, 10, 10));

        for _ in 0..5 {
            assert!(tick(&mut tracker, &mut rules, &system).await.is_empty());
        }
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.state("broken").unwrap().phase, MatchPhase::Unmatched);
    }

    #[tokio::test]
    async fn test_failure_reports_rearmed_after_window_closes() {
        let mut rules = RuleSet::new(vec![Rule::new("Clock").with_keep_on_top(true)]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        system.deny_topmost(true);

        let first = system.open("Clock", Rect::new(0, 0, 100, 100));
        tick(&mut tracker, &mut rules, &system).await;
        tick(&mut tracker, &mut rules, &system).await;
        // Отказ уже сообщён для этого окна
        assert!(!tracker.reports.first(ReportKind::Topmost, "Clock"));

        system.close(first);
        assert_eq!(
            tick(&mut tracker, &mut rules, &system).await,
            vec![WindowEventType::Vanished]
        );
        // Для следующего окна отказ снова будет сообщён
        assert!(tracker.reports.first(ReportKind::Topmost, "Clock"));
    }

    #[tokio::test]
    async fn test_misconfigured_rule_does_not_block_others() {
        let mut rules = RuleSet::new(vec![
            Rule::new("broken").with_title("(").with_regex(true),
            Rule::new("Notepad"),
        ]);
        let mut tracker = tracker_for(&rules);
        let system = DryRunWindowSystem::new();
        system.open("(", Rect::new(0, 0, 10, 10));
        system.open("Notepad", Rect::new(0, 0, 300, 200));

        let events = tick(&mut tracker, &mut rules, &system).await;
        assert_eq!(events.len(), 1);
        assert_eq!(tracker.state("broken").unwrap().phase, MatchPhase::Unmatched);
        assert_eq!(tracker.state("Notepad").unwrap().phase, MatchPhase::MatchedTracking);
    }
}
