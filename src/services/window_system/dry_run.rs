use crate::error::Result;
use crate::events::{Rect, WindowHandle, WindowInfo};
use crate::rwp_error;
use parking_lot::Mutex;
use tracing::info;

use super::r#trait::WindowSystem;

#[derive(Debug, Clone)]
struct EmulatedWindow {
    info: WindowInfo,
    rect: Rect,
    topmost: bool,
    moves: usize,
}

#[derive(Debug, Default)]
struct Desktop {
    windows: Vec<EmulatedWindow>,
    next_handle: u64,
    offline: bool,
    topmost_denied: bool,
}

/// Эмулированный рабочий стол: окна живут в памяти, действия только логируются
#[derive(Debug, Default)]
pub struct DryRunWindowSystem {
    desktop: Mutex<Desktop>,
}

impl DryRunWindowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_windows() -> Self {
        let system = Self::new();
        system.open("Terminal - dry_run", Rect::new(0, 0, 800, 600));
        system.open("Browser - dry_run", Rect::new(100, 50, 1380, 1010));
        system.open("Editor - dry_run", Rect::new(200, 100, 1200, 800));
        system
    }
}

/// Управление эмулированным столом со стороны тестов
#[allow(dead_code)]
impl DryRunWindowSystem {
    fn insert(&self, info: impl FnOnce(WindowHandle) -> WindowInfo, rect: Rect) -> WindowHandle {
        let mut desktop = self.desktop.lock();
        desktop.next_handle += 1;
        let handle = WindowHandle(desktop.next_handle);
        desktop.windows.push(EmulatedWindow {
            info: info(handle),
            rect,
            topmost: false,
            moves: 0,
        });
        handle
    }

    /// Открыть верхнеуровневое окно (добавляется в конец порядка перечисления)
    pub fn open(&self, title: &str, rect: Rect) -> WindowHandle {
        self.insert(|handle| WindowInfo::new(handle, title), rect)
    }

    pub fn open_child(&self, title: &str, rect: Rect) -> WindowHandle {
        self.insert(|handle| WindowInfo::new(handle, title).child(), rect)
    }

    pub fn close(&self, handle: WindowHandle) {
        self.desktop.lock().windows.retain(|w| w.info.handle != handle);
    }

    /// Перемещение окна пользователем, без участия трекера
    pub fn user_move(&self, handle: WindowHandle, rect: Rect) {
        if let Some(window) = self.desktop.lock().windows.iter_mut().find(|w| w.info.handle == handle) {
            window.rect = rect;
        }
    }

    /// Оконный менеджер молча снимает флаг "поверх всех"
    pub fn revoke_topmost(&self, handle: WindowHandle) {
        if let Some(window) = self.desktop.lock().windows.iter_mut().find(|w| w.info.handle == handle) {
            window.topmost = false;
        }
    }

    /// Оконный менеджер отказывает в "поверх всех"
    pub fn deny_topmost(&self, denied: bool) {
        self.desktop.lock().topmost_denied = denied;
    }

    /// Имитация недоступной оконной системы
    pub fn set_offline(&self, offline: bool) {
        self.desktop.lock().offline = offline;
    }

    pub fn rect_of(&self, handle: WindowHandle) -> Option<Rect> {
        self.find(handle).map(|w| w.rect)
    }

    pub fn is_topmost(&self, handle: WindowHandle) -> bool {
        self.find(handle).is_some_and(|w| w.topmost)
    }

    /// Сколько раз трекер двигал окно
    pub fn moves_of(&self, handle: WindowHandle) -> usize {
        self.find(handle).map_or(0, |w| w.moves)
    }
}

impl DryRunWindowSystem {
    fn find(&self, handle: WindowHandle) -> Option<EmulatedWindow> {
        self.desktop
            .lock()
            .windows
            .iter()
            .find(|w| w.info.handle == handle)
            .cloned()
    }

    fn with_window<T>(&self, handle: WindowHandle, f: impl FnOnce(&mut EmulatedWindow) -> T) -> Result<T> {
        let mut desktop = self.desktop.lock();
        if desktop.offline {
            return Err(rwp_error!(service_unavailable, "эмулированный рабочий стол отключён"));
        }
        desktop
            .windows
            .iter_mut()
            .find(|w| w.info.handle == handle)
            .map(f)
            .ok_or_else(|| rwp_error!(window_not_found, "{}", handle))
    }
}

#[async_trait::async_trait]
impl WindowSystem for DryRunWindowSystem {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let desktop = self.desktop.lock();
        if desktop.offline {
            return Err(rwp_error!(service_unavailable, "эмулированный рабочий стол отключён"));
        }
        Ok(desktop.windows.iter().map(|w| w.info.clone()).collect())
    }

    async fn get_rect(&self, handle: WindowHandle) -> Result<Rect> {
        self.with_window(handle, |w| w.rect)
    }

    async fn set_rect(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        self.with_window(handle, |w| {
            info!("[DRY RUN] Окно {} перемещено в {}", w.info, rect);
            w.rect = rect;
            w.moves += 1;
        })
    }

    async fn set_topmost(&self, handle: WindowHandle) -> Result<()> {
        if self.desktop.lock().topmost_denied {
            return Err(rwp_error!(tool, "оконный менеджер отклонил запрос для {}", handle));
        }
        self.with_window(handle, |w| {
            if !w.topmost {
                info!("[DRY RUN] Окно {} поверх остальных", w.info);
            }
            w.topmost = true;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enumeration_order_and_close() {
        let system = DryRunWindowSystem::new();
        let a = system.open("A", Rect::new(0, 0, 10, 10));
        let b = system.open_child("B", Rect::new(0, 0, 10, 10));

        let windows = system.list_windows().await.unwrap();
        assert_eq!(windows.iter().map(|w| w.handle).collect::<Vec<_>>(), vec![a, b]);
        assert!(!windows[1].top_level);

        system.close(a);
        assert!(system.get_rect(a).await.is_err());
        assert_eq!(system.list_windows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_actions_update_state() {
        let system = DryRunWindowSystem::with_sample_windows();
        let handle = system.list_windows().await.unwrap()[0].handle;

        system.set_rect(handle, Rect::new(1, 2, 3, 4)).await.unwrap();
        system.set_topmost(handle).await.unwrap();
        assert_eq!(system.rect_of(handle), Some(Rect::new(1, 2, 3, 4)));
        assert_eq!(system.moves_of(handle), 1);
        assert!(system.is_topmost(handle));

        // Пользовательское перемещение не считается действием трекера
        system.user_move(handle, Rect::new(5, 5, 50, 50));
        assert_eq!(system.moves_of(handle), 1);
    }

    #[tokio::test]
    async fn test_offline_desktop_fails() {
        let system = DryRunWindowSystem::with_sample_windows();
        system.set_offline(true);
        assert!(system.list_windows().await.is_err());
    }
}
