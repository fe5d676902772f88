use crate::error::Result;
use crate::events::{Rect, WindowHandle, WindowInfo};
use tracing::info;

use super::{DryRunWindowSystem, X11ToolsSystem};

/// Desktop primitives the tracker is built on.
#[async_trait::async_trait]
pub trait WindowSystem: Send + Sync {
    /// Fresh snapshot of every open window, in enumeration order.
    async fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    /// Current rectangle of a window; an error means the window is gone.
    async fn get_rect(&self, handle: WindowHandle) -> Result<Rect>;

    async fn set_rect(&self, handle: WindowHandle, rect: Rect) -> Result<()>;

    /// Ask the window manager to keep the window above others.
    async fn set_topmost(&self, handle: WindowHandle) -> Result<()>;
}

/// Factory function to create the window system based on the dry_run flag
pub async fn create_window_system(
    dry_run: bool,
    scan_children: bool,
) -> Result<Box<dyn WindowSystem>> {
    if dry_run {
        info!("Используется эмуляция рабочего стола (dry-run)");
        Ok(Box::new(DryRunWindowSystem::with_sample_windows()))
    } else {
        let system = X11ToolsSystem::new(scan_children);
        system.test().await?;
        Ok(Box::new(system))
    }
}
