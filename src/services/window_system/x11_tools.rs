use crate::error::{Result, RwpError};
use crate::events::{Rect, WindowHandle, WindowInfo};
use crate::rwp_error;
use crate::trace_if_enabled;
use crate::utils::command::run_tool;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};

use super::r#trait::WindowSystem;

/// `0x03c00003  0 host Title with  spaces`
static WMCTRL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(0x[0-9a-fA-F]+)\s+-?\d+\s+\S+(?:\s(.*))?$").expect("valid wmctrl regex")
});

/// `     0x1e00007 "Title": ("class" "Class")  800x600+0+0  +100+50`
static XWININFO_TREE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s+(0x[0-9a-fA-F]+) "(.*)": \("#).expect("valid xwininfo regex")
});

/// Рамка оконного менеджера вокруг клиентского окна (`_NET_FRAME_EXTENTS`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameExtents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl FrameExtents {
    /// Куда двигать рамку, чтобы клиентская область оказалась в `rect`.
    ///
    /// `xwininfo` сообщает позицию клиента, а `xdotool windowmove` при
    /// NorthWest gravity ставит туда левый верхний угол рамки.
    pub fn frame_origin(&self, rect: &Rect) -> (i32, i32) {
        (
            rect.x0.saturating_sub(self.left),
            rect.y0.saturating_sub(self.top),
        )
    }
}

/// Окна X11 через стандартные утилиты: wmctrl, xdotool, xwininfo, xprop
pub struct X11ToolsSystem {
    scan_children: bool,
}

impl X11ToolsSystem {
    pub fn new(scan_children: bool) -> Self {
        Self { scan_children }
    }

    /// Проверить, что все нужные утилиты доступны
    pub async fn test(&self) -> Result<()> {
        debug!("=== Тестируем wmctrl, xdotool, xwininfo ===");

        for (program, args) in [
            ("wmctrl", &["-m"][..]),
            ("xdotool", &["version"][..]),
            ("xwininfo", &["-root"][..]),
        ] {
            run_tool(program, args).await.map_err(|e| {
                RwpError::ServiceUnavailable(format!("{} не работает: {}", program, e))
            })?;
        }

        info!("Утилиты X11 доступны (дочерние окна: {})", self.scan_children);
        Ok(())
    }

    /// Без рамки (нет свойства или xprop недоступен) смещение нулевое
    async fn frame_extents(&self, handle: WindowHandle) -> FrameExtents {
        let id = handle.to_string();
        match run_tool("xprop", &["-id", &id, "_NET_FRAME_EXTENTS"]).await {
            Ok(output) => parse_frame_extents(&output).unwrap_or_default(),
            Err(e) => {
                trace_if_enabled!("xprop для окна {} не сработал: {}", id, e);
                FrameExtents::default()
            }
        }
    }

    async fn list_child_windows(&self, top_level: &HashSet<WindowHandle>) -> Result<Vec<WindowInfo>> {
        let output = run_tool("xwininfo", &["-root", "-tree"]).await?;
        Ok(parse_xwininfo_tree(&output)
            .into_iter()
            .filter(|window| !top_level.contains(&window.handle))
            .map(WindowInfo::child)
            .collect())
    }
}

/// Разбор `wmctrl -l`: верхнеуровневые окна, управляемые оконным менеджером
pub fn parse_wmctrl_list(output: &str) -> Vec<WindowInfo> {
    output
        .lines()
        .filter_map(|line| {
            let captures = WMCTRL_LINE.captures(line)?;
            let handle = WindowHandle::parse(&captures[1])?;
            let title = captures.get(2).map_or("", |m| m.as_str()).trim_end();
            if title.is_empty() {
                return None;
            }
            Some(WindowInfo::new(handle, title))
        })
        .collect()
}

/// Разбор `xwininfo -root -tree`: все именованные окна дерева
pub fn parse_xwininfo_tree(output: &str) -> Vec<WindowInfo> {
    output
        .lines()
        .filter_map(|line| {
            let captures = XWININFO_TREE_LINE.captures(line)?;
            let handle = WindowHandle::parse(&captures[1])?;
            let title = &captures[2];
            if title.is_empty() {
                return None;
            }
            Some(WindowInfo::new(handle, title))
        })
        .collect()
}

/// Разбор `xprop -id <id> _NET_FRAME_EXTENTS`: `... = left, right, top, bottom`
pub fn parse_frame_extents(output: &str) -> Option<FrameExtents> {
    let (_, values) = output.trim().split_once('=')?;
    let numbers: Vec<i32> = values
        .split(',')
        .map(|value| value.trim().parse().ok())
        .collect::<Option<_>>()?;

    match numbers[..] {
        [left, right, top, bottom] => Some(FrameExtents {
            left,
            right,
            top,
            bottom,
        }),
        _ => None,
    }
}

/// Разбор `xwininfo -id`: абсолютная позиция и размер окна
pub fn parse_xwininfo_geometry(output: &str) -> Option<Rect> {
    let field = |name: &str| -> Option<i32> {
        output
            .lines()
            .find_map(|line| line.trim().strip_prefix(name))
            .and_then(|value| value.trim().parse().ok())
    };

    let x = field("Absolute upper-left X:")?;
    let y = field("Absolute upper-left Y:")?;
    let width = field("Width:")?;
    let height = field("Height:")?;
    Some(Rect::from_origin_size(x, y, width, height))
}

#[async_trait::async_trait]
impl WindowSystem for X11ToolsSystem {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let output = run_tool("wmctrl", &["-l"]).await?;
        let mut windows = parse_wmctrl_list(&output);
        trace_if_enabled!("wmctrl вернул {} окон", windows.len());

        if self.scan_children {
            let top_level: HashSet<WindowHandle> = windows.iter().map(|w| w.handle).collect();
            windows.extend(self.list_child_windows(&top_level).await?);
        }

        Ok(windows)
    }

    async fn get_rect(&self, handle: WindowHandle) -> Result<Rect> {
        let id = handle.to_string();
        let output = run_tool("xwininfo", &["-id", &id]).await?;
        parse_xwininfo_geometry(&output)
            .ok_or_else(|| rwp_error!(window_not_found, "xwininfo не вернул геометрию окна {}", id))
    }

    async fn set_rect(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let extents = self.frame_extents(handle).await;
        let (frame_x, frame_y) = extents.frame_origin(&rect);

        let id = handle.0.to_string();
        let (x, y) = (frame_x.to_string(), frame_y.to_string());
        let (width, height) = (rect.width().to_string(), rect.height().to_string());

        run_tool(
            "xdotool",
            &["windowsize", &id, &width, &height, "windowmove", &id, &x, &y],
        )
        .await?;
        debug!("Окно {} перемещено в {} (рамка {:?})", handle, rect, extents);
        Ok(())
    }

    async fn set_topmost(&self, handle: WindowHandle) -> Result<()> {
        let id = handle.to_string();
        run_tool("wmctrl", &["-i", "-r", &id, "-b", "add,above"]).await?;
        Ok(())
    }
}
