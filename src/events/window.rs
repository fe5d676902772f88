use std::fmt;

/// Непрозрачный идентификатор окна (X11 window id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    /// Разбор идентификатора в формате утилит X11 (`0x03c00007`) или десятичном
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok()?,
            None => raw.parse().ok()?,
        };
        Some(Self(value))
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Информация об окне из одного снимка списка окон
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub top_level: bool,
}

impl WindowInfo {
    pub fn new(handle: WindowHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
            top_level: true,
        }
    }

    pub fn child(mut self) -> Self {
        self.top_level = false;
        self
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.top_level {
            write!(f, "{} \"{}\"", self.handle, self.title)
        } else {
            write!(f, "{} \"{}\" (child)", self.handle, self.title)
        }
    }
}

/// Прямоугольник окна: левый верхний (x0, y0) и правый нижний (x1, y1) углы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> i32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Невырожденный прямоугольник: только такие сохраняются
    pub fn is_valid(&self) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1
    }

    /// Свёрнутое окно сообщает все координаты отрицательными
    pub fn is_minimized(&self) -> bool {
        self.x0 < 0 && self.y0 < 0 && self.x1 < 0 && self.y1 < 0
    }

    /// Можно ли запомнить или восстановить этот прямоугольник
    pub fn is_restorable(&self) -> bool {
        self.is_valid() && !self.is_minimized()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Переход состояния, выполненный трекером для правила
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub rule: String,
    pub handle: WindowHandle,
    pub event_type: WindowEventType,
    pub timestamp: std::time::Instant,
}

impl WindowEvent {
    pub fn new(rule: impl Into<String>, handle: WindowHandle, event_type: WindowEventType) -> Self {
        Self {
            rule: rule.into(),
            handle,
            event_type,
            timestamp: std::time::Instant::now(),
        }
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {:?} ({}ms ago)",
            self.rule,
            self.handle,
            self.event_type,
            self.timestamp.elapsed().as_millis()
        )
    }
}

/// Тип события окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEventType {
    Matched,
    Restored(Rect),
    GeometryChanged(Rect),
    Vanished,
}
