pub mod window;

pub use window::{Rect, WindowEvent, WindowEventType, WindowHandle, WindowInfo};
