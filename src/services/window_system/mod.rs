//! WindowSystem service: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for talking to the desktop:
//! enumerating windows, reading and writing their rectangles and raising them
//! above others. They MUST NOT decide which window belongs to which rule or when
//! a window should be restored. Those decisions live in `rules` and `tracker`.

mod dry_run;
mod r#trait;
mod x11_tools;

pub use self::dry_run::DryRunWindowSystem;
pub use self::r#trait::{create_window_system, WindowSystem};
pub use self::x11_tools::X11ToolsSystem;
