pub mod keeper;
pub mod persistence;
pub mod tracker;
pub mod window_system;

pub use keeper::WindowKeeper;
pub use window_system::create_window_system;
