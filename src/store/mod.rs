//! Config store: section-structured key/value storage.
//!
//! The store knows nothing about rules or windows. It exposes raw textual values
//! per `(section, key)` and writes integers back, leaving everything it was not
//! asked to change exactly as read. Interpretation of values is done by `rules`.

mod toml_store;

pub use self::toml_store::TomlStore;

use crate::error::Result;

/// Зарезервированная секция с настройками по умолчанию
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Storage collaborator used by the rule set and the persistence scheduler.
pub trait ConfigStore: Send {
    /// Names of all sections in file order, the default section included.
    fn sections(&self) -> Vec<String>;

    /// Raw value of `key` in `section`; keys are matched case-insensitively.
    fn get(&self, section: &str, key: &str) -> Option<String>;

    fn get_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or_else(|| default.to_string())
    }

    /// Set an integer value, keeping the key's original spelling if it exists.
    fn set(&mut self, section: &str, key: &str, value: i64);

    /// Re-read the backing storage, dropping unsaved changes.
    fn load(&mut self) -> Result<()>;

    /// Write the current contents to the backing storage.
    fn save(&self) -> Result<()>;
}
