use crate::error::{Result, RwpError};
use crate::rwp_error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Value};
use tracing::{debug, info};

use super::ConfigStore;

/// TOML-файл конфигурации. Правки вносятся через `toml_edit`, поэтому
/// комментарии, порядок ключей и форматирование сохраняются.
pub struct TomlStore {
    path: Option<PathBuf>,
    document: DocumentMut,
}

impl TomlStore {
    /// Открыть файл; отсутствие или битый синтаксис - ошибка
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = Self {
            path: Some(path.as_ref().to_path_buf()),
            document: DocumentMut::new(),
        };
        store.load()?;
        info!("Конфигурация прочитана из {}", path.as_ref().display());
        Ok(store)
    }

    /// Хранилище без файла: `save` ничего не пишет
    #[cfg(test)]
    pub fn in_memory(contents: &str) -> Result<Self> {
        Ok(Self {
            path: None,
            document: contents.parse::<DocumentMut>()?,
        })
    }

    fn read_document(path: &Path) -> Result<DocumentMut> {
        if !path.is_file() {
            return Err(rwp_error!(storage, "файл не найден: {}", path.display()));
        }

        let contents = fs::read_to_string(path)?;
        Ok(contents.parse::<DocumentMut>()?)
    }

    fn find_key<'a>(table: &'a dyn toml_edit::TableLike, key: &str) -> Option<&'a str> {
        table
            .iter()
            .map(|(name, _)| name)
            .find(|name| name.eq_ignore_ascii_case(key))
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.value().clone()),
        Value::Integer(i) => Some(i.value().to_string()),
        Value::Float(f) => Some(f.value().to_string()),
        Value::Boolean(b) => Some(b.value().to_string()),
        _ => None,
    }
}

impl ConfigStore for TomlStore {
    fn sections(&self) -> Vec<String> {
        self.document
            .as_table()
            .iter()
            .filter(|(_, item)| item.is_table_like())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn get(&self, section: &str, key: &str) -> Option<String> {
        let table = self.document.get(section)?.as_table_like()?;
        let name = Self::find_key(table, key)?;
        table.get(name)?.as_value().and_then(value_to_string)
    }

    fn set(&mut self, section: &str, key: &str, value: i64) {
        if self.document.get(section).map_or(true, |item| !item.is_table_like()) {
            self.document.insert(section, Item::Table(toml_edit::Table::new()));
        }
        let Some(table) = self
            .document
            .get_mut(section)
            .and_then(Item::as_table_like_mut)
        else {
            return;
        };

        let existing = Self::find_key(&*table, key).map(str::to_string);
        match existing.and_then(|name| table.get_mut(&name)) {
            Some(item) => match item.as_value_mut() {
                Some(current) if current.as_integer() == Some(value) => {}
                Some(current) => {
                    // Сохраняем пробелы и комментарий в строке
                    let decor = current.decor().clone();
                    let mut replacement = Value::from(value);
                    *replacement.decor_mut() = decor;
                    *current = replacement;
                }
                None => *item = toml_edit::value(value),
            },
            None => {
                table.insert(key, toml_edit::value(value));
            }
        }
    }

    fn load(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            self.document = Self::read_document(path)?;
            debug!("Конфигурация перечитана из {}", path.display());
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("Хранилище без файла, запись пропущена");
            return Ok(());
        };

        fs::write(path, self.document.to_string()).map_err(|e| {
            RwpError::Storage(format!("не удалось записать {}: {}", path.display(), e))
        })?;
        debug!("Конфигурация записана в {}", path.display());
        Ok(())
    }
}

impl fmt::Display for TomlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)
    }
}
