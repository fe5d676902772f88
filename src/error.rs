use thiserror::Error;

#[derive(Error, Debug)]
pub enum RwpError {
    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка разбора TOML: {0}")]
    Toml(#[from] toml_edit::TomlError),

    #[error("Ошибка хранилища: {0}")]
    Storage(String),

    #[error("Внешняя утилита завершилась с ошибкой: {0}")]
    Tool(String),

    #[error("Оконная система недоступна: {0}")]
    ServiceUnavailable(String),

    #[error("Окно не найдено: {0}")]
    WindowNotFound(String),
}

pub type Result<T> = std::result::Result<T, RwpError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! rwp_error {
    (storage, $($arg:tt)*) => {
        $crate::error::RwpError::Storage(format!($($arg)*))
    };
    (tool, $($arg:tt)*) => {
        $crate::error::RwpError::Tool(format!($($arg)*))
    };
    (window_not_found, $($arg:tt)*) => {
        $crate::error::RwpError::WindowNotFound(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::RwpError::ServiceUnavailable(format!($($arg)*))
    };
}
