use crate::error::{Result, RwpError};
use tracing::{info, warn};

/// Проверить, что процесс видит X-сессию
pub fn check_display() -> Result<()> {
    info!("Проверка X-сессии...");

    match std::env::var("DISPLAY") {
        Ok(value) if !value.is_empty() => {
            info!("Используется DISPLAY={}", value);
        }
        _ => {
            return Err(RwpError::ServiceUnavailable(
                "переменная DISPLAY не задана. Запустите из графической сессии или используйте --dry-run".to_string(),
            ));
        }
    }

    if let Ok(session) = std::env::var("XDG_SESSION_TYPE") {
        if session == "wayland" {
            warn!("Сессия Wayland: управлять можно только окнами XWayland");
        }
    }

    check_not_root();
    Ok(())
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("Приложение запущено от имени root!");
            warn!("   Окна принадлежат X-сессии пользователя, запускайте от его имени");
        }
        Ok(user) => {
            info!("Приложение запущено от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}
