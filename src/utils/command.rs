use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, RwpError};

/// Переменные окружения X-сессии исходного пользователя при запуске через sudo
fn build_env_overrides() -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    for name in ["DISPLAY", "XAUTHORITY"] {
        if let Ok(value) = std::env::var(name) {
            env_vars.insert(name.to_string(), value);
        }
    }

    if std::env::var("USER").unwrap_or_default() == "root" && !env_vars.contains_key("XAUTHORITY") {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            let xauthority = format!("/home/{}/.Xauthority", sudo_user);
            debug!("Подставляем XAUTHORITY для пользователя {}: {}", sudo_user, xauthority);
            env_vars.insert("XAUTHORITY".to_string(), xauthority);
        }
    }

    env_vars
}

/// Команда внешней утилиты с подставленным окружением
pub fn tool_command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in build_env_overrides() {
        cmd.env(key, value);
    }

    cmd
}

/// Запустить утилиту и вернуть stdout; ненулевой код выхода - ошибка
pub async fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = tool_command(program, args)
        .output()
        .await
        .map_err(|e| RwpError::Tool(format!("{} не найден: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{} {:?} вернул ошибку: {}", program, args, stderr.trim());
        return Err(RwpError::Tool(format!(
            "{} {} вернул ошибку: {}",
            program,
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
