use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const DB_URL_ENV: &str = "QUIZ_DB_URL";
pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";

/// `--db` wins over `QUIZ_DB_URL`, which wins over the default file.
pub fn resolve_db_url(flag: Option<String>) -> Result<String> {
    let raw = match flag {
        Some(value) => {
            if value.trim().is_empty() {
                bail!("--db needs a database URL or path");
            }
            value
        }
        None => std::env::var(DB_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
    };
    Ok(normalize_sqlite_url(raw))
}

/// Turn plain or relative paths into absolute `sqlite://` URLs.
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so the pool can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database URL: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database URL: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("could not create database file {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:file:memdb_x?mode=memory&cache=shared".into()),
            "sqlite:file:memdb_x?mode=memory&cache=shared"
        );
    }

    #[test]
    fn absolute_paths_become_urls() {
        assert_eq!(
            normalize_sqlite_url("/tmp/quiz.sqlite3".into()),
            "sqlite:///tmp/quiz.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/data/q.db".into()),
            "sqlite:///var/data/q.db"
        );
    }

    #[test]
    fn relative_paths_are_anchored_at_current_dir() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(url, format!("sqlite://{}", cwd.join("data/quiz.db").display()));
    }

    #[test]
    fn blank_flag_is_rejected() {
        assert!(resolve_db_url(Some("  ".into())).is_err());
    }

    #[test]
    fn prepare_creates_missing_file() {
        let dir = std::env::temp_dir().join(format!("quizmaster_cfg_{}", std::process::id()));
        let file = dir.join("nested").join("quiz.sqlite3");
        let url = format!("sqlite://{}", file.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(file.exists());
        prepare_sqlite_file(&url).unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
