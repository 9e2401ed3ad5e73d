use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{DriverError, Result};

pub const DJVU_PATH_ENV: &str = "DJVU_PATH";

#[cfg(windows)]
const PLATFORM_BINARY: &str = "ddjvu.exe";
#[cfg(not(windows))]
const PLATFORM_BINARY: &str = "ddjvu";

const SEARCH_NAMES: [&str; 2] = ["ddjvu", "ddjvu.exe"];

/// 依序檢查 DJVU_PATH 與 PATH 尋找 ddjvu
pub fn locate_converter() -> Result<PathBuf> {
    let override_path = env::var_os(DJVU_PATH_ENV);
    let search_path = env::var_os("PATH");
    locate_converter_in(override_path.as_deref(), search_path.as_deref())
}

pub fn locate_converter_in(
    override_path: Option<&OsStr>,
    search_path: Option<&OsStr>,
) -> Result<PathBuf> {
    if let Some(raw) = override_path.filter(|p| !p.is_empty()) {
        let path = Path::new(raw);
        if is_executable(path) {
            debug!("使用指定的 ddjvu：{}", path.display());
            return Ok(path.to_path_buf());
        }
        if path.is_dir() {
            let candidate = path.join(PLATFORM_BINARY);
            if is_executable(&candidate) {
                debug!("在指定目錄中找到 ddjvu：{}", candidate.display());
                return Ok(candidate);
            }
        }
        warn!("指定的 ddjvu 路徑無效，改為搜尋 PATH：{}", path.display());
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    for name in SEARCH_NAMES {
        if let Ok(found) = which::which_in(name, search_path.map(OsString::from), &cwd) {
            debug!("在 PATH 中找到 ddjvu：{}", found.display());
            return Ok(found);
        }
    }

    Err(DriverError::ToolMissing)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
