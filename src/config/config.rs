use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{DriverError, Result};
use crate::models::conversion::QualityLevel;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Parser, Clone, Debug)]
#[command(
    name = "djvu_to_pdf",
    about = "使用 ddjvu 將 DjVu 檔案批次轉換為 PDF",
    long_about = "一個呼叫外部 ddjvu 工具的批次轉換器，可指定目錄或個別 DjVu 檔案，逐一轉換為 PDF。\n不帶任何參數執行時進入互動模式。ddjvu 會從 --ddjvu、DJVU_PATH 或 PATH 尋找。\n使用 `--help` 查看詳細用法。"
)]
pub struct Cli {
    /// DjVu 檔案或包含 DjVu 檔案的目錄
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,
    /// 輸出目錄；未指定時 PDF 寫在來源檔案旁
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = QualityLevel::Normal)]
    pub quality: QualityLevel,
    /// 每個檔案的轉換時間上限（秒）
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,
    #[arg(long, default_value = "*", value_delimiter = ',')]
    pub include: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,
    /// ddjvu 執行檔或其所在目錄，優先於 DJVU_PATH
    #[arg(long, value_name = "PATH")]
    pub ddjvu: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
    #[arg(long, default_value = "info", value_parser = ["debug", "info", "warn", "error"])]
    pub log_level: String,
    #[arg(long, default_value_t = false)]
    pub show_config: bool,
}

pub fn validate_input_path(input: &Path) -> Result<&Path> {
    if !input.exists() {
        log::error!("輸入路徑不存在：{}", input.display());
        return Err(DriverError::InvalidInput(format!(
            "輸入路徑 '{}' 不存在",
            input.display()
        )));
    }
    Ok(input)
}

pub fn validate_timeout(timeout_secs: u64) -> Result<u64> {
    if timeout_secs == 0 {
        return Err(DriverError::InvalidInput("逾時秒數必須大於 0".to_string()));
    }
    Ok(timeout_secs)
}

pub fn is_valid_pattern(pattern: &str) -> bool {
    let invalid_chars = ['/', '\\', ':', '?', '"', '<', '>', '|'];
    !pattern.is_empty() && !pattern.contains(&invalid_chars[..])
}

pub fn validate_file_patterns(include: &[String], exclude: &Option<Vec<String>>) -> Result<()> {
    for pattern in include {
        if !is_valid_pattern(pattern) {
            return Err(DriverError::InvalidInput(format!("無效的包含模式: {}", pattern)));
        }
    }
    if let Some(exclude_patterns) = exclude {
        for pattern in exclude_patterns {
            if !is_valid_pattern(pattern) {
                return Err(DriverError::InvalidInput(format!("無效的排除模式: {}", pattern)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["djvu_to_pdf", "books"]).unwrap();
        assert_eq!(cli.quality, QualityLevel::Normal);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.include, vec!["*".to_string()]);
        assert!(cli.output.is_none());
        assert!(!cli.recursive);
    }

    #[test]
    fn cli_parses_quality_and_patterns() {
        let cli = Cli::try_parse_from([
            "djvu_to_pdf",
            "a.djvu",
            "b.djv",
            "--quality",
            "high",
            "--exclude",
            "draft*,old*",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.quality, QualityLevel::High);
        assert_eq!(cli.exclude, Some(vec!["draft*".to_string(), "old*".to_string()]));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(validate_timeout(0).is_err());
        assert_eq!(validate_timeout(30).unwrap(), 30);
    }

    #[test]
    fn patterns_with_separators_are_rejected() {
        assert!(validate_file_patterns(&["*.djvu".to_string()], &None).is_ok());
        assert!(validate_file_patterns(&["a/b".to_string()], &None).is_err());
        assert!(validate_file_patterns(&["*".to_string()], &Some(vec!["".to_string()])).is_err());
    }
}
