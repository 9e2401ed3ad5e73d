use std::path::PathBuf;

use crate::error::Result;
use crate::models::conversion::QualityLevel;

// 應用配置結構體，封裝所有參數
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub inputs: Vec<PathBuf>,
    /// None 表示輸出到來源檔案所在目錄
    pub output: Option<PathBuf>,
    pub quality: QualityLevel,
    pub timeout_secs: u64,
    pub recursive: bool,
    pub include: Vec<String>,
    pub exclude: Option<Vec<String>>,
    pub ddjvu: Option<PathBuf>,
    pub no_progress: bool,
}

// 配置來源的 Port
pub trait ConfigPort {
    fn get_config(&self) -> Result<AppConfig>;
}
