use std::path::PathBuf;

use crate::config::config::DEFAULT_TIMEOUT_SECS;
use crate::config::ports::{AppConfig, ConfigPort};
use crate::error::Result;
use crate::models::conversion::QualityLevel;

// 配置服務，負責選擇適當的配置適配器
pub struct ConfigService {
    config_port: Box<dyn ConfigPort>,
}

impl ConfigService {
    pub fn new(config_port: Box<dyn ConfigPort>) -> Self {
        ConfigService { config_port }
    }

    pub fn get_config(&self) -> Result<AppConfig> {
        self.config_port.get_config()
    }
}

// 預設配置適配器
pub struct DefaultConfigAdapter {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
}

impl DefaultConfigAdapter {
    pub fn new(inputs: Vec<PathBuf>, output: Option<PathBuf>) -> Self {
        DefaultConfigAdapter { inputs, output }
    }
}

impl ConfigPort for DefaultConfigAdapter {
    fn get_config(&self) -> Result<AppConfig> {
        Ok(AppConfig {
            inputs: self.inputs.clone(),
            output: self.output.clone(),
            quality: QualityLevel::Normal,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            recursive: false,
            include: vec!["*".to_string()],
            exclude: None,
            ddjvu: None,
            no_progress: false,
        })
    }
}
