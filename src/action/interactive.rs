use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

use crate::action::cli::print_summary;
use crate::config::config::DEFAULT_TIMEOUT_SECS;
use crate::config::ports::{AppConfig, ConfigPort};
use crate::error::Result;
use crate::facade::conversion_facade::ConversionFacade;
use crate::facade::traits::i_conversion::ConversionFacadeTrait;
use crate::models::conversion::QualityLevel;
use crate::service::config_service::{ConfigService, DefaultConfigAdapter};
use crate::service::file::{discover_input_files, parse_selection, FileService};
use crate::service::locator::locate_converter;
use crate::utils::utils::{format_file_size, setup_logging};

pub fn process_interactive_mode() -> Result<()> {
    setup_logging("info");
    println!("{}", "=".repeat(60));
    println!("DjVu → PDF 轉換器（互動模式）");
    println!("{}", "=".repeat(60));

    // 先確認 ddjvu 存在，找不到就不進入選單
    let ddjvu = locate_converter()?;
    println!("偵測到 ddjvu：{}", ddjvu.display());

    let facade: Box<dyn ConversionFacadeTrait> =
        Box::new(ConversionFacade::new(Box::new(FileService::new())));

    loop {
        let directory = get_input_directory()?;
        let files = discover_input_files(&directory)?;
        display_files(&files);
        if files.is_empty() {
            if get_confirm("要嘗試其他目錄嗎？", true)? {
                continue;
            }
            break;
        }

        let selected = match select_files(&files)? {
            Some(selected) => selected,
            None => continue,
        };
        let output = get_output_path(&directory)?;

        let config_port: Box<dyn ConfigPort> = if get_default_config_option()? {
            Box::new(DefaultConfigAdapter::new(selected, Some(output)))
        } else {
            Box::new(InteractiveConfigAdapter::new(selected, output))
        };
        let config = ConfigService::new(config_port).get_config()?;

        print_plan(&config);
        if !get_confirm("開始轉換？", true)? {
            continue;
        }

        let outcome = facade.execute_conversion(&config)?;
        print_summary(&outcome, config.output.as_deref());

        if !get_confirm("要繼續轉換其他檔案嗎？", false)? {
            break;
        }
    }

    println!("\n感謝使用！");
    Ok(())
}

pub fn get_default_config_option() -> Result<bool> {
    get_confirm("是否使用預設配置？（一般品質、逾時 300 秒）", true)
}

pub fn get_input_directory() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let input: String = Input::new()
        .with_prompt("請輸入 DjVu 檔案所在目錄")
        .default(cwd.to_string_lossy().to_string())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if Path::new(input).is_dir() { Ok(()) } else { Err(format!("目錄 '{}' 不存在", input)) }
        })
        .interact_text()?;
    Ok(PathBuf::from(input))
}

pub fn display_files(files: &[PathBuf]) {
    if files.is_empty() {
        println!("此目錄中找不到 DjVu 檔案。");
        return;
    }
    println!("\n找到 {} 個 DjVu 檔案：", files.len());
    println!("{}", "-".repeat(60));
    for (i, file) in files.iter().enumerate() {
        let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let size = fs::metadata(file)
            .map(|m| format_file_size(m.len()))
            .unwrap_or_else(|_| "??".to_string());
        println!("{:2}. {} ({})", i + 1, name, size);
    }
}

/// 回傳 None 表示回到目錄選擇
pub fn select_files(files: &[PathBuf]) -> Result<Option<Vec<PathBuf>>> {
    let choice = Select::new()
        .with_prompt("選擇要轉換的檔案（使用方向鍵選擇，按 Enter 確認）")
        .items(&["全部檔案", "指定編號（例如 1,3,5 或 1-5）", "返回目錄選擇"])
        .default(0)
        .interact()?;

    match choice {
        0 => Ok(Some(files.to_vec())),
        1 => {
            let count = files.len();
            let selection: String = Input::new()
                .with_prompt("請輸入檔案編號")
                .validate_with(move |input: &String| -> std::result::Result<(), String> {
                    parse_selection(input, count).map(|_| ())
                })
                .interact_text()?;
            let indices = parse_selection(&selection, count).unwrap_or_default();
            Ok(Some(indices.into_iter().map(|i| files[i - 1].clone()).collect()))
        }
        _ => Ok(None),
    }
}

pub fn get_output_path(directory: &Path) -> Result<PathBuf> {
    let output: String = Input::new()
        .with_prompt("輸出目錄")
        .default(directory.to_string_lossy().to_string())
        .interact_text()?;
    Ok(PathBuf::from(output))
}

pub fn get_quality_option() -> Result<QualityLevel> {
    let levels = [QualityLevel::Low, QualityLevel::Normal, QualityLevel::High];
    let labels: Vec<_> = levels.iter().map(|l| l.label()).collect();
    let choice = Select::new()
        .with_prompt("選擇轉換品質")
        .items(&labels)
        .default(1)
        .interact()?;
    Ok(levels[choice])
}

pub fn get_timeout_option() -> Result<u64> {
    let timeout: u64 = Input::new()
        .with_prompt("每個檔案的逾時秒數")
        .default(DEFAULT_TIMEOUT_SECS)
        .validate_with(|value: &u64| -> std::result::Result<(), String> {
            if *value > 0 { Ok(()) } else { Err("逾時秒數必須大於 0".to_string()) }
        })
        .interact_text()?;
    Ok(timeout)
}

fn get_confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
}

fn print_plan(config: &AppConfig) {
    println!("\n轉換計畫：");
    println!("   檔案數量：{}", config.inputs.len());
    if let Some(output) = &config.output {
        println!("   輸出目錄：{}", output.display());
    }
    println!("   品質：{}", config.quality);
    println!("   逾時：{} 秒", config.timeout_secs);
}

// 交互配置適配器
pub struct InteractiveConfigAdapter {
    inputs: Vec<PathBuf>,
    output: PathBuf,
}

impl InteractiveConfigAdapter {
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        InteractiveConfigAdapter { inputs, output }
    }
}

impl ConfigPort for InteractiveConfigAdapter {
    fn get_config(&self) -> Result<AppConfig> {
        let quality = get_quality_option()?;
        let timeout_secs = get_timeout_option()?;

        Ok(AppConfig {
            inputs: self.inputs.clone(),
            output: Some(self.output.clone()),
            quality,
            timeout_secs,
            recursive: false,
            include: vec!["*".to_string()],
            exclude: None,
            ddjvu: None,
            no_progress: false,
        })
    }
}
