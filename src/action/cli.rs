use std::path::Path;

use clap::Parser;

use crate::action::interactive::process_interactive_mode;
use crate::config::config::{validate_file_patterns, validate_input_path, validate_timeout, Cli};
use crate::config::ports::{AppConfig, ConfigPort};
use crate::error::Result;
use crate::facade::conversion_facade::ConversionFacade;
use crate::facade::traits::i_conversion::ConversionFacadeTrait;
use crate::models::conversion::BatchOutcome;
use crate::service::config_service::ConfigService;
use crate::service::file::FileService;
use crate::utils::signal::install_interrupt_handler;
use crate::utils::utils::setup_logging;

pub fn process_args(args: Vec<String>) -> Result<Option<BatchOutcome>> {
    install_interrupt_handler();
    if args.len() == 1 {
        process_interactive_mode()?;
        Ok(None)
    } else {
        process_cli_mode().map(Some)
    }
}

pub fn process_cli_mode() -> Result<BatchOutcome> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config_service = ConfigService::new(Box::new(CliConfigAdapter::new(cli.clone())));
    let config = config_service.get_config()?;

    let facade: Box<dyn ConversionFacadeTrait> =
        Box::new(ConversionFacade::new(Box::new(FileService::new())));
    let outcome = facade.execute_conversion(&config)?;
    print_summary(&outcome, config.output.as_deref());

    // 若啟用 --show-config，在轉換後顯示配置
    if cli.show_config {
        println!("實際使用的配置：{:#?}", config);
    }

    Ok(outcome)
}

/// 顯示批次摘要與每個失敗檔案的診斷輸出
pub fn print_summary(outcome: &BatchOutcome, output: Option<&Path>) {
    println!("\n{}", "=".repeat(60));
    println!("轉換摘要");
    println!("{}", "=".repeat(60));
    println!("成功轉換：{}", outcome.succeeded);
    println!("失敗：{}", outcome.failed());
    if outcome.cancelled {
        println!("批次已取消，未處理的檔案不列入統計");
    }
    match output {
        Some(dir) => println!("PDF 檔案位於：{}", dir.display()),
        None => println!("PDF 檔案位於各來源檔案的目錄"),
    }
    if let Some(finished) = outcome.finished_at {
        let elapsed = finished - outcome.started_at;
        println!("耗時：{:.1} 秒", elapsed.num_milliseconds() as f64 / 1000.0);
    }

    for result in outcome.failures() {
        let kind = result
            .failure_kind
            .map(|k| k.to_string())
            .unwrap_or_default();
        match result.exit_code {
            Some(code) => println!("\n✗ {}：{}（代碼 {}）", result.file_name(), kind, code),
            None => println!("\n✗ {}：{}", result.file_name(), kind),
        }
        if let Some(diagnostics) = &result.diagnostic_output {
            println!("{}", diagnostics);
        }
    }
}

// CLI 配置適配器
pub struct CliConfigAdapter {
    cli: Cli,
}

impl CliConfigAdapter {
    pub fn new(cli: Cli) -> Self {
        CliConfigAdapter { cli }
    }
}

impl ConfigPort for CliConfigAdapter {
    fn get_config(&self) -> Result<AppConfig> {
        for input in &self.cli.inputs {
            validate_input_path(input)?;
        }
        validate_file_patterns(&self.cli.include, &self.cli.exclude)?;
        let timeout_secs = validate_timeout(self.cli.timeout)?;

        Ok(AppConfig {
            inputs: self.cli.inputs.clone(),
            output: self.cli.output.clone(),
            quality: self.cli.quality,
            timeout_secs,
            recursive: self.cli.recursive,
            include: self.cli.include.clone(),
            exclude: self.cli.exclude.clone(),
            ddjvu: self.cli.ddjvu.clone(),
            no_progress: self.cli.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::models::conversion::QualityLevel;
    use tempfile::TempDir;

    #[test]
    fn adapter_maps_cli_to_config() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["djvu_to_pdf", input.as_str(), "-q", "low", "-t", "45", "-r"]).unwrap();

        let config = CliConfigAdapter::new(cli).get_config().unwrap();
        assert_eq!(config.quality, QualityLevel::Low);
        assert_eq!(config.timeout_secs, 45);
        assert!(config.recursive);
        assert_eq!(config.inputs, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn adapter_rejects_missing_input() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["djvu_to_pdf", missing.as_str()]).unwrap();

        let result = CliConfigAdapter::new(cli).get_config();
        assert!(matches!(result, Err(DriverError::InvalidInput(_))));
    }

    #[test]
    fn adapter_rejects_zero_timeout() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["djvu_to_pdf", input.as_str(), "--timeout", "0"]).unwrap();

        assert!(CliConfigAdapter::new(cli).get_config().is_err());
    }
}
