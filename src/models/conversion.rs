use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::ValueEnum;

/// ddjvu 的三種固定品質預設
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum QualityLevel {
    Low,
    #[default]
    Normal,
    High,
}

impl QualityLevel {
    /// 回傳 (壓縮參數, 是否平滑)
    pub fn parameters(self) -> (u8, bool) {
        match self {
            QualityLevel::Low => (25, true),
            QualityLevel::Normal => (75, false),
            QualityLevel::High => (100, true),
        }
    }

    pub fn flags(self) -> Vec<String> {
        let (quality, smooth) = self.parameters();
        let mut flags = vec![format!("-quality={}", quality)];
        if smooth {
            flags.push("-smooth".to_string());
        }
        flags
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Low => "低（快速，檔案小）",
            QualityLevel::Normal => "一般（建議）",
            QualityLevel::High => "高（較慢，檔案大）",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityLevel::Low => "low",
            QualityLevel::Normal => "normal",
            QualityLevel::High => "high",
        };
        f.write_str(name)
    }
}

/// 單一檔案的轉換請求，於派送時建立，建立後不再修改
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source_path: PathBuf,
    pub output_directory: PathBuf,
    pub quality: QualityLevel,
    pub timeout_secs: u64,
}

impl ConversionRequest {
    pub fn new(
        source_path: PathBuf,
        output_directory: PathBuf,
        quality: QualityLevel,
        timeout_secs: u64,
    ) -> Self {
        ConversionRequest {
            source_path,
            output_directory,
            quality,
            timeout_secs,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        derive_output_path(&self.source_path, &self.output_directory)
    }
}

/// 輸出路徑只由來源檔名與輸出目錄決定，重複轉換會覆寫同一個檔案
pub fn derive_output_path(source: &Path, output_directory: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output_directory.join(format!("{}.pdf", stem))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    ToolMissing,
    Timeout,
    NonZeroExit,
    UnexpectedError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::ToolMissing => "找不到 ddjvu",
            FailureKind::Timeout => "超過時間限制",
            FailureKind::NonZeroExit => "ddjvu 回傳錯誤碼",
            FailureKind::UnexpectedError => "未預期的錯誤",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug)]
pub struct ConversionResult {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub diagnostic_output: Option<String>,
    pub failure_kind: Option<FailureKind>,
    /// 成功後盡力取得的 PDF 大小
    pub output_size: Option<u64>,
    pub elapsed: Duration,
}

impl ConversionResult {
    pub fn success(request: &ConversionRequest, output_size: Option<u64>, elapsed: Duration) -> Self {
        ConversionResult {
            source_path: request.source_path.clone(),
            output_path: request.output_path(),
            succeeded: true,
            exit_code: Some(0),
            diagnostic_output: None,
            failure_kind: None,
            output_size,
            elapsed,
        }
    }

    pub fn failure(
        request: &ConversionRequest,
        kind: FailureKind,
        exit_code: Option<i32>,
        diagnostic_output: Option<String>,
        elapsed: Duration,
    ) -> Self {
        ConversionResult {
            source_path: request.source_path.clone(),
            output_path: request.output_path(),
            succeeded: false,
            exit_code,
            diagnostic_output,
            failure_kind: Some(kind),
            output_size: None,
            elapsed,
        }
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub results: Vec<ConversionResult>,
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        BatchOutcome {
            total: 0,
            succeeded: 0,
            results: Vec::new(),
            cancelled: false,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, result: ConversionResult) {
        self.total += 1;
        if result.succeeded {
            self.succeeded += 1;
        }
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }
}

impl Default for BatchOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// 每完成一個檔案送出一次
#[derive(Clone, Debug)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub result: ConversionResult,
}

pub trait ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// 合作式取消旗標，只在檔案之間檢查
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
