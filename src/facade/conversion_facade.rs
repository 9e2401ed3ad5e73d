use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;

use log::{error, info, warn};

use crate::config::ports::AppConfig;
use crate::error::{DriverError, Result};
use crate::facade::traits::i_conversion::ConversionFacadeTrait;
use crate::models::conversion::{
    BatchOutcome, CancellationToken, ConversionRequest, ConversionResult, ProgressEvent,
    ProgressObserver,
};
use crate::models::file::FileCollectInput;
use crate::service::ddjvu::DdjvuService;
use crate::service::locator::{locate_converter, locate_converter_in};
use crate::service::traits::i_service::{ConverterServiceTrait, FileServiceTrait};
use crate::utils::signal::InterruptGuard;
use crate::utils::utils::{create_progress_bar, format_file_size};

/// 依序執行每個請求，一次只有一個 ddjvu 行程
pub fn run_batch(
    converter: &dyn ConverterServiceTrait,
    requests: &[ConversionRequest],
    observer: &dyn ProgressObserver,
    cancel: &CancellationToken,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::new();
    for request in requests {
        if cancel.is_cancelled() {
            info!("批次已取消，完成 {}/{} 個檔案", outcome.total, requests.len());
            outcome.cancelled = true;
            break;
        }
        let result = converter.convert_one(request);
        outcome.record(result.clone());
        observer.on_progress(&ProgressEvent {
            completed: outcome.total,
            total: requests.len(),
            result,
        });
    }
    outcome.finish();
    outcome
}

/// 將進度事件送回呈現層的執行緒
pub struct ChannelObserver {
    tx: Sender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        ChannelObserver { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        // 接收端已關閉時不影響批次
        let _ = self.tx.send(event.clone());
    }
}

/// 為每個檔案建立請求；未指定輸出目錄時寫到來源檔案旁
pub fn build_requests(files: &[PathBuf], config: &AppConfig) -> Vec<ConversionRequest> {
    files
        .iter()
        .map(|file| {
            let output_directory = match &config.output {
                Some(dir) => dir.clone(),
                None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            ConversionRequest::new(file.clone(), output_directory, config.quality, config.timeout_secs)
        })
        .collect()
}

pub struct ConversionFacade {
    file_service: Box<dyn FileServiceTrait>,
}

impl ConversionFacade {
    pub fn new(file_service: Box<dyn FileServiceTrait>) -> Self {
        ConversionFacade { file_service }
    }

    fn resolve_converter(&self, config: &AppConfig) -> Result<PathBuf> {
        let located = match &config.ddjvu {
            Some(path) => {
                let search_path = std::env::var_os("PATH");
                locate_converter_in(Some(path.as_os_str()), search_path.as_deref())
            }
            None => locate_converter(),
        };
        match located {
            Ok(path) => {
                info!("偵測到 ddjvu：{}", path.display());
                Ok(path)
            }
            Err(e) => {
                error!("找不到 ddjvu，請將其加入 PATH 或設定 DJVU_PATH（http://djvu.sourceforge.net/）");
                Err(e)
            }
        }
    }

    /// 在背景執行緒跑完整個批次，目前執行緒只負責顯示進度
    fn dispatch(
        &self,
        converter_path: PathBuf,
        requests: Vec<ConversionRequest>,
        no_progress: bool,
    ) -> Result<BatchOutcome> {
        let total = requests.len();
        let cancel = CancellationToken::new();
        let _guard = InterruptGuard::arm(&cancel);
        let (tx, rx) = mpsc::channel::<ProgressEvent>();

        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("ddjvu-batch".to_string())
            .spawn(move || -> std::io::Result<BatchOutcome> {
                let service = DdjvuService::new(converter_path)?;
                let observer = ChannelObserver::new(tx);
                Ok(run_batch(&service, &requests, &observer, &worker_cancel))
            })?;

        let pm = create_progress_bar(total as u64, no_progress);
        for event in rx {
            log_result(&event.result);
            pm.update(event.completed as u64, &event.result);
        }

        let outcome = worker.join().map_err(|_| DriverError::Worker)??;
        if outcome.cancelled {
            pm.abandon();
        } else {
            pm.finish(outcome.succeeded, outcome.total);
        }
        Ok(outcome)
    }
}

impl ConversionFacadeTrait for ConversionFacade {
    fn execute_conversion(&self, config: &AppConfig) -> Result<BatchOutcome> {
        let converter_path = self.resolve_converter(config)?;

        let file_output = self.file_service.collect_files(FileCollectInput {
            inputs: config.inputs.clone(),
            include_patterns: config.include.clone(),
            exclude_patterns: config.exclude.clone(),
            recursive: config.recursive,
        })?;

        if file_output.files.is_empty() {
            warn!("找不到任何 DjVu 檔案");
            let mut outcome = BatchOutcome::new();
            outcome.finish();
            return Ok(outcome);
        }

        let requests = build_requests(&file_output.files, config);
        info!(
            "開始轉換 {} 個檔案（{}），品質：{}，逾時：{} 秒",
            requests.len(),
            format_file_size(file_output.total_size),
            config.quality,
            config.timeout_secs
        );
        self.dispatch(converter_path, requests, config.no_progress)
    }
}

fn log_result(result: &ConversionResult) {
    if result.succeeded {
        info!("成功：{} -> {}", result.file_name(), result.output_path.display());
    } else if let Some(kind) = result.failure_kind {
        error!("失敗：{}（{}）", result.file_name(), kind);
    }
}
