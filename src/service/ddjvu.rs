use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::{error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::time::timeout;

use crate::models::conversion::{ConversionRequest, ConversionResult, FailureKind};
use crate::service::traits::i_service::ConverterServiceTrait;
use crate::utils::utils::{format_file_size, tail_chars};

/// 錯誤輸出保留的最後字元數
pub const DIAGNOSTIC_TAIL_CHARS: usize = 500;

enum ProcessOutcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// 呼叫 ddjvu 的轉換服務；路徑在批次開始前解析一次，之後唯讀
pub struct DdjvuService {
    converter_path: PathBuf,
    runtime: Runtime,
}

impl DdjvuService {
    pub fn new(converter_path: PathBuf) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(DdjvuService {
            converter_path,
            runtime,
        })
    }

    pub fn converter_path(&self) -> &Path {
        &self.converter_path
    }

    async fn run_converter(&self, args: &[OsString], timeout_secs: u64) -> io::Result<ProcessOutcome> {
        let mut command = Command::new(&self.converter_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // 終端機的 Ctrl-C 只交給取消旗標處理，不直接中斷轉換中的 ddjvu
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let waited = timeout(Duration::from_secs(timeout_secs), async {
            let (out, err, status) = tokio::join!(
                read_pipe(stdout.as_mut()),
                read_pipe(stderr.as_mut()),
                child.wait()
            );
            Ok::<_, io::Error>((status?, out?, err?))
        })
        .await;

        match waited {
            Ok(finished) => {
                let (status, stdout, stderr) = finished?;
                Ok(ProcessOutcome::Exited {
                    status,
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                // kill() 會等待子行程結束並回收
                child.kill().await?;
                Ok(ProcessOutcome::TimedOut)
            }
        }
    }
}

impl ConverterServiceTrait for DdjvuService {
    fn convert_one(&self, request: &ConversionRequest) -> ConversionResult {
        let start = Instant::now();
        let output_path = request.output_path();
        let file_name = display_name(&request.source_path);
        info!(
            "轉換中：{} -> {}",
            file_name,
            display_name(&output_path)
        );

        if let Err(e) = fs::create_dir_all(&request.output_directory) {
            error!("無法建立輸出目錄 {}：{}", request.output_directory.display(), e);
            return ConversionResult::failure(
                request,
                FailureKind::UnexpectedError,
                None,
                Some(e.to_string()),
                start.elapsed(),
            );
        }

        let args = build_arguments(request);
        let outcome = self
            .runtime
            .block_on(self.run_converter(&args, request.timeout_secs));

        match outcome {
            Ok(ProcessOutcome::Exited { status, .. }) if status.success() => {
                let output_size = fs::metadata(&output_path).ok().map(|m| m.len());
                match output_size {
                    Some(size) => info!("已建立：{}（{}）", display_name(&output_path), format_file_size(size)),
                    None => info!("已建立：{}", display_name(&output_path)),
                }
                ConversionResult::success(request, output_size, start.elapsed())
            }
            Ok(ProcessOutcome::Exited {
                status,
                stdout,
                stderr,
            }) => {
                let diagnostics = format_diagnostics(&stdout, &stderr);
                error!("轉換 {} 失敗（代碼 {:?}）", file_name, status.code());
                ConversionResult::failure(
                    request,
                    FailureKind::NonZeroExit,
                    status.code(),
                    diagnostics,
                    start.elapsed(),
                )
            }
            Ok(ProcessOutcome::TimedOut) => {
                warn!("{} 超過時間限制（{} 秒），已終止 ddjvu", file_name, request.timeout_secs);
                ConversionResult::failure(
                    request,
                    FailureKind::Timeout,
                    None,
                    None,
                    start.elapsed(),
                )
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!("找不到 ddjvu：{}", self.converter_path.display());
                ConversionResult::failure(
                    request,
                    FailureKind::ToolMissing,
                    None,
                    Some(e.to_string()),
                    start.elapsed(),
                )
            }
            Err(e) => {
                error!("轉換 {} 時發生未預期的錯誤：{}", file_name, e);
                ConversionResult::failure(
                    request,
                    FailureKind::UnexpectedError,
                    None,
                    Some(e.to_string()),
                    start.elapsed(),
                )
            }
        }
    }
}

/// ddjvu -format=pdf <品質參數> <來源> <目的地>
pub fn build_arguments(request: &ConversionRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![OsString::from("-format=pdf")];
    args.extend(request.quality.flags().into_iter().map(OsString::from));
    args.push(request.source_path.clone().into_os_string());
    args.push(request.output_path().into_os_string());
    args
}

fn format_diagnostics(stdout: &str, stderr: &str) -> Option<String> {
    let mut text = String::new();
    if !stdout.trim().is_empty() {
        text.push_str("---- STDOUT ----\n");
        text.push_str(stdout.trim_end());
        text.push('\n');
    }
    if !stderr.trim().is_empty() {
        text.push_str("---- STDERR ----\n");
        text.push_str(stderr.trim_end());
    }
    if text.is_empty() {
        None
    } else {
        Some(tail_chars(&text, DIAGNOSTIC_TAIL_CHARS))
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>) -> io::Result<String> {
    let mut buffer = Vec::new();
    if let Some(pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conversion::QualityLevel;
    use tempfile::TempDir;

    fn request(dir: &Path, name: &str, quality: QualityLevel, timeout_secs: u64) -> ConversionRequest {
        let source = dir.join(name);
        fs::write(&source, b"AT&TFORM").unwrap();
        ConversionRequest::new(source, dir.join("out"), quality, timeout_secs)
    }

    #[test]
    fn arguments_follow_quality_table() {
        let req = ConversionRequest::new(
            PathBuf::from("/in/book.djvu"),
            PathBuf::from("/out"),
            QualityLevel::Low,
            300,
        );
        let args = build_arguments(&req);
        assert_eq!(
            args,
            vec![
                OsString::from("-format=pdf"),
                OsString::from("-quality=25"),
                OsString::from("-smooth"),
                OsString::from("/in/book.djvu"),
                OsString::from("/out/book.pdf"),
            ]
        );

        let normal = ConversionRequest { quality: QualityLevel::Normal, ..req.clone() };
        assert_eq!(build_arguments(&normal).len(), 4);
        let high = ConversionRequest { quality: QualityLevel::High, ..req };
        assert_eq!(build_arguments(&high)[1], OsString::from("-quality=100"));
    }

    #[test]
    fn diagnostics_keep_only_the_tail() {
        let long = "x".repeat(2000);
        let text = format_diagnostics("", &long).unwrap();
        assert_eq!(text.chars().count(), DIAGNOSTIC_TAIL_CHARS);
        assert!(format_diagnostics("  ", "\n").is_none());
    }

    #[test]
    fn missing_binary_is_reported_as_tool_missing() {
        let dir = TempDir::new().unwrap();
        let service = DdjvuService::new(dir.path().join("no-such-ddjvu")).unwrap();
        let req = request(dir.path(), "a.djvu", QualityLevel::Normal, 5);

        let result = service.convert_one(&req);
        assert!(!result.succeeded);
        assert_eq!(result.failure_kind, Some(FailureKind::ToolMissing));
        assert_eq!(result.output_path, dir.path().join("out").join("a.pdf"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("ddjvu-stub");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn zero_exit_is_success_and_reports_size() {
            let dir = TempDir::new().unwrap();
            let service = DdjvuService::new(stub(
                dir.path(),
                "for last; do :; done\nprintf '%%PDF-1.4' > \"$last\"",
            ))
            .unwrap();
            let req = request(dir.path(), "book.djvu", QualityLevel::High, 10);

            let result = service.convert_one(&req);
            assert!(result.succeeded, "{:?}", result.diagnostic_output);
            assert_eq!(result.exit_code, Some(0));
            assert_eq!(result.failure_kind, None);
            assert_eq!(result.output_size, Some(8));
            assert!(dir.path().join("out").join("book.pdf").exists());
        }

        #[test]
        fn success_without_output_file_stays_successful() {
            let dir = TempDir::new().unwrap();
            let service = DdjvuService::new(stub(dir.path(), "exit 0")).unwrap();
            let req = request(dir.path(), "book.djvu", QualityLevel::Normal, 10);

            let result = service.convert_one(&req);
            assert!(result.succeeded);
            assert_eq!(result.output_size, None);
        }

        #[test]
        fn nonzero_exit_captures_diagnostics() {
            let dir = TempDir::new().unwrap();
            let service = DdjvuService::new(stub(
                dir.path(),
                "echo 'decoding page 1'\necho 'corrupt chunk' >&2\nexit 3",
            ))
            .unwrap();
            let req = request(dir.path(), "broken.djvu", QualityLevel::Normal, 10);

            let result = service.convert_one(&req);
            assert!(!result.succeeded);
            assert_eq!(result.failure_kind, Some(FailureKind::NonZeroExit));
            assert_eq!(result.exit_code, Some(3));
            let diagnostics = result.diagnostic_output.unwrap();
            assert!(diagnostics.contains("decoding page 1"));
            assert!(diagnostics.contains("corrupt chunk"));
            assert_eq!(result.output_path, dir.path().join("out").join("broken.pdf"));
        }

        #[test]
        fn hanging_converter_is_killed_after_timeout() {
            let dir = TempDir::new().unwrap();
            let pid_file = dir.path().join("pid");
            let service = DdjvuService::new(stub(
                dir.path(),
                &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
            ))
            .unwrap();
            let req = request(dir.path(), "slow.djvu", QualityLevel::Normal, 1);

            let start = Instant::now();
            let result = service.convert_one(&req);
            assert!(start.elapsed() < Duration::from_secs(10));
            assert!(!result.succeeded);
            assert_eq!(result.failure_kind, Some(FailureKind::Timeout));

            #[cfg(target_os = "linux")]
            {
                let pid = fs::read_to_string(&pid_file).unwrap();
                let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));
                assert!(!proc_entry.exists(), "ddjvu stub is still running");
            }
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn converter_runs_in_its_own_process_group() {
            let dir = TempDir::new().unwrap();
            let stat_file = dir.path().join("stat");
            let service = DdjvuService::new(stub(
                dir.path(),
                &format!("cat /proc/$$/stat > '{}'", stat_file.display()),
            ))
            .unwrap();
            let req = request(dir.path(), "group.djvu", QualityLevel::Normal, 10);

            assert!(service.convert_one(&req).succeeded);
            let stat = fs::read_to_string(&stat_file).unwrap();
            let pid = stat.split_whitespace().next().unwrap().to_string();
            let after_name = &stat[stat.rfind(')').unwrap() + 1..];
            let pgrp = after_name.split_whitespace().nth(2).unwrap();
            assert_eq!(pgrp, pid);
        }

        #[test]
        fn rerunning_a_request_targets_the_same_output() {
            let dir = TempDir::new().unwrap();
            let service = DdjvuService::new(stub(dir.path(), "exit 1")).unwrap();
            let req = request(dir.path(), "same.djvu", QualityLevel::Low, 10);

            let first = service.convert_one(&req);
            let second = service.convert_one(&req);
            assert_eq!(first.output_path, second.output_path);
        }

        #[test]
        fn unwritable_output_directory_is_unexpected_error() {
            let dir = TempDir::new().unwrap();
            let blocker = dir.path().join("blocker");
            fs::write(&blocker, b"file, not a directory").unwrap();
            let service = DdjvuService::new(stub(dir.path(), "exit 0")).unwrap();
            let source = dir.path().join("a.djvu");
            fs::write(&source, b"AT&TFORM").unwrap();
            let req = ConversionRequest::new(source, blocker.join("out"), QualityLevel::Normal, 5);

            let result = service.convert_one(&req);
            assert_eq!(result.failure_kind, Some(FailureKind::UnexpectedError));
            assert!(result.diagnostic_output.is_some());
        }
    }
}
