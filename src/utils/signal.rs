use std::sync::{Mutex, Once};
use std::thread;

use log::{error, warn};

use crate::error::INTERRUPTED_EXIT_CODE;
use crate::models::conversion::CancellationToken;

static ACTIVE_BATCH: Mutex<Option<CancellationToken>> = Mutex::new(None);
static INSTALL: Once = Once::new();

/// 安裝 Ctrl-C 處理：批次執行中只設定取消旗標，否則直接結束程式
pub fn install_interrupt_handler() {
    INSTALL.call_once(|| {
        let spawned = thread::Builder::new()
            .name("interrupt".to_string())
            .spawn(|| {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("無法建立 Ctrl-C 監聽：{}", e);
                        return;
                    }
                };
                loop {
                    if runtime.block_on(tokio::signal::ctrl_c()).is_err() {
                        return;
                    }
                    let active = ACTIVE_BATCH.lock().ok().and_then(|guard| guard.clone());
                    match active {
                        Some(token) => {
                            warn!("收到中斷訊號，將在目前檔案完成後停止");
                            token.cancel();
                        }
                        None => {
                            eprintln!("\n程式已被使用者中斷。");
                            std::process::exit(INTERRUPTED_EXIT_CODE);
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            error!("無法啟動 Ctrl-C 監聽執行緒：{}", e);
        }
    });
}

/// 在守衛存活期間，Ctrl-C 會取消這個批次
pub struct InterruptGuard;

impl InterruptGuard {
    pub fn arm(token: &CancellationToken) -> Self {
        if let Ok(mut active) = ACTIVE_BATCH.lock() {
            *active = Some(token.clone());
        }
        InterruptGuard
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = ACTIVE_BATCH.lock() {
            *active = None;
        }
    }
}
