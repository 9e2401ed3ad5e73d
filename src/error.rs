use std::io;

/// 使用者中斷時的結束碼
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// 批次層級錯誤；單一檔案的失敗不會變成 Err，而是記錄在 ConversionResult 中
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("找不到 ddjvu，請將其加入 PATH 或設定 DJVU_PATH 環境變數")]
    ToolMissing,

    #[error("無效的輸入：{0}")]
    InvalidInput(String),

    #[error("I/O 錯誤：{0}")]
    Io(#[from] io::Error),

    #[error("輸入提示失敗：{0}")]
    Prompt(dialoguer::Error),

    #[error("程式已被使用者中斷")]
    Interrupted,

    #[error("轉換工作執行緒異常結束")]
    Worker,
}

impl DriverError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Interrupted => INTERRUPTED_EXIT_CODE,
            _ => 1,
        }
    }
}

impl From<dialoguer::Error> for DriverError {
    fn from(e: dialoguer::Error) -> Self {
        match e {
            // 原始模式下按 Ctrl-C 會以 Interrupted 讀取錯誤回傳
            dialoguer::Error::IO(ref io_err) if io_err.kind() == io::ErrorKind::Interrupted => {
                DriverError::Interrupted
            }
            other => DriverError::Prompt(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
