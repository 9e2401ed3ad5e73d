use crate::config::ports::AppConfig;
use crate::error::Result;
use crate::models::conversion::BatchOutcome;

// Facade 接口，負責協調批次轉換流程
pub trait ConversionFacadeTrait {
    /// 依配置執行批次轉換
    /// # 參數
    /// - config: 輸入路徑、輸出目錄、品質與逾時設定
    /// # 回傳
    /// - 成功時返回批次結果（可能包含失敗的檔案）；找不到 ddjvu 時返回錯誤，不會開始任何轉換
    fn execute_conversion(&self, config: &AppConfig) -> Result<BatchOutcome>;
}
