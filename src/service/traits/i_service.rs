use std::io;
use crate::models::conversion::{ConversionRequest, ConversionResult};
use crate::models::file::{FileCollectInput, FileCollectOutput};

// File 服務接口，負責檔案收集
pub trait FileServiceTrait: Send + Sync {
    /// 收集符合條件的 DjVu 檔案
    /// # 參數
    /// - input: 目錄或檔案清單與過濾條件
    /// # 回傳
    /// - 成功時返回排序後的檔案列表和總大小，失敗時返回 IO 錯誤
    fn collect_files(&self, input: FileCollectInput) -> io::Result<FileCollectOutput>;
}

// 轉換服務接口，負責呼叫外部轉換器處理單一檔案
pub trait ConverterServiceTrait {
    /// 轉換單一檔案，任何失敗都以結果回報而非錯誤
    fn convert_one(&self, request: &ConversionRequest) -> ConversionResult;
}
