use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct FileCollectInput {
    /// 目錄或個別檔案，可混用
    pub inputs: Vec<PathBuf>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Option<Vec<String>>,
    pub recursive: bool,
}

#[derive(Debug)]
pub struct FileCollectOutput {
    pub files: Vec<PathBuf>,
    pub total_size: u64,
}
