use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

use log::{debug, warn};
use regex::RegexSet;
use walkdir::WalkDir;

use crate::models::file::{FileCollectInput, FileCollectOutput};
use crate::service::traits::i_service::FileServiceTrait;
use crate::utils::utils::create_regex_sets;

/// DjVu 副檔名家族，比對時不分大小寫
pub const DJVU_EXTENSIONS: [&str; 2] = ["djvu", "djv"];

pub fn is_djvu_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            DJVU_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// 找出目錄中的 DjVu 檔案，回傳去重並依完整路徑排序的絕對路徑
pub fn discover_input_files(directory: &Path) -> io::Result<Vec<PathBuf>> {
    discover_with_depth(directory, 1)
}

pub fn discover_input_files_recursive(directory: &Path) -> io::Result<Vec<PathBuf>> {
    discover_with_depth(directory, usize::MAX)
}

fn discover_with_depth(directory: &Path, max_depth: usize) -> io::Result<Vec<PathBuf>> {
    let root = path::absolute(directory)?;
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("目錄 '{}' 不存在", root.display()),
        ));
    }
    let mut files = Vec::new();
    let mut skipped_dirs = 0u64;
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // 無法讀取的子目錄或符號連結迴圈只跳過該項目
                warn!("跳過無法存取的路徑：{}", e);
                skipped_dirs += 1;
                continue;
            }
        };
        if entry.file_type().is_file() && is_djvu_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files.dedup();
    debug!(
        "在 {} 中找到 {} 個 DjVu 檔案，跳過 {} 個項目",
        root.display(),
        files.len(),
        skipped_dirs
    );
    Ok(files)
}

/// 1 起算的檔案編號選擇，例如 "1,3,5-7"
pub fn parse_selection(selection: &str, count: usize) -> Result<Vec<usize>, String> {
    let mut indices = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = || format!("格式錯誤：'{}'，請使用編號與範圍（例如 1,3,5 或 1-5）", part);
        let out_of_range = || format!("編號必須介於 1-{}", count);
        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start.trim().parse().map_err(|_| invalid())?;
            let end: usize = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            if start < 1 || end > count {
                return Err(out_of_range());
            }
            indices.extend(start..=end);
        } else {
            let index: usize = part.parse().map_err(|_| invalid())?;
            if index < 1 || index > count {
                return Err(out_of_range());
            }
            indices.push(index);
        }
    }
    if indices.is_empty() {
        return Err("未選擇任何檔案".to_string());
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

pub fn is_file_valid(path: &Path, include_set: &RegexSet, exclude_set: &RegexSet) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    include_set.is_match(&file_name) && !exclude_set.is_match(&file_name)
}

/// 檔案服務，展開目錄並套用包含/排除模式
pub struct FileService;

impl FileService {
    pub fn new() -> Self {
        FileService
    }
}

impl Default for FileService {
    fn default() -> Self {
        Self::new()
    }
}

impl FileServiceTrait for FileService {
    fn collect_files(&self, input: FileCollectInput) -> io::Result<FileCollectOutput> {
        let exclude = input.exclude_patterns.clone().unwrap_or_default();
        let (include_set, exclude_set) = create_regex_sets(&input.include_patterns, &exclude);

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for input_path in &input.inputs {
            let candidates = if input_path.is_dir() {
                if input.recursive {
                    discover_input_files_recursive(input_path)?
                } else {
                    discover_input_files(input_path)?
                }
            } else if input_path.is_file() {
                if !is_djvu_file(input_path) {
                    warn!("{} 的副檔名不是 .djvu/.djv，仍嘗試轉換", input_path.display());
                }
                vec![path::absolute(input_path)?]
            } else {
                warn!("輸入路徑不存在，跳過：{}", input_path.display());
                continue;
            };

            for file in candidates {
                if is_file_valid(&file, &include_set, &exclude_set) && seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }

        let total_size = files
            .iter()
            .filter_map(|f| fs::metadata(f).ok())
            .map(|m| m.len())
            .sum();

        Ok(FileCollectOutput { files, total_size })
    }
}
