use indicatif::{ProgressBar, ProgressStyle};
use regex::RegexSet;
use std::time::Instant;

use crate::models::conversion::ConversionResult;

pub fn setup_logging(log_level: &str) {
    let log_level_filter = match log_level {
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    // 互動模式可能重複進入，只有第一次設定生效
    let _ = env_logger::Builder::new()
        .filter_level(log_level_filter)
        .try_init();
}

pub struct ProgressManager {
    pb: ProgressBar,
    no_progress: bool,
    start: Instant,
}

impl ProgressManager {
    pub fn new(total: u64, no_progress: bool) -> Self {
        let pb = if no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len} ETA: {eta_precise}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-");
            pb.set_style(style);
            pb
        };
        ProgressManager {
            pb,
            no_progress,
            start: Instant::now(),
        }
    }

    pub fn update(&self, completed: u64, result: &ConversionResult) {
        if self.no_progress {
            return;
        }
        let status = if result.succeeded { "完成" } else { "失敗" };
        self.pb.set_message(format!("{}：{}", status, result.file_name()));
        self.pb.set_position(completed);
    }

    pub fn finish(&self, succeeded: usize, total: usize) {
        if self.no_progress {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        self.pb.finish_with_message(format!(
            "完成 {}/{} 個檔案，耗時 {:.1} 秒",
            succeeded, total, elapsed
        ));
    }

    pub fn abandon(&self) {
        if !self.no_progress {
            self.pb.abandon_with_message("已取消");
        }
    }
}

pub fn create_progress_bar(total: u64, no_progress: bool) -> ProgressManager {
    ProgressManager::new(total, no_progress)
}

pub fn format_file_size(size: u64) -> String {
    if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}

/// 取字串最後 max_chars 個字元，不會切斷 UTF-8 字元
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// 將 `*` 萬用字元模式轉成比對檔名的 RegexSet（不分大小寫）
pub fn create_regex_sets(include: &[String], exclude: &[String]) -> (RegexSet, RegexSet) {
    let to_regex = |p: &String| format!("(?i)^{}$", regex::escape(p).replace("\\*", ".*"));
    let include_patterns: Vec<_> = include.iter().map(to_regex).collect();
    let exclude_patterns: Vec<_> = exclude.iter().map(to_regex).collect();

    let include_set = RegexSet::new(&include_patterns)
        .unwrap_or_else(|e| {
            log::warn!("無效的包含模式: {}，改為接受所有檔案", e);
            RegexSet::new([".*"]).unwrap_or_else(|_| RegexSet::empty())
        });

    let exclude_set = RegexSet::new(&exclude_patterns)
        .unwrap_or_else(|e| {
            log::warn!("無效的排除模式: {}，使用空集作為回退", e);
            RegexSet::empty()
        });

    (include_set, exclude_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail_chars("abc", 5), "abc");
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("錯誤訊息", 2), "訊息");
    }

    #[test]
    fn file_size_units() {
        assert_eq!(format_file_size(512), "0.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn wildcard_patterns_match_whole_file_name() {
        let (include, exclude) = create_regex_sets(
            &["vol*.djvu".to_string()],
            &["*draft*".to_string()],
        );
        assert!(include.is_match("Vol1.DJVU"));
        assert!(!include.is_match("book-vol1.djvu"));
        assert!(exclude.is_match("vol2-draft.djvu"));
        assert!(!exclude.is_match("vol2.djvu"));
    }

    #[test]
    fn empty_include_list_matches_nothing() {
        let (include, _) = create_regex_sets(&[], &[]);
        assert!(!include.is_match("a.djvu"));
    }
}
