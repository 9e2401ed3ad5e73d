use djvu_to_pdf::action::cli::process_args;
use djvu_to_pdf::error::{DriverError, INTERRUPTED_EXIT_CODE};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match process_args(args) {
        Ok(Some(outcome)) => {
            log::info!("程式執行完成，成功 {}/{} 個檔案", outcome.succeeded, outcome.total);
        }
        Ok(None) => {}
        Err(DriverError::Interrupted) => {
            eprintln!("\n程式已被使用者中斷。");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("錯誤：{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
