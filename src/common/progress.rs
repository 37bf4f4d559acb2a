use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::{self, OutputFormat, Status};

pub fn create_spinner(message: String) -> ProgressBar {
    // No spinner when the output is machine-read
    if ui::get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style.tick_chars("⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋ "));
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Clear the spinner and print the step with its final status.
pub fn finish_spinner(pb: ProgressBar, code: &str, message: &str, status: Status) {
    pb.finish_and_clear();
    ui::status_line(code, message, status);
}
