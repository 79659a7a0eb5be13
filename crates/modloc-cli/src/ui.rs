// User-facing output. Logs go through tracing; these lines are the run summary.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

static USE_COLOR: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn init(use_color: bool, quiet: bool) {
    USE_COLOR.store(use_color, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn icon(kind: Icon) -> String {
    let color = USE_COLOR.load(Ordering::Relaxed);
    match (kind, color) {
        (Icon::Ok, true) => "✔".green().to_string(),
        (Icon::Info, true) => "ℹ".cyan().to_string(),
        (Icon::Warn, true) => "⚠".yellow().to_string(),
        (Icon::Ok, false) => "✔".into(),
        (Icon::Info, false) => "ℹ".into(),
        (Icon::Warn, false) => "⚠".into(),
    }
}

#[derive(Clone, Copy)]
pub enum Icon {
    Ok,
    Info,
    Warn,
}

#[macro_export]
macro_rules! ui_ok {
    ($($arg:tt)*) => {{
        if !$crate::ui::quiet() {
            println!("{} {}", $crate::ui::icon($crate::ui::Icon::Ok), format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! ui_info {
    ($($arg:tt)*) => {{
        if !$crate::ui::quiet() {
            println!("{} {}", $crate::ui::icon($crate::ui::Icon::Info), format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! ui_warn {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::ui::icon($crate::ui::Icon::Warn), format_args!($($arg)*));
    }};
}
