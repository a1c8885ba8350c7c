use colored::Colorize;

use migwatch_core::MigrationStat;
use migwatch_monitor::classify::{clamp_percent, classify};
use migwatch_monitor::renderer::format_label;

fn prefix() -> String {
    "[migwatch]".bold().cyan().to_string()
}

/// Print an informational message: [migwatch] message
pub fn info(msg: &str) {
    println!("{} {}", prefix(), msg);
}

/// Print a success message: [migwatch] message (in green)
pub fn success(msg: &str) {
    println!("{} {}", prefix(), msg.green());
}

/// Print a warning message: [migwatch] message (in yellow)
pub fn warn(msg: &str) {
    println!("{} {}", prefix(), msg.yellow());
}

/// One line per target, same labels as the live display, no bars.
pub fn progress_lines(vm_name: &str, stat: &MigrationStat) -> Vec<String> {
    let mut lines: Vec<String> = stat
        .disks
        .iter()
        .map(|(path, info)| progress_line(path, info.percent))
        .collect();
    lines.push(progress_line(vm_name, stat.qemu.percent));
    lines
}

fn progress_line(name: &str, percent: i64) -> String {
    format!(
        "{} {:>3}%",
        format_label(name, classify(percent)),
        clamp_percent(percent)
    )
}

/// Print a running migration's progress once.
pub fn progress_snapshot(vm_name: &str, stat: &MigrationStat) {
    info(&format!(
        "Migration to {} is {}",
        if stat.dst_server.is_empty() { "?" } else { stat.dst_server.as_str() },
        stat.status
    ));
    for line in progress_lines(vm_name, stat) {
        println!("{}", line.dimmed());
    }
}
