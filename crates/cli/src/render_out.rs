//! Terminal rendering of diffs, commands, and approval prompts

use agentdeck_protocol::{PendingApproval, RiskLevel, SessionStatus};
use agentdeck_render::{
    command_hint, gutter_width, highlight_command, parse_unified_diff, CommandToken, DiffLine,
    DiffLineKind,
};
use console::style;

/// Print a unified diff with a two-column line-number gutter.
pub fn print_diff(diff: &str) {
    let lines = parse_unified_diff(diff);
    let width = gutter_width(&lines);
    for line in &lines {
        println!("{}", styled_diff_line(line, width));
    }
}

fn styled_diff_line(line: &DiffLine, width: usize) -> String {
    let gutter = |n: Option<u32>| match n {
        Some(n) => format!("{n:>width$}"),
        None => " ".repeat(width),
    };
    let gutters = format!(
        "{} {}",
        style(gutter(line.old_line)).dim(),
        style(gutter(line.new_line)).dim()
    );

    match line.kind {
        DiffLineKind::Add => format!("{gutters} {}", style(format!("+{}", line.text)).green()),
        DiffLineKind::Delete => format!("{gutters} {}", style(format!("-{}", line.text)).red()),
        DiffLineKind::HunkHeader => format!("{gutters} {}", style(&line.text).cyan()),
        DiffLineKind::FileHeader => format!("{gutters} {}", style(&line.text).bold()),
        DiffLineKind::OmittedMarker => format!("{gutters} {}", style(&line.text).dim().italic()),
        DiffLineKind::Context => format!("{gutters}  {}", line.text),
    }
}

/// Print a shell command with per-token styling and, when the command is
/// notable, a one-line hint under it.
pub fn print_command(command: &str) {
    let rendered: String = highlight_command(command)
        .iter()
        .map(|token| match token {
            CommandToken::Command(name) => style(name).bold().cyan().to_string(),
            CommandToken::Argument(args) => args.clone(),
            CommandToken::Separator(sep) => style(sep).yellow().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {rendered}");

    if let Some(hint) = command_hint(command) {
        println!("  {}", style(format!("note: {hint}")).yellow());
    }
}

/// Print the pending-approval panel for one tool invocation.
pub fn print_approval(approval: &PendingApproval) {
    let risk = match approval.risk_level {
        Some(RiskLevel::High) => style("HIGH RISK").red().bold().to_string(),
        Some(RiskLevel::Medium) => style("medium risk").yellow().to_string(),
        Some(RiskLevel::Low) | None => style("low risk").dim().to_string(),
    };
    println!(
        "{} {} [{}] ({})",
        style("approval required:").bold(),
        approval.tool_name,
        approval.tool_use_id,
        risk
    );

    if let Some(path) = &approval.file_path {
        println!("  file: {path}");
    }
    if let Some(command) = approval
        .tool_input
        .get("command")
        .and_then(|value| value.as_str())
    {
        print_command(command);
    }
    if let Some(stats) = &approval.diff_stats {
        println!(
            "  {} {}",
            style(format!("+{}", stats.additions)).green(),
            style(format!("-{}", stats.deletions)).red()
        );
    }
    if let Some(diff) = &approval.diff {
        print_diff(diff);
    }
}

pub fn status_label(status: SessionStatus) -> String {
    match status {
        SessionStatus::Idle => style("idle").dim().to_string(),
        SessionStatus::Running => style("running").cyan().to_string(),
        SessionStatus::WaitingApproval => style("waiting approval").yellow().bold().to_string(),
        SessionStatus::Completed => style("completed").green().to_string(),
        SessionStatus::Error => style("error").red().bold().to_string(),
    }
}
