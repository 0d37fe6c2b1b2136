//! Plain-text rendering of API models for the terminal.

use groupsave_core::models::{CurrentUser, Group, Transaction};
use groupsave_core::utils::{
    format_currency, format_date, format_optional, format_progress, truncate_string,
};
use groupsave_core::Notification;

/// Width of the name column in group listings
const NAME_WIDTH: usize = 24;

/// Width of the description column in transaction listings
const DESCRIPTION_WIDTH: usize = 30;

pub(crate) fn user_summary(user: &CurrentUser) -> String {
    let mut lines = vec![format!("Signed in as {}", user.display_name())];
    if let Some(ref created) = user.created_at {
        lines.push(format!("Member since {}", format_date(created)));
    }
    if let Some(total) = user.extra_f64("total_contributions") {
        lines.push(format!("Total contributions: {}", format_currency(total)));
    }
    lines.join("\n")
}

pub(crate) fn group_row(group: &Group) -> String {
    format!(
        "{:>5}  {:<width$}  {:>16} / {:<16} {:>4}",
        group.id,
        truncate_string(&group.name, NAME_WIDTH),
        format_currency(group.current_amount),
        format_currency(group.target_amount),
        format_progress(group.progress),
        width = NAME_WIDTH,
    )
}

pub(crate) fn group_detail(group: &Group) -> String {
    let mut lines = vec![
        format!("{} (#{})", group.name, group.id),
        format_optional(&group.description, "No description"),
        format!(
            "Saved {} of {} ({})",
            format_currency(group.current_amount),
            format_currency(group.target_amount),
            format_progress(group.progress)
        ),
    ];
    if group.is_funded() {
        lines.push("Target reached".to_string());
    } else {
        lines.push(format!("Remaining {}", format_currency(group.remaining())));
    }
    if let Some(ref created) = group.created_at {
        lines.push(format!("Created {}", format_date(created)));
    }
    lines.join("\n")
}

pub(crate) fn transaction_row(tx: &Transaction) -> String {
    let when = tx
        .created_at
        .as_deref()
        .map(format_date)
        .unwrap_or_default();
    format!(
        "{:>5}  {:<18}  {:<10} {:<8}  {:>16}  {:<12}  {}",
        tx.id,
        when,
        tx.kind.to_string(),
        tx.status.to_string(),
        format_currency(tx.signed_amount()),
        format_optional(&tx.username, "-"),
        truncate_string(tx.description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
    )
}

pub(crate) fn notification_line(notification: &Notification) -> String {
    format!("[{}] {}", notification.title, notification.message)
}
