//! Notification inbox commands

use anyhow::Result;

use super::{truncate, Services};

pub fn cmd_notifications_list(services: &Services, owner: i64, unread_only: bool) -> Result<()> {
    let notifications = services.db.list_notifications(owner, unread_only)?;

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    let unread = services.db.count_unread_notifications(owner)?;

    println!();
    println!("🔔 Notifications ({} unread)", unread);
    println!("   ─────────────────────────────────────────────────────────────");

    for n in notifications {
        let marker = if n.is_read { " " } else { "•" };
        println!(
            "   {} [{}] {} │ {:<6} │ {}: {}",
            marker,
            n.id,
            n.created_at.format("%Y-%m-%d %H:%M"),
            n.priority,
            n.title,
            truncate(&n.message, 60)
        );
    }

    Ok(())
}

pub fn cmd_notifications_read(services: &Services, id: i64) -> Result<()> {
    services.db.mark_notification_read(id)?;
    println!("✅ Marked notification {} as read", id);
    Ok(())
}
