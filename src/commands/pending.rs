//! Pending command handler: list unfinished downloads and queues.

use anyhow::Result;
use dlqueue_core::recovery::{RecoveryEntry, RecoveryStore};

pub fn run_pending_command(store: &RecoveryStore) -> Result<()> {
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No unfinished downloads.");
        return Ok(());
    }

    println!("{} unfinished:", entries.len());
    for entry in &entries {
        println!("{}", render_entry(entry));
    }
    println!();
    println!("Resume one with: dlqueue resume <key>");
    Ok(())
}

fn render_entry(entry: &RecoveryEntry) -> String {
    let kind = if entry.is_queue() {
        let detail = entry
            .desc
            .clone()
            .unwrap_or_else(|| format!("{} items", entry.urls.len()));
        format!("queue, {detail}")
    } else {
        "single".to_string()
    };
    format!(
        "  {key}\n    {title} ({kind}, format {format}, saved {at})",
        key = entry.key(),
        title = entry.title,
        format = entry.format_id,
        at = entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use dlqueue_core::recovery::{RecoveryUpdate, queue_update};

    use super::*;

    #[test]
    fn test_render_single_entry() {
        let mut entry = RecoveryEntry::single("https://youtu.be/a", "best", "Talk");
        entry.timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            render_entry(&entry),
            "  https://youtu.be/a\n    Talk (single, format best, saved 2026-03-01 09:30 UTC)"
        );
    }

    #[test]
    fn test_render_queue_entry_uses_description() {
        let update = queue_update(
            "Talks",
            "best",
            2,
            vec!["https://youtu.be/a".into(), "https://youtu.be/b".into()],
            Vec::new(),
        );
        let Some(RecoveryUpdate::Upsert(entry)) = update else {
            panic!("expected upsert");
        };
        let rendered = render_entry(&entry);
        assert!(rendered.starts_with("  queue:Talks\n    Talks (queue, 2 items left"));
    }

    #[test]
    fn test_run_pending_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecoveryStore::new(dir.path().join("recovery.json"));
        run_pending_command(&store).unwrap();
    }
}
