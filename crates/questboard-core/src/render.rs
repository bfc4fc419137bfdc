//! Plain-text rendering for terminal output and notifications.

use std::fmt::Write;

use crate::lifecycle::ExpiringEvent;
use crate::streak::DoneOutcome;
use crate::view::{EventChecklist, GameChecklist, GameOverview, GameProgress};

const CHECKED: &str = "✅";
const UNCHECKED: &str = "☐";

fn mark(checked: bool) -> &'static str {
    if checked {
        CHECKED
    } else {
        UNCHECKED
    }
}

/// `D-3`, or `D-Day` on the last day.
pub fn d_day(days_remaining: i64) -> String {
    if days_remaining <= 0 {
        "D-Day".to_string()
    } else {
        format!("D-{days_remaining}")
    }
}

pub fn checklist(lists: &[GameChecklist]) -> String {
    if lists.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut out = String::new();
    for list in lists {
        let _ = writeln!(out, "🎮 {}", list.game);
        for task in &list.tasks {
            let _ = writeln!(out, "  {} {}", mark(task.checked), task.task);
        }
    }
    out
}

pub fn events(lists: &[EventChecklist]) -> String {
    if lists.is_empty() {
        return "No running events.\n".to_string();
    }
    let mut out = String::new();
    for event in lists {
        let _ = writeln!(
            out,
            "🎉 {} - {} (until {}, {})",
            event.game,
            event.event,
            event.until,
            d_day(event.days_remaining)
        );
        for task in &event.tasks {
            let _ = writeln!(out, "  {} {} [{}]", mark(task.checked), task.task, task.kind);
        }
    }
    out
}

pub fn progress(rows: &[GameProgress]) -> String {
    let mut out = String::from("📊 Today's progress\n");
    for row in rows {
        let done = if row.is_complete() { " ✅" } else { "" };
        let _ = writeln!(out, "🎮 {}: {} / {}{done}", row.game, row.completed, row.total);
    }
    out
}

pub fn catalog(games: &[GameOverview]) -> String {
    if games.is_empty() {
        return "Catalog is empty.\n".to_string();
    }
    let mut out = String::new();
    for game in games {
        let _ = writeln!(out, "- {}", game.game);
        if !game.daily.is_empty() {
            let _ = writeln!(out, "    daily: {}", game.daily.join(", "));
        }
        if !game.weekly.is_empty() {
            let _ = writeln!(out, "    weekly: {}", game.weekly.join(", "));
        }
        for event in &game.events {
            let tasks: Vec<String> = event
                .tasks
                .iter()
                .map(|(name, kind)| format!("{name} ({kind})"))
                .collect();
            let _ = writeln!(
                out,
                "    event {} until {} [{}]: {}",
                event.name,
                event.until,
                d_day(event.days_remaining),
                tasks.join(", ")
            );
        }
    }
    out
}

pub fn done(outcome: &DoneOutcome) -> String {
    match outcome {
        DoneOutcome::Completed { streak } => {
            format!("🎉 All daily tasks done!\n🔥 Day {streak} cleared!\n")
        }
        DoneOutcome::Incomplete { remaining } => {
            let mut out = String::from(
                "🧐 Some daily tasks are still open. The day count only goes up once all are done.\n",
            );
            for (game, task) in remaining {
                let _ = writeln!(out, "  {UNCHECKED} {game}: {task}");
            }
            out
        }
    }
}

/// Morning message with the user's daily checklist.
pub fn daily_notification(lists: &[GameChecklist]) -> String {
    format!("☀️ A new day! Here is today's checklist:\n\n{}", checklist(lists))
}

pub fn expiring_notification(events: &[ExpiringEvent]) -> String {
    let mut out = String::from("⏰ Events ending soon:\n");
    for event in events {
        let _ = writeln!(
            out,
            "  {} - {} (until {}, {})",
            event.game,
            event.event,
            event.until,
            d_day(event.days_remaining)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use crate::view::TaskStatus;

    #[test]
    fn checklist_marks_tasks() {
        let lists = vec![GameChecklist {
            game: "Foo".into(),
            period: Period::Daily,
            tasks: vec![
                TaskStatus { task: "Login".into(), checked: true },
                TaskStatus { task: "Dungeon".into(), checked: false },
            ],
        }];
        assert_eq!(checklist(&lists), "🎮 Foo\n  ✅ Login\n  ☐ Dungeon\n");
        assert!(daily_notification(&lists).ends_with("☐ Dungeon\n"));
    }

    #[test]
    fn progress_flags_finished_games() {
        let rows = vec![
            GameProgress { game: "Foo".into(), completed: 2, total: 2 },
            GameProgress { game: "Bar".into(), completed: 0, total: 1 },
        ];
        let text = progress(&rows);
        assert!(text.contains("🎮 Foo: 2 / 2 ✅\n"));
        assert!(text.contains("🎮 Bar: 0 / 1\n"));
    }

    #[test]
    fn d_day_counts_down() {
        assert_eq!(d_day(3), "D-3");
        assert_eq!(d_day(0), "D-Day");
    }

    #[test]
    fn done_lists_remaining_tasks() {
        let text = done(&DoneOutcome::Incomplete {
            remaining: vec![("Foo".into(), "Dungeon".into())],
        });
        assert!(text.contains("☐ Foo: Dungeon"));
        assert!(done(&DoneOutcome::Completed { streak: 2 }).contains("Day 2"));
    }
}
