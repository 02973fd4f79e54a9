//! Plain-text rendering of session snapshots for the terminal console.
//!
//! Each function takes only the slice of the snapshot its widget needs.

use std::fmt::Write;

use crate::notification::{Notification, NotificationType};
use crate::roster::{RobotRecord, RobotSummary};
use crate::session::{ActivePage, ConnectionState, SessionSnapshot};

/// `[1 ] [2*] [3 ]`: enabled robots are starred.
pub fn enable_bar(robots: &[RobotSummary]) -> String {
    robots
        .iter()
        .map(|r| format!("[{}{}]", r.id, if r.enabled { "*" } else { " " }))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per enabled robot.
pub fn robot_details<'a>(robots: impl IntoIterator<Item = &'a RobotRecord>) -> String {
    let mut out = String::new();
    for r in robots {
        let _ = writeln!(
            out,
            "turtle {:>2}  battery {:>3}%  {:<12} {:<16} {}",
            r.id, r.battery, r.home, r.role, r.team
        );
    }
    if out.is_empty() {
        out.push_str("no turtles enabled\n");
    }
    out
}

pub fn notification_banner(notification: Option<&Notification>, pending: usize) -> Option<String> {
    let n = notification?;
    let tag = match n.notification_type() {
        NotificationType::Error => "ERROR",
        NotificationType::Success => "OK",
        NotificationType::Warning => "WARN",
        NotificationType::Info => "INFO",
    };
    let more = if pending > 1 {
        format!(" (+{} more)", pending - 1)
    } else {
        String::new()
    };
    Some(format!("[{}] {}{}", tag, n.message(), more))
}

pub fn connection_bar(state: ConnectionState) -> String {
    state.label().to_uppercase()
}

/// Full screen for a snapshot.
pub fn screen(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    match snapshot.active_page {
        ActivePage::Settings => {
            let _ = writeln!(out, "{}", enable_bar(&snapshot.roster.project_summary()));
            out.push_str(&robot_details(&snapshot.roster.project_enabled()));
        }
        ActivePage::Refbox => {
            let _ = writeln!(out, "refbox");
        }
    }
    if let Some(banner) =
        notification_banner(snapshot.notification.as_ref(), snapshot.pending_notifications)
    {
        let _ = writeln!(out, "{}", banner);
    }
    let _ = writeln!(
        out,
        "-- {} | page: {} --",
        connection_bar(snapshot.connection),
        snapshot.active_page
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;

    fn robot(id: u32, enabled: bool) -> RobotRecord {
        RobotRecord {
            id,
            enabled,
            battery: 42,
            home: "Yellow home".into(),
            role: "INACTIVE".into(),
            team: "Magenta".into(),
        }
    }

    fn snapshot(page: ActivePage) -> SessionSnapshot {
        SessionSnapshot {
            revision: 3,
            active_page: page,
            connection: ConnectionState::Connecting,
            roster: Roster::new(vec![robot(1, false), robot(2, true)]).unwrap(),
            notification: Some(Notification::error("Pants on fire")),
            pending_notifications: 2,
        }
    }

    #[test]
    fn enable_bar_marks_enabled() {
        let bar = enable_bar(&[
            RobotSummary { id: 1, enabled: false },
            RobotSummary { id: 2, enabled: true },
        ]);
        assert_eq!(bar, "[1 ] [2*]");
    }

    #[test]
    fn details_list_only_given_robots() {
        let r = robot(2, true);
        let text = robot_details([&r]);
        assert!(text.starts_with("turtle  2"));
        assert_eq!(text.lines().count(), 1);
        assert_eq!(robot_details(std::iter::empty()), "no turtles enabled\n");
    }

    #[test]
    fn banner_shows_pending_count() {
        let n = Notification::success("done");
        assert_eq!(notification_banner(Some(&n), 1).unwrap(), "[OK] done");
        assert_eq!(notification_banner(Some(&n), 3).unwrap(), "[OK] done (+2 more)");
        assert!(notification_banner(None, 0).is_none());
    }

    #[test]
    fn settings_screen() {
        let text = screen(&snapshot(ActivePage::Settings));
        assert!(text.contains("[1 ] [2*]"));
        assert!(text.contains("turtle  2"));
        assert!(!text.contains("turtle  1"));
        assert!(text.contains("[ERROR] Pants on fire (+1 more)"));
        assert!(text.contains("-- CONNECTING... | page: settings --"));
    }

    #[test]
    fn refbox_screen_hides_roster() {
        let text = screen(&snapshot(ActivePage::Refbox));
        assert!(!text.contains("[2*]"));
        assert!(text.contains("page: refbox"));
    }
}
