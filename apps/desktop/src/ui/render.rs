use std::fmt::Write;

use client_core::{LearnerViewModel, MentorViewModel};

use crate::controller::events::{UiError, UiEvent, ViewModel};

pub const HELP: &str = "\
commands:
  search <text>      find learners by name or username (mentors; empty text clears)
  request <user-id>  send a mentorship request (mentors)
  accept <id>        accept an incoming request (learners)
  reject <id>        reject an incoming request (learners)
  refresh            reload relationships from the server
  show               print the current view
  help               this text
  quit               leave";

pub fn render_view(model: &ViewModel) -> String {
    match model {
        ViewModel::Mentor(model) => render_mentor(model),
        ViewModel::Learner(model) => render_learner(model),
    }
}

pub fn render_error(err: &UiError) -> String {
    let mut out = format!("error: {}", err.message());
    if err.requires_reauth() {
        out.push_str(" (update MENTORSHIP_TOKEN and restart)");
    }
    out
}

pub fn render_event(event: &UiEvent) -> String {
    match event {
        UiEvent::Info(message) => format!("> {message}"),
        UiEvent::ViewUpdated(model) => render_view(model),
        UiEvent::Error(err) => render_error(err),
    }
}

pub fn render_mentor(model: &MentorViewModel) -> String {
    let mut out = String::from("== Manage learners ==\n");
    if model.loading {
        out.push_str("loading...\n");
    }
    if let Some(banner) = &model.error_banner {
        let _ = writeln!(out, "! {banner}");
    }

    if !model.search_text.trim().is_empty() || !model.candidates.is_empty() {
        let _ = write!(out, "\nSearch \"{}\"", model.search_text.trim());
        if model.searching {
            out.push_str(" (searching...)");
        }
        if model.search_results_stale {
            out.push_str(" (results may be out of date)");
        }
        out.push('\n');
        if model.candidates.is_empty() {
            out.push_str("  no matching learners\n");
        }
        for row in &model.candidates {
            let _ = write!(
                out,
                "  [{}] {} (@{})",
                row.user_id, row.display_name, row.username
            );
            if row.request_in_flight {
                out.push_str(" sending...");
            }
            out.push('\n');
        }
    }

    out.push_str("\nPending requests\n");
    if model.pending_outgoing.is_empty() {
        out.push_str("  none\n");
    }
    for row in &model.pending_outgoing {
        let _ = write!(
            out,
            "  #{} {} (@{})",
            row.request_id, row.display_name, row.username
        );
        if let Some(at) = &row.requested_at {
            let _ = write!(out, " sent {at}");
        }
        out.push('\n');
    }

    out.push_str("\nMy learners\n");
    if model.my_learners.is_empty() {
        out.push_str("  none\n");
    }
    for row in &model.my_learners {
        let _ = writeln!(
            out,
            "  {} (@{}) progress: {}",
            row.display_name, row.username, row.progress_link
        );
    }
    out
}

pub fn render_learner(model: &LearnerViewModel) -> String {
    let mut out = String::from("== My mentors ==\n");
    if model.loading {
        out.push_str("loading...\n");
    }
    if let Some(banner) = &model.error_banner {
        let _ = writeln!(out, "! {banner}");
    }

    out.push_str("\nIncoming requests\n");
    if model.incoming.is_empty() {
        out.push_str("  none\n");
    }
    for row in &model.incoming {
        let _ = write!(
            out,
            "  #{} from {} (@{})",
            row.request_id, row.display_name, row.username
        );
        if let Some(at) = &row.requested_at {
            let _ = write!(out, " on {at}");
        }
        if row.actions_enabled {
            let _ = write!(
                out,
                "  [accept {id} | reject {id}]",
                id = row.request_id
            );
        } else {
            out.push_str("  responding...");
        }
        out.push('\n');
    }

    out.push_str("\nMy mentors\n");
    if model.my_mentors.is_empty() {
        out.push_str("  none\n");
    }
    for row in &model.my_mentors {
        let _ = writeln!(
            out,
            "  [{}] {} (@{})",
            row.badge, row.display_name, row.username
        );
    }
    out
}
