//! Spinner output for long waits
//!
//! Wraps the core's [`ProgressEvent`] stream in an `indicatif` spinner on
//! stderr. The spinner hides itself when stderr is not a terminal.

use cvoctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with an initial message
pub fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message);
    pb
}

/// Progress callback that drives `pb`
pub fn spinner_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Box::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Started { subject } => {
            pb.set_message(format!("{} started", subject));
        }
        ProgressEvent::Polling {
            subject,
            status,
            attempt,
            ..
        } => {
            pb.set_message(format!("{}: {} (check {})", subject, status, attempt));
        }
        ProgressEvent::Completed { subject } => {
            pb.finish_with_message(format!("{}: \u{2713} done", subject));
        }
        ProgressEvent::Failed { subject, error } => {
            pb.abandon_with_message(format!("{}: \u{2717} {}", subject, error));
        }
    })
}

/// Clear a spinner that no terminal event reached (e.g. resolution failed)
pub fn settle(pb: &ProgressBar) {
    if !pb.is_finished() {
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events_finish_the_spinner() {
        let pb = ProgressBar::hidden();
        let callback = spinner_callback(&pb);

        callback(ProgressEvent::Started {
            subject: "task-1".to_string(),
        });
        assert!(!pb.is_finished());
        assert_eq!(pb.message(), "task-1 started");

        callback(ProgressEvent::Polling {
            subject: "task-1".to_string(),
            status: "PENDING".to_string(),
            attempt: 2,
            elapsed: Duration::from_secs(4),
        });
        assert_eq!(pb.message(), "task-1: PENDING (check 2)");

        callback(ProgressEvent::Completed {
            subject: "task-1".to_string(),
        });
        assert!(pb.is_finished());
    }

    #[test]
    fn failure_keeps_the_error_visible() {
        let pb = ProgressBar::hidden();
        let callback = spinner_callback(&pb);

        callback(ProgressEvent::Failed {
            subject: "upgrade".to_string(),
            error: "image not found".to_string(),
        });
        assert!(pb.is_finished());
        assert!(pb.message().contains("image not found"));
    }
}
