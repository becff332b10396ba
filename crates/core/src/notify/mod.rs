//! Submission stage notifications.
//!
//! Supports Slack webhook and SMTP email channels. The [`Notifier`] facade
//! dispatches to every configured channel and reports the combined outcome;
//! the orchestrator logs failures and moves on, delivery is always
//! best-effort.

pub mod email;
pub mod slack;

use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::models::Submission;

/// Which lifecycle point a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Combined delivery result across channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// At least one channel accepted the message.
    Delivered,
    /// No channel configured or no recipients for this submission.
    Skipped,
    /// Every attempted channel failed.
    Failed(String),
}

/// Unified notifier dispatching to all configured channels.
pub struct Notifier {
    slack: Option<slack::SlackNotifier>,
    email: Option<email::EmailNotifier>,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Self {
        let slack = config.slack_webhook_url.as_ref().map(|url| {
            info!("Slack notifications enabled");
            slack::SlackNotifier::new(url.clone())
        });

        let email = match (&config.email_smtp, &config.email_from) {
            (Some(smtp), Some(from)) => {
                info!("email notifications enabled");
                Some(email::EmailNotifier::new(smtp.clone(), from.clone()))
            }
            _ => None,
        };

        Self { slack, email }
    }

    /// Announce a submission lifecycle stage on every configured channel.
    ///
    /// Never returns an error; the outcome is informational and the caller
    /// decides whether to log it.
    pub async fn notify_stage(&self, submission: &Submission, stage: Stage) -> NotifyOutcome {
        let email_wanted = self.email.is_some() && !submission.notification_emails.is_empty();
        if self.slack.is_none() && !email_wanted {
            return NotifyOutcome::Skipped;
        }

        info!(
            submission_id = %submission.id,
            stage = %stage,
            "sending stage notification"
        );

        let mut attempted = 0usize;
        let mut errors = Vec::new();

        if let Some(ref slack) = self.slack {
            attempted += 1;
            let message = format_stage_slack(submission, stage);
            if let Err(e) = slack.send_message(&message).await {
                warn!(error = %e, "Slack notification failed");
                errors.push(format!("Slack: {}", e));
            }
        }

        if let Some(ref email) = self.email {
            if email_wanted {
                attempted += 1;
                let subject = format!(
                    "[PatchGate] Submission {}: {}",
                    &submission.id[..8.min(submission.id.len())],
                    stage
                );
                let body = format_stage_email_html(submission, stage);
                if let Err(e) = email
                    .send(&submission.notification_emails, &subject, &body)
                    .await
                {
                    warn!(error = %e, "email notification failed");
                    errors.push(format!("Email: {}", e));
                }
            }
        }

        if errors.len() >= attempted {
            NotifyOutcome::Failed(errors.join("; "))
        } else {
            NotifyOutcome::Delivered
        }
    }

    pub fn is_configured(&self) -> bool {
        self.slack.is_some() || self.email.is_some()
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn stage_emoji(stage: Stage) -> &'static str {
    match stage {
        Stage::Processing => ":hourglass_flowing_sand:",
        Stage::Completed => ":white_check_mark:",
        Stage::Failed => ":x:",
    }
}

/// Format a stage notification for Slack (Markdown).
fn format_stage_slack(submission: &Submission, stage: Stage) -> String {
    let mut msg = format!(
        "{} *Patch submission {}*\n\
         *Subject:* {}\n\
         *Project:* {}\n\
         *Branch:* {}",
        stage_emoji(stage),
        stage,
        submission.subject,
        submission.project,
        submission.branch,
    );

    if let Some(ref url) = submission.change_url {
        msg.push_str(&format!("\n*Change:* {}", url));
    }
    if stage == Stage::Failed {
        if let Some(ref error) = submission.error {
            msg.push_str(&format!("\n```{}```", error));
        }
    }
    msg
}

/// Format a stage notification as an HTML email.
fn format_stage_email_html(submission: &Submission, stage: Stage) -> String {
    let color = match stage {
        Stage::Processing => "#d4a017",
        Stage::Completed => "#2e7d32",
        Stage::Failed => "#c62828",
    };
    let mut html = format!(
        "<html><body>\
        <h2 style=\"color: {};\">Patch submission {}</h2>\
        <table style=\"border-collapse: collapse;\">\
        <tr><td style=\"padding: 4px 12px; font-weight: bold;\">Subject</td>\
            <td style=\"padding: 4px 12px;\">{}</td></tr>\
        <tr><td style=\"padding: 4px 12px; font-weight: bold;\">Project</td>\
            <td style=\"padding: 4px 12px;\">{}</td></tr>\
        <tr><td style=\"padding: 4px 12px; font-weight: bold;\">Branch</td>\
            <td style=\"padding: 4px 12px;\">{}</td></tr>",
        color,
        stage,
        html_escape(&submission.subject),
        html_escape(&submission.project),
        html_escape(&submission.branch),
    );

    if let Some(ref url) = submission.change_url {
        html.push_str(&format!(
            "<tr><td style=\"padding: 4px 12px; font-weight: bold;\">Change</td>\
             <td style=\"padding: 4px 12px;\"><a href=\"{url}\">{url}</a></td></tr>",
            url = html_escape(url)
        ));
    }
    html.push_str("</table>");

    if stage == Stage::Failed {
        if let Some(ref error) = submission.error {
            html.push_str(&format!("<pre>{}</pre>", html_escape(error)));
        }
    }
    html.push_str("</body></html>");
    html
}

/// Minimal HTML escaping for user-provided strings.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::SubmissionStatus;

    fn submission() -> Submission {
        Submission {
            id: "a1b2c3d4-0000-0000-0000-000000000000".into(),
            upload_id: "u1".into(),
            project: "tools/widget".into(),
            subject: "Fix <overflow> in parser".into(),
            description: "details".into(),
            branch: "main".into(),
            status: SubmissionStatus::Failed,
            change_id: None,
            change_url: Some("https://review.example.com/c/tools/widget/+/7".into()),
            error: Some("Gerrit push timed out after 180s".into()),
            notification_emails: vec!["dev@example.com".into()],
            remote_node_id: None,
            git_repository: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_skips() {
        let notifier = Notifier::new(&NotificationConfig::default());
        assert!(!notifier.is_configured());
        let outcome = notifier
            .notify_stage(&submission(), Stage::Processing)
            .await;
        assert_eq!(outcome, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_all_channels_failing_reports_failure() {
        // Closed local port: the webhook connection is refused immediately.
        let config = NotificationConfig {
            slack_webhook_url: Some("http://127.0.0.1:9/hooks/dead".into()),
            ..Default::default()
        };
        let notifier = Notifier::new(&config);
        let outcome = notifier.notify_stage(&submission(), Stage::Failed).await;
        assert!(matches!(outcome, NotifyOutcome::Failed(_)));
    }

    #[test]
    fn test_format_stage_slack_includes_error_on_failure() {
        let msg = format_stage_slack(&submission(), Stage::Failed);
        assert!(msg.contains(":x:"));
        assert!(msg.contains("Fix <overflow> in parser"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_format_stage_email_escapes_html() {
        let html = format_stage_email_html(&submission(), Stage::Completed);
        assert!(html.contains("Fix &lt;overflow&gt; in parser"));
        assert!(html.contains("review.example.com"));
        // Completed mail does not carry the error block.
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }
}
