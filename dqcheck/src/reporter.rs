//! HTML report rendering and email dispatch.
//!
//! The report groups issues by producing check (first-seen order), renders
//! structured payloads as bullet lists, tables, and summary counters, and
//! hands the result to a [`Mailer`]. Scalar lists and tables are truncated
//! at configured limits with a notice; summaries always render in full.
//!
//! Every piece of free text is HTML-escaped before embedding, including
//! check output that originates from database values.

use chrono::Local;

use crate::config::AppConfig;
use crate::mailer::{GraphMailer, Mailer};
use crate::types::{ExtraData, IssueCollection, Record};

const REPORT_CSS: &str = r#"body { font-family: Arial, sans-serif; }
h1 { color: #000000; }
h2 { color: #1976d2; margin-top: 20px; }
.issue {
    background-color: #fff3cd;
    border-left: 4px solid #ffc107;
    padding: 10px;
    margin: 10px 0;
}
.severity-high { border-left-color: #d32f2f; background-color: #ffebee; }
.severity-medium { border-left-color: #ff9800; background-color: #fff3e0; }
.severity-low { border-left-color: #4caf50; background-color: #e8f5e9; }
.details { margin-top: 5px; color: #333; font-size: 0.9em; }
.extra-data { margin-top: 10px; padding: 10px; background-color: #f5f5f5; border-radius: 4px; }
.extra-data-section { margin-top: 10px; }
.extra-data-title { font-weight: bold; color: #1976d2; margin-bottom: 5px; }
.extra-data-list { margin: 5px 0; padding-left: 20px; }
.extra-data-list li { margin: 3px 0; }
.extra-data-table { width: 100%; border-collapse: collapse; margin: 10px 0; font-size: 0.9em; }
.extra-data-table th { background-color: #1976d2; color: white; padding: 8px; text-align: left; }
.extra-data-table td { padding: 6px 8px; border-bottom: 1px solid #ddd; }
.extra-data-table tr:nth-child(even) { background-color: #f9f9f9; }
.truncation-notice { margin-top: 5px; font-style: italic; color: #666; font-size: 0.85em; }
.execution-info { color: #999; font-size: 0.85em; font-style: italic; margin-top: 5px; }
"#;

const REPORT_FOOTER: &str = "<hr style=\"margin-top: 30px; border: none; border-top: 1px solid #ddd;\">\n<p style=\"color: #666; font-size: 0.9em; margin-top: 20px;\">Automated data quality monitor</p>\n</body>\n</html>\n";

/// Renders an [`IssueCollection`] into an HTML mail and delivers it.
pub struct EmailReporter<'a> {
    config: &'a AppConfig,
    mailer: Box<dyn Mailer>,
}

impl<'a> EmailReporter<'a> {
    /// Reporter backed by the Graph transport configured in `config`.
    #[must_use]
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            mailer: Box::new(GraphMailer::new(config.email.clone())),
        }
    }

    /// Reporter with a caller-supplied transport.
    #[must_use]
    pub fn with_mailer(config: &'a AppConfig, mailer: Box<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    /// Render the full HTML report body. Empty collections render to an
    /// empty string.
    #[must_use]
    pub fn format_issues(&self, issues: &IssueCollection, execution_info: Option<&str>) -> String {
        if issues.is_empty() {
            return String::new();
        }

        let mut html = String::new();
        html.push_str("<html>\n<head>\n<style>\n");
        html.push_str(REPORT_CSS);
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str("<h1>Data Quality Alert Report</h1>\n");
        html.push_str(&format!(
            "<p><strong>Date:</strong> {}</p>\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        html.push_str(&format!(
            "<p><strong>Total Issues Found:</strong> {}</p>\n",
            issues.len()
        ));
        if let Some(info) = execution_info {
            html.push_str(&format!(
                "<p class=\"execution-info\">Execution mode: {}</p>\n",
                escape_html(info)
            ));
        }

        for (check_name, check_issues) in issues.group_by_check() {
            html.push_str(&format!(
                "<h2>{}</h2>\n",
                escape_html(&humanize_check_name(check_name))
            ));
            for issue in check_issues {
                html.push_str(&format!(
                    "<div class=\"issue severity-{}\">\n<strong>[{}]</strong> {}\n",
                    issue.severity(),
                    issue.severity().to_string().to_uppercase(),
                    escape_html(issue.message())
                ));
                if let Some(details) = issue.details() {
                    html.push_str(&format!(
                        "<div class=\"details\">{}</div>\n",
                        escape_html(details)
                    ));
                }
                if let Some(extra) = issue.extra_data() {
                    html.push_str(&self.format_extra_data(extra));
                }
                html.push_str("</div>\n");
            }
        }

        html.push_str(REPORT_FOOTER);
        html
    }

    /// Render the plain-text form, logged when delivery fails so the report
    /// content is not lost.
    #[must_use]
    pub fn format_issues_text(&self, issues: &IssueCollection) -> String {
        if issues.is_empty() {
            return String::new();
        }

        let mut text = String::from("Data Quality Alert Report\n");
        text.push_str(&format!(
            "Date: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        text.push_str(&format!("Total Issues Found: {}\n\n", issues.len()));

        for (check_name, check_issues) in issues.group_by_check() {
            text.push_str(&format!("{check_name}:\n"));
            text.push_str(&"-".repeat(check_name.len()));
            text.push('\n');
            for issue in check_issues {
                text.push_str(&format!(
                    "  [{}] {}\n",
                    issue.severity().to_string().to_uppercase(),
                    issue.message()
                ));
                if let Some(details) = issue.details() {
                    text.push_str(&format!("    Details: {details}\n"));
                }
                text.push('\n');
            }
        }

        text
    }

    /// Format and deliver the report. Returns whether delivery succeeded;
    /// transport failures are logged, never propagated.
    pub fn send(&self, issues: &IssueCollection, execution_info: Option<&str>) -> bool {
        if issues.is_empty() {
            return false;
        }

        let subject = format!("Data Quality Alert - {} Issue(s) Found", issues.len());
        let html_body = self.format_issues(issues, execution_info);

        match self
            .mailer
            .send(&subject, &html_body, &self.config.email.recipients)
        {
            Ok(()) => true,
            Err(error) => {
                log::error!("Error sending email: {error}");
                log::info!("Undelivered report:\n{}", self.format_issues_text(issues));
                false
            }
        }
    }

    fn format_extra_data(&self, extra: &ExtraData) -> String {
        let mut html = String::from("<div class=\"extra-data\">");
        if !extra.entity_ids.is_empty() {
            html.push_str(&format_list(
                &extra.entity_ids,
                "Entity IDs",
                self.config.report.max_list_items,
            ));
        }
        if !extra.invalid_values.is_empty() {
            html.push_str(&format_list(
                &extra.invalid_values,
                "Invalid Values",
                self.config.report.max_list_items,
            ));
        }
        if !extra.records.is_empty() {
            html.push_str(&format_table(
                &extra.records,
                self.config.report.max_table_rows,
            ));
        }
        if !extra.summary.is_empty() {
            html.push_str(&format_summary(&extra.summary));
        }
        html.push_str("</div>");
        html
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

/// Render a titled bullet list, truncated at `max_items` with a notice.
fn format_list(items: &[String], title: &str, max_items: usize) -> String {
    let mut html = String::from("<div class=\"extra-data-section\">");
    html.push_str(&format!(
        "<div class=\"extra-data-title\">{}:</div>",
        escape_html(title)
    ));
    html.push_str("<ul class=\"extra-data-list\">");
    for item in items.iter().take(max_items) {
        html.push_str(&format!("<li>{}</li>", escape_html(item)));
    }
    html.push_str("</ul>");
    if items.len() > max_items {
        html.push_str(&format!(
            "<div class=\"truncation-notice\">Showing first {} of {} items</div>",
            max_items,
            items.len()
        ));
    }
    html.push_str("</div>");
    html
}

/// Render records as a table, columns taken from the first record,
/// truncated at `max_rows` with a notice.
fn format_table(records: &[Record], max_rows: usize) -> String {
    if records.is_empty() {
        return String::new();
    }
    let headers: Vec<&str> = records[0].columns().collect();

    let mut html = String::from("<div class=\"extra-data-section\">");
    html.push_str("<div class=\"extra-data-title\">Detailed Records:</div>");
    html.push_str("<table class=\"extra-data-table\">");
    html.push_str("<thead><tr>");
    for header in &headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>");
    html.push_str("<tbody>");
    for record in records.iter().take(max_rows) {
        html.push_str("<tr>");
        for header in &headers {
            html.push_str(&format!(
                "<td>{}</td>",
                escape_html(record.get(header).unwrap_or(""))
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    if records.len() > max_rows {
        html.push_str(&format!(
            "<div class=\"truncation-notice\">Showing first {} of {} records</div>",
            max_rows,
            records.len()
        ));
    }
    html.push_str("</div>");
    html
}

/// Render summary counters. Never truncated.
fn format_summary(pairs: &[(String, String)]) -> String {
    let mut html = String::from("<div class=\"extra-data-section\">");
    html.push_str("<div class=\"extra-data-title\">Summary:</div>");
    html.push_str("<ul class=\"extra-data-list\">");
    for (key, value) in pairs {
        html.push_str(&format!(
            "<li><strong>{}:</strong> {}</li>",
            escape_html(key),
            escape_html(value)
        ));
    }
    html.push_str("</ul></div>");
    html
}

/// Insert a space before each interior capital letter, so
/// `CityValidationMag` renders as `City Validation Mag`.
#[must_use]
pub fn humanize_check_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i > 0 && ch.is_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Escape HTML special characters.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::mailer::DeliveryError;
    use crate::types::{Issue, Severity};

    use super::*;

    type SentMail = (String, String, Vec<String>);

    struct RecordingMailer {
        sent: Arc<Mutex<Vec<SentMail>>>,
    }

    impl Mailer for RecordingMailer {
        fn send(
            &self,
            subject: &str,
            html_body: &str,
            recipients: &[String],
        ) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push((
                subject.to_owned(),
                html_body.to_owned(),
                recipients.to_vec(),
            ));
            Ok(())
        }
    }

    struct FailingMailer;

    impl Mailer for FailingMailer {
        fn send(&self, _: &str, _: &str, _: &[String]) -> Result<(), DeliveryError> {
            Err(DeliveryError::Send("connection reset".to_owned()))
        }
    }

    fn make_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.email.recipients = vec!["ops@example.com".to_owned()];
        config
    }

    fn make_issue(check: &str, severity: Severity, message: &str) -> Issue {
        Issue::new(check, severity, message).unwrap()
    }

    fn single_issue_collection(issue: Issue) -> IssueCollection {
        let mut issues = IssueCollection::new();
        issues.push(issue);
        issues
    }

    // ── Formatting tests ─────────────────────────────────────────────────

    #[test]
    fn test_empty_collection_formats_empty() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));
        assert_eq!(reporter.format_issues(&IssueCollection::new(), None), "");
        assert_eq!(reporter.format_issues_text(&IssueCollection::new()), "");
    }

    #[test]
    fn test_report_header_and_grouping() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));

        let mut issues = IssueCollection::new();
        issues.push(make_issue("CityValidationMag", Severity::Medium, "bad city"));
        issues.push(make_issue("CustomerNameMismatchMag", Severity::Low, "mismatch"));
        issues.push(make_issue("CityValidationMag", Severity::High, "very bad city"));

        let html = reporter.format_issues(&issues, None);
        assert!(html.contains("<h1>Data Quality Alert Report</h1>"));
        assert!(html.contains("<strong>Total Issues Found:</strong> 3"));
        assert!(html.contains("<h2>City Validation Mag</h2>"));
        assert!(html.contains("<h2>Customer Name Mismatch Mag</h2>"));
        // First-seen check order: the city group heading comes first
        let city = html.find("<h2>City Validation Mag</h2>").unwrap();
        let customer = html.find("<h2>Customer Name Mismatch Mag</h2>").unwrap();
        assert!(city < customer);
        assert!(html.contains("severity-medium"));
        assert!(html.contains("<strong>[HIGH]</strong>"));
    }

    #[test]
    fn test_execution_info_rendered_when_present() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));
        let issues = single_issue_collection(make_issue("A", Severity::Low, "m"));

        let without = reporter.format_issues(&issues, None);
        assert!(!without.contains("execution-info"));

        let with = reporter.format_issues(&issues, Some("All checks executed"));
        assert!(with.contains("Execution mode: All checks executed"));
    }

    #[test]
    fn test_details_rendered_and_escaped() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));
        let issue = make_issue("A", Severity::Medium, "found <script>alert(\"x\")</script>")
            .with_details("details & more");
        let html = reporter.format_issues(&single_issue_collection(issue), None);

        assert!(!html.contains("<script>"));
        assert!(html.contains("found &lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"));
        assert!(html.contains("<div class=\"details\">details &amp; more</div>"));
    }

    #[test]
    fn test_list_truncation_notice() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));

        let extra = ExtraData {
            entity_ids: (1..=15).map(|i| i.to_string()).collect(),
            ..ExtraData::default()
        };
        let issue = make_issue("A", Severity::Medium, "m").with_extra_data(extra);
        let html = reporter.format_issues(&single_issue_collection(issue), None);

        assert_eq!(html.matches("<li>").count(), 10);
        assert!(html.contains("Showing first 10 of 15 items"));
    }

    #[test]
    fn test_list_within_limit_has_no_notice() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));

        let extra = ExtraData {
            invalid_values: vec!["Baghdad2".to_owned(), "Basraa".to_owned()],
            ..ExtraData::default()
        };
        let issue = make_issue("A", Severity::Medium, "m").with_extra_data(extra);
        let html = reporter.format_issues(&single_issue_collection(issue), None);

        assert!(html.contains("Invalid Values:"));
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(!html.contains("truncation-notice"));
    }

    #[test]
    fn test_table_columns_from_first_record() {
        let mut config = make_config();
        config.report.max_table_rows = 2;
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));

        let extra = ExtraData {
            records: vec![
                Record::new().with("id", "1").with("city", "Basra"),
                Record::new().with("id", "2").with("city", "Erbil"),
                Record::new().with("id", "3").with("city", "Dohuk"),
            ],
            ..ExtraData::default()
        };
        let issue = make_issue("A", Severity::Medium, "m").with_extra_data(extra);
        let html = reporter.format_issues(&single_issue_collection(issue), None);

        assert!(html.contains("Detailed Records:"));
        assert!(html.contains("<th>id</th><th>city</th>"));
        assert!(html.contains("<td>1</td><td>Basra</td>"));
        assert!(html.contains("<td>2</td><td>Erbil</td>"));
        assert!(!html.contains("Dohuk"));
        assert!(html.contains("Showing first 2 of 3 records"));
    }

    #[test]
    fn test_summary_never_truncated() {
        let mut config = make_config();
        config.report.max_list_items = 3;
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));

        let extra = ExtraData {
            summary: (1..=12)
                .map(|i| (format!("Counter {i}"), i.to_string()))
                .collect(),
            ..ExtraData::default()
        };
        let issue = make_issue("A", Severity::Medium, "m").with_extra_data(extra);
        let html = reporter.format_issues(&single_issue_collection(issue), None);

        assert!(html.contains("Summary:"));
        assert!(html.contains("<strong>Counter 12:</strong> 12"));
        assert!(!html.contains("truncation-notice"));
    }

    #[test]
    fn test_text_fallback_layout() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));
        let issue = make_issue("CityValidationMag", Severity::High, "bad city")
            .with_details("worse than it looks");
        let text = reporter.format_issues_text(&single_issue_collection(issue));

        assert!(text.starts_with("Data Quality Alert Report\n"));
        assert!(text.contains("Total Issues Found: 1"));
        assert!(text.contains("CityValidationMag:\n-----------------"));
        assert!(text.contains("  [HIGH] bad city"));
        assert!(text.contains("    Details: worse than it looks"));
    }

    // ── Delivery tests ───────────────────────────────────────────────────

    #[test]
    fn test_send_empty_collection_is_false_without_delivery() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let config = make_config();
        let reporter = EmailReporter::with_mailer(
            &config,
            Box::new(RecordingMailer {
                sent: Arc::clone(&sent),
            }),
        );

        assert!(!reporter.send(&IssueCollection::new(), None));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_subject_and_recipients() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let config = make_config();
        let reporter = EmailReporter::with_mailer(
            &config,
            Box::new(RecordingMailer {
                sent: Arc::clone(&sent),
            }),
        );

        let mut issues = IssueCollection::new();
        issues.push(make_issue("A", Severity::Low, "1"));
        issues.push(make_issue("B", Severity::Low, "2"));
        assert!(reporter.send(&issues, Some("All checks executed")));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (subject, body, recipients) = &sent[0];
        assert_eq!(subject, "Data Quality Alert - 2 Issue(s) Found");
        assert!(body.contains("<h1>Data Quality Alert Report</h1>"));
        assert_eq!(recipients, &vec!["ops@example.com".to_owned()]);
    }

    #[test]
    fn test_send_failure_is_false() {
        let config = make_config();
        let reporter = EmailReporter::with_mailer(&config, Box::new(FailingMailer));
        let issues = single_issue_collection(make_issue("A", Severity::Low, "m"));
        assert!(!reporter.send(&issues, None));
    }

    // ── Helper tests ─────────────────────────────────────────────────────

    #[test]
    fn test_humanize_check_name() {
        assert_eq!(humanize_check_name("CityValidationMag"), "City Validation Mag");
        assert_eq!(humanize_check_name("Check"), "Check");
        assert_eq!(humanize_check_name(""), "");
        assert_eq!(humanize_check_name("ABC"), "A B C");
    }

    #[test]
    fn test_escape_html_covers_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
