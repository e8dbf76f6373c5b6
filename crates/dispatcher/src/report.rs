use wm_domain::{CheckRecord, CheckStatus, Website};

/// The five report shapes from the classification table (spec §4.4). The
/// `ManualSingle` variant carries which of the four phases ran, since that
/// phase name drives the subject line ("Manual *Visual* Check for ...").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    BaselineCreated,
    ManualSingle(SinglePhase),
    ManualFull,
    ScheduledFull,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinglePhase {
    Crawl,
    Visual,
    Blur,
    Performance,
}

impl SinglePhase {
    fn label(self) -> &'static str {
        match self {
            SinglePhase::Crawl => "Crawl",
            SinglePhase::Visual => "Visual",
            SinglePhase::Blur => "Blur",
            SinglePhase::Performance => "Performance",
        }
    }
}

/// Classify by `(is_manual, phases attempted)`, per the §9 resolution:
/// phases that aborted with a precondition error still count as attempted;
/// only phases never attempted because their flag was false are excluded.
/// Falls back to `Error` when the run's status is `Failed`.
pub fn classify(
    record: &CheckRecord,
    create_baseline: bool,
    attempted: [bool; 4], // crawl, visual, blur, performance
) -> ReportKind {
    if record.status == CheckStatus::Failed {
        return ReportKind::Error;
    }

    let attempted_count = attempted.iter().filter(|a| **a).count();

    if create_baseline && attempted == [false, true, false, false] {
        return ReportKind::BaselineCreated;
    }

    if attempted_count == 4 {
        return if record.is_manual { ReportKind::ManualFull } else { ReportKind::ScheduledFull };
    }

    if record.is_manual {
        if let Some(phase) = single_requested_phase(attempted) {
            return ReportKind::ManualSingle(phase);
        }
    }

    // Anything else (e.g. a scheduled run with only some flags enabled) is
    // still a legitimate, non-error report; present it as the closest
    // full/single shape by phase count so the subject line stays sensible.
    if record.is_manual {
        ReportKind::ManualFull
    } else {
        ReportKind::ScheduledFull
    }
}

/// Which single phase a check-type template asked for, in user-facing
/// terms. `blur` and `performance` templates both pull `crawl` in as a page-
/// discovery dependency (spec §4.4 phase 1: "if `crawl` or any downstream
/// phase needs a page list"), so `crawl` running alongside exactly one of
/// {visual, blur, performance} still counts as that one phase rather than as
/// a four-phase "full" run. A bare `crawl` request (no downstream phase) is
/// its own single phase.
fn single_requested_phase(attempted: [bool; 4]) -> Option<SinglePhase> {
    let [crawl, visual, blur, performance] = attempted;
    let downstream_count = [visual, blur, performance].iter().filter(|a| **a).count();

    if downstream_count == 1 {
        return Some(if visual {
            SinglePhase::Visual
        } else if blur {
            SinglePhase::Blur
        } else {
            SinglePhase::Performance
        });
    }
    if downstream_count == 0 && crawl {
        return Some(SinglePhase::Crawl);
    }
    None
}

pub struct Report {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub recipients: Vec<String>,
}

/// Build the subject/body/recipient set for one invocation. `summary` is a
/// short human sentence describing the outcome (e.g. "2 pages changed").
pub fn build(
    website: &Website,
    record: &CheckRecord,
    kind: ReportKind,
    summary: &str,
    default_recipients: &[String],
    dashboard_url: &str,
) -> Report {
    let subject = match kind {
        ReportKind::BaselineCreated => format!("Baselines Created for {}", website.display_name),
        ReportKind::ManualSingle(phase) => {
            format!("Manual {} Check for {} — {}", phase.label(), website.display_name, summary)
        }
        ReportKind::ManualFull => format!("Manual Full Check for {} — {}", website.display_name, summary),
        ReportKind::ScheduledFull => format!("Scheduled Full Check for {}", website.display_name),
        ReportKind::Error => format!(
            "Check Failed for {} — {}",
            website.display_name,
            record.error_message.as_deref().unwrap_or("unknown error")
        ),
    };

    let accent = match kind {
        ReportKind::Error => "error",
        ReportKind::ManualSingle(_) | ReportKind::ManualFull | ReportKind::BaselineCreated => "manual",
        ReportKind::ScheduledFull => "scheduled",
    };

    let html = render_html(website, record, accent, summary, dashboard_url);
    let text = render_text(website, record, summary, dashboard_url);

    let recipients = if website.notification_recipients.is_empty() {
        default_recipients.to_vec()
    } else {
        website.notification_recipients.clone()
    };
    if recipients.is_empty() {
        tracing::warn!(website_id = %website.id, "report: no notification recipients configured, skipping send");
    }

    Report { subject, html, text, recipients }
}

fn render_html(website: &Website, record: &CheckRecord, accent: &str, summary: &str, dashboard_url: &str) -> String {
    let mut sections = String::new();

    if let Some(crawl) = &record.crawl {
        sections.push_str(&format!(
            "<h3>Crawl</h3><p>{} pages crawled, {} broken links, {} missing meta tags.</p>",
            crawl.pages_crawled,
            crawl.broken_links.len(),
            crawl.missing_meta_tags.len()
        ));
    }
    if let Some(visual) = &record.visual {
        let flagged = visual.pages.iter().filter(|p| p.flagged_change).count();
        sections.push_str(&format!(
            "<h3>Visual</h3><p>{} pages compared, {} flagged as changed, {} baselines created.</p>",
            visual.pages.len(),
            flagged,
            visual.baselines_created.len()
        ));
    }
    if let Some(blur) = &record.blur {
        sections.push_str(&format!(
            "<h3>Blur</h3><p>{} images processed, {} blurry ({:.1}%).</p>",
            blur.images_processed, blur.blurry_count, blur.blur_percent
        ));
    }
    if let Some(perf) = &record.performance {
        sections.push_str(&format!(
            "<h3>Performance</h3><p>{} pages analyzed, average mobile {:.0}, average desktop {:.0}.</p>",
            perf.pages.len(),
            perf.average_mobile_score,
            perf.average_desktop_score
        ));
    }
    if let Some(err) = &record.error_message {
        sections.push_str(&format!("<h3>Error</h3><p>{err}</p>"));
    }

    format!(
        "<div class=\"report report--{accent}\"><h2>{}</h2><p>{summary}</p>{sections}<p><a href=\"{dashboard_url}/websites/{}\">View in dashboard</a></p></div>",
        website.display_name, website.id
    )
}

fn render_text(website: &Website, record: &CheckRecord, summary: &str, dashboard_url: &str) -> String {
    let mut out = format!("{}\n{}\n\n", website.display_name, summary);
    if let Some(err) = &record.error_message {
        out.push_str(&format!("Error: {err}\n\n"));
    }
    out.push_str(&format!("{dashboard_url}/websites/{}\n", website.id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(is_manual: bool, status: CheckStatus) -> CheckRecord {
        CheckRecord {
            id: "r1".into(),
            website_id: "w1".into(),
            timestamp: Utc::now(),
            status,
            is_manual,
            is_change_report: false,
            crawl: None,
            visual: None,
            blur: None,
            performance: None,
            error_message: None,
        }
    }

    #[test]
    fn baseline_created_requires_visual_only_and_create_baseline() {
        let r = record(true, CheckStatus::Completed);
        let kind = classify(&r, true, [false, true, false, false]);
        assert_eq!(kind, ReportKind::BaselineCreated);
    }

    #[test]
    fn manual_single_phase_identifies_the_phase() {
        let r = record(true, CheckStatus::Completed);
        let kind = classify(&r, false, [false, false, true, false]);
        assert_eq!(kind, ReportKind::ManualSingle(SinglePhase::Blur));
    }

    #[test]
    fn manual_blur_classifies_as_single_blur_even_with_crawl_dependency() {
        // `CheckConfig::for_manual(CheckType::Blur, ..)`'s template is
        // `(crawl: true, visual: false, blur: true, performance: false)` —
        // crawl runs only to supply the image inventory, not as a second
        // user-requested phase.
        let r = record(true, CheckStatus::Completed);
        let kind = classify(&r, false, [true, false, true, false]);
        assert_eq!(kind, ReportKind::ManualSingle(SinglePhase::Blur));
    }

    #[test]
    fn manual_crawl_only_classifies_as_single_crawl() {
        let r = record(true, CheckStatus::Completed);
        let kind = classify(&r, false, [true, false, false, false]);
        assert_eq!(kind, ReportKind::ManualSingle(SinglePhase::Crawl));
    }

    #[test]
    fn all_four_manual_is_manual_full() {
        let r = record(true, CheckStatus::Completed);
        assert_eq!(classify(&r, false, [true, true, true, true]), ReportKind::ManualFull);
    }

    #[test]
    fn all_four_scheduled_is_scheduled_full() {
        let r = record(false, CheckStatus::Completed);
        assert_eq!(classify(&r, false, [true, true, true, true]), ReportKind::ScheduledFull);
    }

    #[test]
    fn failed_status_always_classifies_as_error() {
        let mut r = record(true, CheckStatus::Failed);
        r.error_message = Some("boom".into());
        assert_eq!(classify(&r, false, [false, true, false, false]), ReportKind::Error);
    }
}
