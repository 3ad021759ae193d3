//! Terminal output: catalog lists, the session card, and period tables.

use arrow::util::pretty::pretty_format_batches;
use chrono::Local;
use worktally_core::metrics::breakdown;
use worktally_core::{
    CategoryKey, Capabilities, CountsMap, ItemShare, Metrics, PeriodReport, Preset, ResultDetail, SurveyTemplate,
    User,
};
use worktally_sync::ResumableInstance;

const MAX_LIST_ITEMS: usize = 10;

fn category_title(category: CategoryKey) -> &'static str {
    match category {
        CategoryKey::Real => "Real work",
        CategoryKey::Incidental => "Incidental work",
        CategoryKey::Wasteful => "Wasteful work",
    }
}

// ── Catalog ──

pub fn print_templates(templates: &[SurveyTemplate]) {
    if templates.is_empty() {
        println!("No survey templates registered.");
        return;
    }
    println!("{:<26} {:<6} {:<30} items", "id", "no", "name");
    for t in templates {
        println!(
            "{:<26} {:<6} {:<30} {}/{}/{}",
            t.id,
            t.no.as_deref().unwrap_or("-"),
            t.name,
            t.real_work.len(),
            t.incidental_work.len(),
            t.wasteful_work.len(),
        );
    }
}

pub fn print_presets(presets: &[Preset]) {
    if presets.is_empty() {
        println!("No presets registered.");
        return;
    }
    for p in presets {
        println!("{:<26} {}", p.id, p.name);
        for (category, items) in [
            (CategoryKey::Real, &p.real_work),
            (CategoryKey::Incidental, &p.incidental_work),
            (CategoryKey::Wasteful, &p.wasteful_work),
        ] {
            print_item_list(category_title(category), items);
        }
    }
}

fn print_item_list(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let shown: Vec<&str> = items.iter().take(MAX_LIST_ITEMS).map(String::as_str).collect();
    print!("  {:<26} {}", header, shown.join(", "));
    if items.len() > MAX_LIST_ITEMS {
        print!(" ... and {} more", items.len() - MAX_LIST_ITEMS);
    }
    println!();
}

pub fn print_resumable(instances: &[ResumableInstance]) {
    if instances.is_empty() {
        println!("No surveys in progress.");
        return;
    }
    println!("In progress:");
    for r in instances {
        let started = r
            .instance
            .started_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("  {:<26} {:<30} {}", r.instance.id, r.display_name, started);
    }
}

pub fn print_user(user: &User) {
    println!("{} ({}) company {}", user.name, user.user_id, user.company_code);
    println!("  {:<26} {:?}", "role", user.role);
    for (label, allowed) in capability_rows(&user.capabilities()) {
        println!("  {:<26} {}", label, yes_no(allowed));
    }
}

fn capability_rows(caps: &Capabilities) -> [(&'static str, bool); 6] {
    [
        ("run surveys", caps.can_run_surveys),
        ("manage templates", caps.can_manage_templates),
        ("view summary", caps.can_view_summary),
        ("manage data", caps.can_manage_data),
        ("manage users", caps.can_manage_users),
        ("assign company", caps.can_assign_company),
    ]
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

// ── Session card ──

/// Print the live session as a vertical card: one section per category
/// with item counts and their share, then the metrics.
pub fn print_session_card(instance_id: &str, template: &SurveyTemplate, counts: &CountsMap, metrics: &Metrics) {
    println!("=== {} ===", template.name);
    println!("instance {instance_id}");
    println!();

    print_item_sections(&breakdown(template, counts));
    println!();
    print_metrics(metrics);
}

/// One section per category with item counts and their share. Section
/// headers carry the sum of the listed items.
fn print_item_sections(rows: &[ItemShare]) {
    for category in CategoryKey::ALL {
        let section: Vec<_> = rows.iter().filter(|r| r.category == category).collect();
        if section.is_empty() {
            continue;
        }
        let subtotal: u64 = section.iter().map(|r| r.count).sum();
        println!("{} ({})", category_title(category), subtotal);
        for row in section {
            println!("  {:<26} {:>5}  {:>5.1}%", row.item, row.count, row.share);
        }
    }
}

pub fn print_metrics(metrics: &Metrics) {
    println!("  {:<26} {}", "total", metrics.total);
    println!("  {:<26} {:.1}%", "discovery rate", metrics.discovery_rate);
    println!("  {:<26} {}", "rank", metrics.rank);
}

// ── Saved results ──

pub fn print_result_detail(detail: &ResultDetail) {
    let record = &detail.record;
    println!("=== {} ===", record.survey_name);
    println!("result {}", record.id);
    println!(
        "surveyed {}",
        record.surveyed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if !detail.has_template {
        println!("template {} no longer exists, metrics not graded", record.survey_id);
    }
    println!();
    print_item_sections(&detail.items);
    println!();
    print_metrics(&detail.metrics);
}

// ── Period report ──

pub fn print_period_report(report: &PeriodReport) -> anyhow::Result<()> {
    if report.is_empty() {
        println!("No results in this period.");
        return Ok(());
    }
    let batch = report.to_record_batch()?;
    println!("{}", pretty_format_batches(&[batch])?);
    println!();

    println!("Trend");
    let points = report
        .trend
        .surveyed_at
        .iter()
        .zip(&report.trend.discovery_rate)
        .zip(&report.trend.total_count);
    for ((at, rate), total) in points {
        println!(
            "  {:<26} {:>6.1}%  {:>5}",
            at.format("%Y-%m-%d %H:%M"),
            rate,
            total
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use worktally_core::Role;

    use super::*;

    #[test]
    fn capability_rows_cover_user_administration() {
        let rows = capability_rows(&Capabilities::for_role(Role::Super));
        assert!(rows.contains(&("manage users", true)));
        assert!(rows.contains(&("assign company", true)));

        let rows = capability_rows(&Capabilities::for_role(Role::User));
        assert!(rows.contains(&("manage users", false)));
        assert!(rows.contains(&("assign company", false)));
    }
}
