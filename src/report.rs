/// Report module: a self-contained HTML summary of one inventory.
///
/// Produces a single HTML document with inline CSS and SVG, so the output
/// can be saved or embedded in a notebook without external assets:
/// - Header with company, reporting year, boundary approach and timestamp
/// - Scope totals, boundary-adjusted and raw
/// - Facility breakdown and Scope 3 category ranking
/// - Data-quality summary, formula audit and calculation warnings
use chrono::{NaiveDateTime, Utc};

use crate::aggregation::{InventoryResults, ScopeTotals, SourceResult};
use crate::category::CalculationMethod;
use crate::config::{Settings, Theme};
use crate::project::Project;

// ── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the HTML report.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Heading text (default: "<company> GHG Inventory <year>")
    pub title: Option<String>,
    /// Timestamp shown in the header (default: now, UTC)
    pub generated_at: Option<NaiveDateTime>,
    /// Emit the per-source formula audit table
    pub include_formulas: bool,
    /// Emit the list of calculation warnings
    pub include_warnings: bool,
    /// Width in pixels of the longest Scope 3 bar
    pub bar_width_px: u32,
    /// Colour scheme; `System` follows the viewer's preference
    pub theme: Theme,
    /// Value of the document's `lang` attribute
    pub language: String,
    /// Currency shown next to spend-based sources
    pub currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: None,
            generated_at: None,
            include_formulas: true,
            include_warnings: true,
            bar_width_px: 320,
            theme: Theme::System,
            language: "en".to_string(),
            currency: "USD".to_string(),
        }
    }
}

impl ReportConfig {
    /// Defaults with theme, language and currency taken from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            theme: settings.theme,
            language: settings.language.clone(),
            currency: settings.currency.clone(),
            ..Self::default()
        }
    }
}

const BAR_HEIGHT_PX: u32 = 18;
const BAR_GAP_PX: u32 = 6;

const STYLE: &str = r#"<style>
  body { font-family: sans-serif; color: #212529; margin: 24px; }
  h1 { font-size: 22px; margin-bottom: 4px; }
  h2 { font-size: 16px; margin-top: 28px; border-bottom: 1px solid #dee2e6; padding-bottom: 4px; }
  .meta { color: #868e96; font-size: 12px; }
  table { border-collapse: collapse; font-size: 13px; }
  th, td { padding: 4px 10px; border-bottom: 1px solid #e9ecef; text-align: left; }
  td.num { text-align: right; font-variant-numeric: tabular-nums; }
  tr.total td { font-weight: 600; }
  .empty { color: #868e96; font-style: italic; }
  .warn { color: #c0392b; }
  .bar { fill: #4dabf7; }
  .bar-label { font-size: 11px; fill: #495057; }
</style>"#;

const DARK_RULES: &str = r#"
  body { background: #1a1b1e; color: #e9ecef; }
  h2, th, td { border-color: #373a40; }
  .bar-label { fill: #ced4da; }
  .warn { color: #ff8787; }
"#;

fn theme_style(theme: Theme) -> String {
    match theme {
        Theme::Light => String::new(),
        Theme::Dark => format!("<style>{}</style>", DARK_RULES),
        Theme::System => format!(
            "<style>\n@media (prefers-color-scheme: dark) {{{}}}\n</style>",
            DARK_RULES
        ),
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

/// Render the inventory as an HTML document. All text is HTML-escaped.
pub fn generate_report_html(
    project: &Project,
    results: &InventoryResults,
    config: &ReportConfig,
) -> String {
    let title = config.title.clone().unwrap_or_else(|| {
        format!(
            "{} GHG Inventory {}",
            project.company_name, project.reporting_year
        )
    });
    let generated_at = config
        .generated_at
        .unwrap_or_else(|| Utc::now().naive_utc());

    let mut body = String::new();
    body.push_str(&format!(
        r#"<h1>{}</h1>
<p class="meta">{} · Reporting year {} · {} · Generated {}</p>
"#,
        escape_html(&title),
        escape_html(&project.company_name),
        project.reporting_year,
        escape_html(results.approach.label()),
        generated_at.format("%Y-%m-%d %H:%M"),
    ));

    if results.sources.is_empty() {
        body.push_str(
            r#"<p class="empty">No emission sources have been recorded for this inventory yet.</p>
"#,
        );
    } else {
        body.push_str(&totals_section(results));
        body.push_str(&facilities_section(results));
        body.push_str(&categories_section(results, config.bar_width_px));
        body.push_str(&quality_section(results));
        if config.include_formulas {
            body.push_str(&formulas_section(results, &config.currency));
        }
        if config.include_warnings {
            body.push_str(&warnings_section(results));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="{}" data-theme="{}">
<head>
<meta charset="utf-8">
<title>{}</title>
{}
{}
</head>
<body>
{}</body>
</html>
"#,
        escape_html(&config.language),
        config.theme,
        escape_html(&title),
        STYLE,
        theme_style(config.theme),
        body
    )
}

// ── Sections ────────────────────────────────────────────────────────────────

fn totals_section(results: &InventoryResults) -> String {
    let rows: [(&str, fn(&ScopeTotals) -> f64); 6] = [
        ("Scope 1", |t| t.scope1),
        ("Scope 2 (location-based)", |t| t.scope2_location),
        ("Scope 2 (market-based)", |t| t.scope2_market),
        ("Scope 3", |t| t.scope3),
        ("Total (location-based)", |t| t.total_location()),
        ("Total (market-based)", |t| t.total_market()),
    ];
    let mut s = String::from(
        "<h2>Scope totals</h2>\n<table>\n<tr><th></th><th>t CO2e</th><th>t CO2e (before ownership)</th></tr>\n",
    );
    for (i, (label, value)) in rows.iter().enumerate() {
        let class = if i >= 4 { r#" class="total""# } else { "" };
        s.push_str(&format!(
            r#"<tr{}><td>{}</td><td class="num">{}</td><td class="num">{}</td></tr>
"#,
            class,
            label,
            fmt_tonnes(value(&results.totals)),
            fmt_tonnes(value(&results.raw_totals)),
        ));
    }
    s.push_str("</table>\n");
    s
}

fn facilities_section(results: &InventoryResults) -> String {
    let mut s = String::from(
        "<h2>Facilities</h2>\n<table>\n<tr><th>Facility</th><th>Group</th><th>Ownership</th>\
         <th>Scope 1</th><th>Scope 2 (market)</th><th>Scope 3</th><th>Total (market)</th></tr>\n",
    );
    for f in &results.facilities {
        s.push_str(&format!(
            r#"<tr><td>{}</td><td>{}</td><td class="num">{:.0}%</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>
"#,
            escape_html(&f.name),
            escape_html(f.group.as_deref().unwrap_or("")),
            f.ownership_factor * 100.0,
            fmt_tonnes(f.weighted.scope1),
            fmt_tonnes(f.weighted.scope2_market),
            fmt_tonnes(f.weighted.scope3),
            fmt_tonnes(f.weighted.total_market()),
        ));
    }
    s.push_str("</table>\n");
    s
}

fn categories_section(results: &InventoryResults, bar_width_px: u32) -> String {
    let mut s = String::from("<h2>Scope 3 by category</h2>\n");
    let rows = &results.scope3_categories;
    if rows.is_empty() {
        s.push_str("<p class=\"empty\">No Scope 3 emissions in this inventory.</p>\n");
        return s;
    }

    let max = rows.iter().map(|c| c.emissions).fold(0.0_f64, f64::max);
    let label_width = 260;
    let width = label_width + bar_width_px + 140;
    let height = rows.len() as u32 * (BAR_HEIGHT_PX + BAR_GAP_PX);
    s.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">
"#,
        width, height
    ));
    for (i, c) in rows.iter().enumerate() {
        let y = i as u32 * (BAR_HEIGHT_PX + BAR_GAP_PX);
        let w = if max > 0.0 {
            (c.emissions / max * f64::from(bar_width_px)).round()
        } else {
            0.0
        };
        s.push_str(&format!(
            r#"  <text class="bar-label" x="0" y="{ty}">{label}</text>
  <rect class="bar" x="{x}" y="{y}" width="{w}" height="{h}"><title>{label}: {t} t CO2e</title></rect>
  <text class="bar-label" x="{vx}" y="{ty}">{t} t ({share:.1}%)</text>
"#,
            ty = y + BAR_HEIGHT_PX - 5,
            label = escape_html(c.category.label()),
            x = label_width,
            y = y,
            w = w,
            h = BAR_HEIGHT_PX,
            t = fmt_tonnes(c.emissions),
            vx = label_width as f64 + w + 6.0,
            share = c.share_pct,
        ));
    }
    s.push_str("</svg>\n");
    s
}

fn quality_section(results: &InventoryResults) -> String {
    let dq = &results.data_quality;
    let average = dq
        .average_dqi_score
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        r#"<h2>Data quality</h2>
<table>
<tr><td>Primary data sources</td><td class="num">{}</td></tr>
<tr><td>Estimated sources</td><td class="num">{}</td></tr>
<tr><td>Primary share</td><td class="num">{:.0}%</td></tr>
<tr><td>Overall quality</td><td class="num">{}</td></tr>
<tr><td>Average DQI score</td><td class="num">{}</td></tr>
</table>
"#,
        dq.primary_sources,
        dq.estimated_sources,
        dq.primary_share * 100.0,
        dq.label,
        average,
    )
}

fn method_label(r: &SourceResult, currency: &str) -> String {
    match r.method {
        CalculationMethod::Spend => format!("{} ({})", r.method.as_str(), currency),
        _ => r.method.as_str().to_string(),
    }
}

fn formulas_section(results: &InventoryResults, currency: &str) -> String {
    let mut s = String::from(
        "<h2>Calculation audit</h2>\n<table>\n<tr><th>Source</th><th>Category</th>\
         <th>Method</th><th>Formula</th></tr>\n",
    );
    for r in &results.sources {
        s.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&r.source_id),
            escape_html(r.category.label()),
            escape_html(&method_label(r, currency)),
            escape_html(&r.result.formula),
        ));
    }
    s.push_str("</table>\n");
    s
}

fn warnings_section(results: &InventoryResults) -> String {
    let items: Vec<String> = results
        .warnings()
        .map(|(id, w)| {
            format!(
                "<li class=\"warn\">{}: {}</li>",
                escape_html(id),
                escape_html(&w.to_string())
            )
        })
        .collect();
    if items.is_empty() {
        return String::new();
    }
    format!("<h2>Warnings</h2>\n<ul>\n{}\n</ul>\n", items.join("\n"))
}

// ── Formatting helpers ──────────────────────────────────────────────────────

/// kg → tonnes, two decimals, thousands separated.
fn fmt_tonnes(kg: f64) -> String {
    let fixed = format!("{:.2}", kg / 1000.0);
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, frac)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
