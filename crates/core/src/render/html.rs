use std::fmt::Write;

use super::ReportRenderer;
use crate::errors::CoreError;
use crate::models::performance::{ReportSnapshot, SymbolRole};

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; padding: 20px; }
.container { max-width: 1200px; margin: 0 auto; background: white; border-radius: 20px; box-shadow: 0 20px 40px rgba(0,0,0,0.1); overflow: hidden; }
.header { background: linear-gradient(135deg, #2c3e50 0%, #34495e 100%); color: white; padding: 40px; text-align: center; }
.header h1 { font-size: 2.5em; margin-bottom: 10px; }
.date-badge { display: inline-block; background: rgba(255,255,255,0.2); padding: 10px 20px; border-radius: 25px; margin-top: 15px; font-weight: 600; }
.section { padding: 50px 40px; }
.section-title { font-size: 2em; color: #2c3e50; margin-bottom: 30px; text-align: center; }
.summary-cards, .market-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 25px; }
.summary-card, .market-item { background: white; padding: 30px; border-radius: 15px; box-shadow: 0 8px 25px rgba(0,0,0,0.08); border: 2px solid #f1f3f4; }
.summary-card h3 { color: #6c757d; margin-bottom: 15px; text-transform: uppercase; letter-spacing: 1.5px; }
.summary-card .value { font-size: 2.2em; font-weight: 800; }
.market-item { display: flex; justify-content: space-between; align-items: center; }
.market-name { font-weight: 700; color: #2c3e50; font-size: 1.2em; }
.market-change { font-weight: 800; font-size: 1.3em; }
.portfolio-table { width: 100%; border-collapse: collapse; }
.portfolio-table th { background: #374151; color: white; padding: 18px; }
.portfolio-table td { padding: 16px; text-align: center; border-bottom: 1px solid #e5e7eb; }
.stock-symbol { font-weight: 800; }
.profit-positive { color: #10b981; }
.profit-negative { color: #ef4444; }
.skipped { color: #6b7280; font-size: 0.95em; }
.footer { background: #2c3e50; color: white; text-align: center; padding: 30px; }
@media (max-width: 768px) { .summary-cards, .market-grid { grid-template-columns: 1fr; } .portfolio-table { font-size: 0.85em; } }
"#;

/// Self-contained HTML5 page: summary cards, benchmark grid, holdings table.
pub struct HtmlRenderer {
    title: String,
}

impl HtmlRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn write_page(&self, out: &mut String, snapshot: &ReportSnapshot) -> std::fmt::Result {
        let report = &snapshot.report;
        let summary = &report.summary;
        let title = escape(&self.title);
        let date = snapshot.timestamp.format("%-d %B %Y");

        write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title} - {date}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
             <div class=\"container\">\n\
             <div class=\"header\"><h1>{title}</h1><div class=\"date-badge\">{date}</div></div>\n"
        )?;

        // ── Summary ──
        let pl_class = sign_class(summary.total_profit_loss);
        write!(
            out,
            "<div class=\"section\"><h2 class=\"section-title\">Portfolio Summary</h2>\
             <div class=\"summary-cards\">\
             <div class=\"summary-card\"><h3>Current Value</h3><div class=\"value\">{}</div></div>\
             <div class=\"summary-card\"><h3>Invested</h3><div class=\"value\">{}</div></div>\
             <div class=\"summary-card\"><h3>Profit / Loss</h3>\
             <div class=\"value {pl_class}\">{}</div><div class=\"{}\">{}</div></div>\
             </div></div>\n",
            money(summary.total_current_value),
            money(summary.total_invested),
            signed_money(summary.total_profit_loss),
            sign_class(summary.portfolio_return_percent),
            signed_percent(summary.portfolio_return_percent, 2),
        )?;

        // ── Benchmarks ──
        if !report.benchmarks.is_empty() {
            out.push_str(
                "<div class=\"section\"><h2 class=\"section-title\">Market Benchmarks</h2><div class=\"market-grid\">\n",
            );
            for b in &report.benchmarks {
                writeln!(
                    out,
                    "<div class=\"market-item\"><div class=\"market-name\">{}</div>\
                     <div class=\"market-change {}\">{}</div></div>",
                    escape(&b.name),
                    sign_class(b.record.change_percent),
                    signed_percent(b.record.change_percent, 1),
                )?;
            }
            out.push_str("</div></div>\n");
        }

        // ── Holdings ──
        out.push_str(
            "<div class=\"section\"><h2 class=\"section-title\">Holdings</h2>\
             <table class=\"portfolio-table\"><thead><tr>\
             <th>Symbol</th><th>Shares</th><th>Purchase Price</th><th>Current Price</th>\
             <th>Value</th><th>Profit / Loss</th><th>Change</th></tr></thead><tbody>\n",
        );
        for r in &report.portfolio {
            let class = sign_class(r.profit_loss);
            writeln!(
                out,
                "<tr><td class=\"stock-symbol\">{}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td class=\"{class}\">{}</td><td class=\"{class}\">{}</td></tr>",
                escape(&r.symbol),
                r.shares,
                money(r.purchase_price),
                money(r.current_price),
                money(r.current_value),
                signed_money(r.profit_loss),
                signed_percent(r.change_percent, 2),
            )?;
        }
        out.push_str("</tbody></table>\n");

        if !report.skipped.is_empty() {
            out.push_str("<p class=\"skipped\">Not included (no price data): ");
            let names: Vec<String> = report
                .skipped
                .iter()
                .map(|s| match s.role {
                    SymbolRole::Holding => escape(&s.symbol),
                    SymbolRole::Benchmark => format!("{} (benchmark)", escape(&s.symbol)),
                })
                .collect();
            out.push_str(&names.join(", "));
            out.push_str("</p>\n");
        }
        out.push_str("</div>\n");

        write!(
            out,
            "<div class=\"footer\"><p>Generated automatically</p><p>Updated {}</p></div>\n\
             </div>\n</body>\n</html>\n",
            snapshot.timestamp.format("%d/%m/%Y %H:%M UTC"),
        )
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new("Portfolio Performance Report")
    }
}

impl ReportRenderer for HtmlRenderer {
    fn extension(&self) -> &str {
        "html"
    }

    fn render(&self, snapshot: &ReportSnapshot) -> Result<Vec<u8>, CoreError> {
        let mut out = String::with_capacity(16 * 1024);
        self.write_page(&mut out, snapshot)
            .map_err(|e| CoreError::Render(e.to_string()))?;
        Ok(out.into_bytes())
    }
}

// ── Formatting helpers ──────────────────────────────────────────────

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn sign_class(value: f64) -> &'static str {
    if value >= 0.0 {
        "profit-positive"
    } else {
        "profit-negative"
    }
}

/// `1234567.891` → `1,234,567.89`
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped}.{frac_part}")
}

fn money(value: f64) -> String {
    if value < 0.0 {
        format!("-${}", group_thousands(value))
    } else {
        format!("${}", group_thousands(value))
    }
}

fn signed_money(value: f64) -> String {
    if value < 0.0 {
        format!("-${}", group_thousands(value))
    } else {
        format!("+${}", group_thousands(value))
    }
}

fn signed_percent(value: f64, decimals: usize) -> String {
    format!("{value:+.decimals$}%")
}
