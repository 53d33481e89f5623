//! Printable HTML reports.
//!
//! Two documents share one layout: a centred title and a bordered table whose
//! header uses the configured colour and whose rows alternate two shades.

use crate::config::ReportConfig;
use crate::time::encode_times;
use crate::{Medication, TakenRow};
use std::fmt::Write;

const EVEN_ROW: &str = "#f9f9f9";
const ODD_ROW: &str = "#fff";

pub const MEDICATION_REPORT_TITLE: &str = "Medication Report";
pub const HISTORY_REPORT_TITLE: &str = "Taken Medication Report";

pub const MEDICATION_COLUMNS: [&str; 4] = ["Name", "Amount", "Times", "Period"];
pub const HISTORY_COLUMNS: [&str; 7] = [
    "Name",
    "Amount",
    "Times",
    "Period",
    "Time Taken",
    "Date",
    "Status",
];

/// Background shade of the row at `index`
pub fn row_background(index: usize) -> &'static str {
    if index % 2 == 0 {
        EVEN_ROW
    } else {
        ODD_ROW
    }
}

/// Report of every medication
pub fn render_medication_report(medications: &[Medication], style: &ReportConfig) -> String {
    let rows: Vec<Vec<String>> = medications
        .iter()
        .map(|med| {
            vec![
                med.name.clone(),
                med.amount.clone(),
                encode_times(&med.times),
                med.period.clone(),
            ]
        })
        .collect();

    render_table(MEDICATION_REPORT_TITLE, &MEDICATION_COLUMNS, &rows, style)
}

/// Report of taken doses, in the order given
pub fn render_history_report(rows: &[TakenRow], style: &ReportConfig) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.name.clone(),
                format!("{} mg", row.amount),
                row.times.clone(),
                row.period.clone(),
                row.time_taken.clone(),
                row.date.clone(),
                row.status.clone(),
            ]
        })
        .collect();

    render_table(HISTORY_REPORT_TITLE, &HISTORY_COLUMNS, &rows, style)
}

fn render_table(title: &str, columns: &[&str], rows: &[Vec<String>], style: &ReportConfig) -> String {
    let mut html = String::new();

    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<html><head><meta charset=\"utf-8\"><title>{title}</title><style>\n\
         h1 {{ text-align: center; color: {title_color}; }}\n\
         table {{ width: 100%; border-collapse: collapse; }}\n\
         th, td {{ border: 1px solid #ddd; padding: 8px; }}\n\
         th {{ background-color: {header_color}; color: white; }}\n\
         </style></head><body>\n<h1>{title}</h1>\n<table><thead><tr>",
        title = escape_html(title),
        title_color = escape_html(&style.title_color),
        header_color = escape_html(&style.header_color),
    );

    for column in columns {
        let _ = write!(html, "<th>{}</th>", escape_html(column));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for (i, row) in rows.iter().enumerate() {
        let _ = write!(html, "<tr style=\"background:{}\">", row_background(i));
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody></table></body></html>\n");
    html
}

/// Escape text for use in HTML element content and attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
