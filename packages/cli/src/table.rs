//! Console table rendering for permit results.
//!
//! Header row is green and underlined, the first column yellow. Column
//! widths are measured on the unstyled text so padding stays aligned.

use console::style;
use permit_map_permit_models::{BuildingPermit, QueryResult};

const HEADERS: [&str; 10] = [
    "PermitNum",
    "PermitClass",
    "PermitTypeDesc",
    "Description",
    "AppliedDate",
    "IssuedDate",
    "ExpiresDate",
    "Status",
    "RelatedMUP",
    "Address",
];

const COLUMN_GAP: &str = "  ";

fn cells(permit: &BuildingPermit) -> [&str; 10] {
    [
        permit.permit_num.as_str(),
        permit.permit_class.as_str(),
        permit.permit_type_desc.as_str(),
        permit.description.as_str(),
        permit.applied_date.as_str(),
        permit.issued_date.as_str(),
        permit.expires_date.as_str(),
        permit.status.as_str(),
        permit.related_mup.as_str(),
        permit.address.as_str(),
    ]
}

fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Widest cell per column, headers included.
fn column_widths(permits: &[BuildingPermit]) -> [usize; 10] {
    let mut widths = HEADERS.map(text_width);
    for permit in permits {
        for (width, cell) in widths.iter_mut().zip(cells(permit)) {
            *width = (*width).max(text_width(cell));
        }
    }
    widths
}

fn pad(cell: &str, width: usize) -> String {
    format!("{cell:<width$}")
}

/// Formats one line per row, header first, with no trailing whitespace.
fn render_lines(permits: &[BuildingPermit], styled: bool) -> Vec<String> {
    let widths = column_widths(permits);
    let mut lines = Vec::with_capacity(permits.len() + 1);

    let header = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| {
            let padded = pad(h, w);
            if styled {
                style(padded).green().underlined().to_string()
            } else {
                padded
            }
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    lines.push(header.trim_end().to_string());

    for permit in permits {
        let row = cells(permit)
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = pad(cell, w);
                if styled && i == 0 {
                    style(padded).yellow().to_string()
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>()
            .join(COLUMN_GAP);
        lines.push(row.trim_end().to_string());
    }

    lines
}

/// Prints the permit table followed by the total match count.
pub fn print(result: &QueryResult) {
    let styled = console::colors_enabled();
    for line in render_lines(&result.permits, styled) {
        println!("{line}");
    }
    println!("Available Records: {}", result.total_count);
}
