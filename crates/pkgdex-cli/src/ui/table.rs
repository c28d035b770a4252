//! Table rendering for `show` and `select`.

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Status of an installer row in `select` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerStatus {
    Selected,
    Applicable,
    Rejected(String),
}

/// One installer as shown in a table.
#[derive(Debug, Clone)]
pub struct InstallerRow {
    pub index: usize,
    pub architecture: String,
    pub installer_type: String,
    pub scope: String,
    pub locale: String,
    pub status: InstallerStatus,
}

fn base_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Blue)));
    table
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

pub fn installer_table(rows: &[InstallerRow]) -> Table {
    let mut table = base_table(&["#", "Architecture", "Type", "Scope", "Locale", "Status"]);
    for row in rows {
        let status = match &row.status {
            InstallerStatus::Selected => Cell::new("selected").fg(Color::Green),
            InstallerStatus::Applicable => Cell::new("applicable"),
            InstallerStatus::Rejected(reason) => Cell::new(reason).fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(row.index),
            Cell::new(&row.architecture),
            Cell::new(&row.installer_type),
            Cell::new(or_dash(&row.scope)),
            Cell::new(or_dash(&row.locale)),
            status,
        ]);
    }
    table
}

/// Versions of a package, newest first.
pub fn version_table(rows: &[(String, String, String)]) -> Table {
    let mut table = base_table(&["Version", "Channel", "Name"]);
    for (version, channel, name) in rows {
        table.add_row(vec![version.as_str(), or_dash(channel), or_dash(name)]);
    }
    table
}
