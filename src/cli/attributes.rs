use anyhow::Result;
use hierarchy_snapshot::{aliases, Attribute};
use serde::Serialize;

use super::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
struct AttributeReport {
    name: &'static str,
    aliases: Vec<&'static str>,
}

pub fn cmd_attributes(output: OutputFormat) -> Result<()> {
    let table: Vec<AttributeReport> = Attribute::ALL
        .iter()
        .map(|attribute| AttributeReport {
            name: attribute.protocol_name(),
            aliases: aliases(*attribute).collect(),
        })
        .collect();

    emit(output, &table, |table| {
        for row in table {
            if row.aliases.is_empty() {
                println!("{}", row.name);
            } else {
                println!("{} ({})", row.name, row.aliases.join(", "));
            }
        }
    })
}
