use comfy_table::{presets::UTF8_FULL, Table};

use crate::config::ReportMixConfig;
use crate::exporters;
use crate::loaders;
use crate::report::fields::{FLAT_FIELDS, HASH_FIELDS};

/// Table of the fields accepted by --fields and --hash
pub fn fields_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Field", "Default hash"]);
    for (index, field) in FLAT_FIELDS.iter().enumerate() {
        let hashed = if HASH_FIELDS.contains(field) { "yes" } else { "" };
        table.add_row(vec![(index + 1).to_string(), field.to_string(), hashed.to_string()]);
    }
    table
}

/// List all available fields
pub fn list_fields() {
    println!();
    println!("📋 ReportMix — Available Fields");
    println!("{}", fields_table());
    println!("  {} fields", FLAT_FIELDS.len());
    println!();
    println!("  Run `reportmix mix --fields identifier,name,severity` to select fields");
    println!();
}

/// Table of the report sources
pub fn sources_table() -> Table {
    let config = ReportMixConfig::default();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Source", "Description"]);
    for loader in loaders::all_loaders(&config) {
        table.add_row(vec![loader.name().to_string(), loader.description().to_string()]);
    }
    table
}

/// List all available sources and output formats
pub fn list_sources() {
    println!();
    println!("📋 ReportMix — Available Sources");
    println!("{}", sources_table());
    println!("  Output formats: {}", exporters::FORMATS.join(", "));
    println!();
    println!("  Run `reportmix mix --sources npm_audit,sonarqube` to load specific sources");
    println!();
}
