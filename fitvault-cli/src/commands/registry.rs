//! Registry command handler

use anyhow::Result;
use colored::*;

use crate::config::Config;

/// Print every carrier rule the store resolves carriers with, in order
pub fn show(config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let registry = store.registry();

    println!(
        "{}",
        format!("{} carrier rule(s), first match wins:", registry.rules().len()).bold()
    );
    println!("  Store: {}", store.config().root.display().to_string().dimmed());
    println!();
    for rule in registry.rules() {
        println!("  {} {}", "▸".cyan(), rule.id.bold());
        if rule.pattern != rule.id {
            println!("    Pattern: {}", rule.pattern.dimmed());
        }
        let fields: Vec<String> = rule
            .handle_fields
            .iter()
            .map(|field| {
                if rule.default_field.as_deref() == Some(field.as_str()) {
                    format!("{} (default)", field)
                } else {
                    field.clone()
                }
            })
            .collect();
        println!("    Fields:  {}", fields.join(", ").dimmed());
        if rule.requires_custom_loader() {
            println!(
                "    Custom:  {}",
                rule.custom_objects.names().collect::<Vec<_>>().join(", ").yellow()
            );
        }
    }

    Ok(())
}
