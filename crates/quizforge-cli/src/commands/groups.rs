//! Question groups: `create-group`, `list-groups`.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{connect, truncate};

pub async fn create(
    config: Option<PathBuf>,
    user: Option<String>,
    name: String,
    description: String,
) -> Result<()> {
    let ctx = connect(config, user)?;
    let group = ctx.engine.create_group(&name, &description).await?;
    println!("Created group {}: {}", group.id, group.name);
    Ok(())
}

pub async fn list(config: Option<PathBuf>, user: Option<String>) -> Result<()> {
    let ctx = connect(config, user)?;
    let groups = ctx.engine.list_groups().await?;
    if groups.is_empty() {
        println!("No groups yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description"]);
    for g in &groups {
        table.add_row(vec![
            Cell::new(&g.id),
            Cell::new(&g.name),
            Cell::new(truncate(&g.description, 50)),
        ]);
    }
    println!("{table}");
    Ok(())
}
