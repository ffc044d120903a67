//! `parley commands`: show the command partitions that would be registered.

use anyhow::Result;
use parley_commands::CommandsRegistrar;
use tokio_util::sync::CancellationToken;

use crate::terminal_output::{note_error, note_info, note_success, paint, render_table, Column, DIM};

pub async fn run(registrar: &CommandsRegistrar) -> Result<bool> {
    let preview = registrar.preview(&CancellationToken::new()).await;
    if preview.is_empty() {
        note_info("No command handlers declared by the configured modules");
        return Ok(true);
    }

    let columns = vec![
        Column::left("Name"),
        Column::left("Type"),
        Column::left("Description").max_width(48),
        Column::right("Options"),
    ];

    let mut ok = true;
    for (partition, built) in preview {
        match built {
            Ok(commands) => {
                note_success(&format!("{partition}: {} command(s)", commands.len()));
                let rows: Vec<Vec<String>> = commands
                    .iter()
                    .map(|c| {
                        vec![
                            c.name().to_string(),
                            c.kind().to_string(),
                            c.description().map_or_else(|| paint(DIM, "-"), str::to_string),
                            c.options.len().to_string(),
                        ]
                    })
                    .collect();
                print!("{}", render_table(&columns, &rows));
            }
            Err(e) => {
                ok = false;
                note_error(&format!("{partition}: {e}"));
            }
        }
    }
    Ok(ok)
}
