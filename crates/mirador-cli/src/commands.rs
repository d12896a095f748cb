use anyhow::Result;
use comfy_table::Table;
use mirador_cli::build::{BuildRequest, BuildResult, build_dataset, load_study};
use mirador_core::DEFAULT_GROUP;
use mirador_model::{CanonicalField, Repeat};

use crate::cli::{BuildArgs, FieldsArgs};
use crate::summary::apply_table_style;

pub fn run_build(args: &BuildArgs) -> Result<BuildResult> {
    let request = BuildRequest {
        config: args.config.clone(),
        include_sequencing: args.seq,
        log_transform: args.log,
        output_dir: args.output_dir.clone(),
        csv: args.csv.clone(),
        spss: args.spss.clone(),
        missing: args.missing.clone(),
        csv_null: args.csv_null.clone(),
        dry_run: args.dry_run,
        strict: args.strict,
    };
    build_dataset(&request)
}

pub fn run_fields(args: &FieldsArgs) -> Result<()> {
    let study = load_study(&args.config)?;
    let mut table = Table::new();
    table.set_header(vec![
        "Field", "Label", "Type", "Group", "Table", "Priority", "Repeat",
    ]);
    apply_table_style(&mut table);
    for field in study.schema.fields() {
        let group = field.group.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let table_name = field.table.clone().unwrap_or_else(|| group.clone());
        table.add_row(vec![
            field.name.clone(),
            field.title().to_string(),
            field.field_type.as_str().to_string(),
            group,
            table_name,
            priority_text(field),
            repeat_text(field),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn priority_text(field: &CanonicalField) -> String {
    if field.priority.is_empty() {
        return "-".to_string();
    }
    field
        .priority
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

fn repeat_text(field: &CanonicalField) -> String {
    match (field.repeat, field.series_source()) {
        (Repeat::Series { summary }, Some(source)) => {
            if summary {
                format!("series of {source}, with summary")
            } else {
                format!("series of {source}")
            }
        }
        _ => "-".to_string(),
    }
}
