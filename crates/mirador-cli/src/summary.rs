use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use mirador_cli::build::BuildResult;
use mirador_core::SourceStats;
use mirador_model::{DiagnosticKind, DiagnosticReport, SourceKind};

pub fn print_summary(result: &BuildResult) {
    let stats = &result.output.stats;
    println!("Study: {}", result.title);
    if result.dry_run {
        println!("Dry run: no files written");
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    if let Some(path) = &result.files.csv {
        println!("Flat CSV: {}", path.display());
    }
    if let Some(spss) = &result.files.spss {
        println!("SPSS card: {}", spss.card.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Kind"),
        header_cell("Cohort"),
        header_cell("Records"),
        header_cell("Patients"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    let mut total_records = 0usize;
    for source in &stats.sources {
        total_records += source.records;
        table.add_row(source_row(source));
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(total_records).add_attribute(Attribute::Bold),
        Cell::new(stats.patients).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    println!(
        "Patients: {}  Columns: {}  Genomic profiles: {}",
        stats.patients, stats.columns, stats.genomic_profiles
    );
    println!("Fingerprint: {}", result.fingerprint);
    print_warning_table(&result.output.diagnostics);
}

fn source_row(source: &SourceStats) -> Vec<Cell> {
    let kind = match source.kind {
        SourceKind::Snapshot => "snapshot",
        SourceKind::Series => "series",
    };
    vec![
        Cell::new(&source.name)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Cell::new(kind),
        if source.cohort {
            Cell::new("✓").fg(Color::Green)
        } else {
            dim_cell("-")
        },
        Cell::new(source.records),
        Cell::new(source.patients),
    ]
}

fn print_warning_table(report: &DiagnosticReport) {
    if report.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Warning"),
        header_cell("Count"),
        header_cell("Drops record"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Center);
    for (kind, count) in report.counts_by_kind() {
        table.add_row(vec![
            Cell::new(kind),
            count_cell(count, kind),
            if kind.drops_record() {
                Cell::new("yes").fg(Color::Red)
            } else {
                dim_cell("no")
            },
        ]);
    }
    println!();
    println!("Warnings:");
    println!("{table}");
}

fn count_cell(count: usize, kind: DiagnosticKind) -> Cell {
    let color = if kind.drops_record() {
        Color::Red
    } else {
        Color::Yellow
    };
    Cell::new(count).fg(color).add_attribute(Attribute::Bold)
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
