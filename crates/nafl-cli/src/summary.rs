use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use nafl_cli::types::{StageResult, StudyResult, TableOutput};

pub fn print_stage_summary(result: &StageResult) {
    println!("Stage: {}", result.attrition.stage);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Patients"),
        header_cell("Rows"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for step in &result.attrition.steps {
        table.add_row(vec![
            Cell::new(&step.label),
            Cell::new(step.patients),
            Cell::new(step.rows),
        ]);
    }
    println!("{table}");

    let encoding = &result.encoding;
    println!(
        "Features: {} retained, {} below minimum support ({} categories)",
        encoding.retained_columns, encoding.dropped_columns, encoding.categories
    );
    if let Some((positive, censored)) = result.outcomes {
        println!("Outcomes: {positive} progressed, {censored} censored");
    }
    if !result.sentinels.is_empty() {
        println!("Sentinel values filtered: {}", result.sentinels.total());
    }
    print_outputs(&[&result.output]);
}

pub fn print_study_summary(result: &StudyResult) {
    println!("Output: {}", result.output_dir.display());
    print_stage_summary(&result.diagnosis);
    print_stage_summary(&result.medication);
    print_outputs(&[&result.combined]);
    println!("Manifest: {}", result.manifest.display());
}

pub fn print_outputs(outputs: &[&TableOutput]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Path"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for output in outputs {
        table.add_row(vec![
            Cell::new(&output.name)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
            count_cell(output.rows),
            count_cell(output.columns),
            Cell::new(output.path.display()),
        ]);
    }
    println!("{table}");
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count).fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        Cell::new(count)
    }
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
        .set_width(140);
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
