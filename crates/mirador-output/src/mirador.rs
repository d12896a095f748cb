//! Mirador dataset folder: data, dictionary, group hierarchy and project file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirador_model::Dataset;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use tracing::{debug, info};

use crate::common::{MIRADOR_MISSING, ensure_output_dir, mirador_ranges, mirador_type};

pub const DATA_FILE: &str = "data.csv";
pub const DICTIONARY_FILE: &str = "dictionary.csv";
pub const GROUPS_FILE: &str = "groups.xml";
pub const PROJECT_FILE: &str = "config.mira";

/// Options for the Mirador folder.
#[derive(Debug, Clone)]
pub struct MiradorOptions {
    pub title: String,
    /// Text written for absent values.
    pub missing: String,
}

impl Default for MiradorOptions {
    fn default() -> Self {
        Self {
            title: "Mirador dataset".to_string(),
            missing: MIRADOR_MISSING.to_string(),
        }
    }
}

/// Paths written by [`write_mirador_folder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiradorFiles {
    pub data: PathBuf,
    pub dictionary: PathBuf,
    pub groups: PathBuf,
    pub project: PathBuf,
}

/// Writes the four files of a Mirador dataset into `dir`.
pub fn write_mirador_folder(
    dir: &Path,
    dataset: &Dataset,
    options: &MiradorOptions,
) -> Result<MiradorFiles> {
    let dir = ensure_output_dir(dir)?;
    let files = MiradorFiles {
        data: dir.join(DATA_FILE),
        dictionary: dir.join(DICTIONARY_FILE),
        groups: dir.join(GROUPS_FILE),
        project: dir.join(PROJECT_FILE),
    };
    write_data(&files.data, dataset, &options.missing)?;
    write_dictionary(&files.dictionary, dataset)?;
    write_groups(&files.groups, dataset)?;
    write_project(&files.project, options)?;
    info!(
        dir = %dir.display(),
        rows = dataset.len(),
        columns = dataset.columns.len(),
        "wrote mirador dataset"
    );
    Ok(files)
}

/// Short-name header, then one row per patient; absent values become
/// `missing`.
pub fn write_data(path: &Path, dataset: &Dataset, missing: &str) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer
        .write_record(dataset.column_names())
        .with_context(|| format!("write {}", path.display()))?;
    for row in &dataset.rows {
        let cells = row
            .values
            .iter()
            .map(|value| value.render().unwrap_or_else(|| missing.to_string()));
        writer
            .write_record(cells)
            .with_context(|| format!("write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    debug!(path = %path.display(), "wrote data");
    Ok(())
}

/// One `title,type[,ranges]` line per column, in column order.
pub fn write_dictionary(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    for column in &dataset.columns {
        let mut record = vec![column.label.clone(), mirador_type(column).to_string()];
        if let Some(ranges) = mirador_ranges(column) {
            record.push(ranges);
        }
        writer
            .write_record(&record)
            .with_context(|| format!("write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Groups and tables in order of first appearance, each with its columns.
fn hierarchy(dataset: &Dataset) -> Vec<(&str, Vec<(&str, Vec<&str>)>)> {
    let mut groups: Vec<(&str, Vec<(&str, Vec<&str>)>)> = Vec::new();
    for column in &dataset.columns {
        let group_index = match groups.iter().position(|(name, _)| *name == column.group) {
            Some(index) => index,
            None => {
                groups.push((column.group.as_str(), Vec::new()));
                groups.len() - 1
            }
        };
        let tables = &mut groups[group_index].1;
        match tables.iter_mut().find(|(name, _)| *name == column.table) {
            Some((_, variables)) => variables.push(column.name.as_str()),
            None => tables.push((column.table.as_str(), vec![column.name.as_str()])),
        }
    }
    groups
}

/// Writes the group/table/variable hierarchy.
pub fn write_groups(path: &Path, dataset: &Dataset) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut xml = Writer::new_with_indent(BufWriter::new(file), b' ', 1);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    xml.write_event(Event::Start(BytesStart::new("data")))?;
    for (group, tables) in hierarchy(dataset) {
        let mut group_start = BytesStart::new("group");
        group_start.push_attribute(("name", group));
        xml.write_event(Event::Start(group_start))?;
        for (table, variables) in tables {
            let mut table_start = BytesStart::new("table");
            table_start.push_attribute(("name", table));
            xml.write_event(Event::Start(table_start))?;
            for variable in variables {
                let mut element = BytesStart::new("variable");
                element.push_attribute(("name", variable));
                xml.write_event(Event::Empty(element))?;
            }
            xml.write_event(Event::End(BytesEnd::new("table")))?;
        }
        xml.write_event(Event::End(BytesEnd::new("group")))?;
    }
    xml.write_event(Event::End(BytesEnd::new("data")))?;
    xml.get_mut()
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// `key=value` project file pointing at the other three files.
pub fn write_project(path: &Path, options: &MiradorOptions) -> Result<()> {
    let contents = format!(
        "project.title={}\ndata.source={DATA_FILE}\ndata.dictionary={DICTIONARY_FILE}\ndata.groups={GROUPS_FILE}\nmissing.string={}\n",
        options.title, options.missing
    );
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
