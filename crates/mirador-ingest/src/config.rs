//! Study configuration (`mirador.toml`).
//!
//! The study file declares the sources, their column mappings, the
//! canonical schema and the optional sequencing inputs. Relative paths are
//! resolved against the directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mirador_model::{
    CanonicalField, CodeLabel, Coercion, DEFAULT_DATE_FORMAT, DEFAULT_MIN_DIGITS, FieldType,
    IdentifierRules, LinkageError, MappingTable, PipelineOptions, Schema, SourceKind,
    SourceName, Transform,
};
use serde::Deserialize;
use tracing::info;

use crate::error::{IngestError, Result};
use crate::loader::SourceSpec;

pub const DEFAULT_KEY_COLUMN: &str = "GID";
pub const DEFAULT_MISSING: &str = "\\N";

fn default_title() -> String {
    "Mirador dataset".to_string()
}

fn default_key_column() -> String {
    DEFAULT_KEY_COLUMN.to_string()
}

fn default_missing() -> String {
    DEFAULT_MISSING.to_string()
}

fn default_min_digits() -> usize {
    DEFAULT_MIN_DIGITS
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

fn default_sample_column() -> String {
    "sample".to_string()
}

fn default_cluster_column() -> String {
    "classification".to_string()
}

/// `[dataset]`: naming of the assembled table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSettings {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Text written for absent values in Mirador data files.
    #[serde(default = "default_missing")]
    pub missing: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            key_column: default_key_column(),
            missing: default_missing(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentifiersSection {
    #[serde(default = "default_min_digits")]
    min_digits: usize,
    #[serde(default)]
    prefix_aliases: BTreeMap<String, String>,
    #[serde(default)]
    ignore: Vec<String>,
}

impl Default for IdentifiersSection {
    fn default() -> Self {
        Self {
            min_digits: DEFAULT_MIN_DIGITS,
            prefix_aliases: BTreeMap::new(),
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CoercionKind {
    Numeric,
    Categorical,
    Date,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnSection {
    column: String,
    field: String,
    /// Defaults to the coercion of the target field's type.
    coerce: Option<CoercionKind>,
    #[serde(default)]
    lookup: BTreeMap<String, String>,
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceSection {
    name: String,
    path: PathBuf,
    id_column: String,
    #[serde(default)]
    kind: SourceKind,
    #[serde(default = "default_true")]
    cohort: bool,
    #[serde(default = "default_delimiter")]
    delimiter: char,
    #[serde(default)]
    columns: Vec<ColumnSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSection {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    label: Option<String>,
    group: Option<String>,
    table: Option<String>,
    #[serde(default)]
    priority: Vec<String>,
    transform: Option<Transform>,
    /// Name of the series source feeding this field.
    series: Option<String>,
    #[serde(default)]
    summary: bool,
    #[serde(default)]
    codes: Vec<CodeLabel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SequencingSection {
    variants: PathBuf,
    sites: Option<PathBuf>,
    clusters: Option<PathBuf>,
    #[serde(default = "default_sample_column")]
    sample_column: String,
    #[serde(default = "default_cluster_column")]
    cluster_column: String,
    min_read_depth: Option<u32>,
    #[serde(default)]
    af_sites: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct StudyFile {
    #[serde(default)]
    dataset: DatasetSettings,
    #[serde(default)]
    options: PipelineOptions,
    #[serde(default)]
    identifiers: IdentifiersSection,
    #[serde(default)]
    sources: Vec<SourceSection>,
    #[serde(default)]
    fields: Vec<FieldSection>,
    sequencing: Option<SequencingSection>,
}

/// Sequencing inputs with resolved paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencingSettings {
    pub variants: PathBuf,
    pub sites: Option<PathBuf>,
    pub clusters: Option<PathBuf>,
    pub sample_column: String,
    pub cluster_column: String,
    /// Calls below this depth are dropped; `None` keeps every call.
    pub min_read_depth: Option<u32>,
    /// Sites whose allele frequencies become `AF<pos>` columns.
    pub af_sites: Vec<u64>,
}

/// A validated study configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Study {
    /// Directory relative paths were resolved against.
    pub root: PathBuf,
    pub dataset: DatasetSettings,
    pub options: PipelineOptions,
    pub identifiers: IdentifierRules,
    pub sources: Vec<SourceSpec>,
    /// Declared schema; series fields are expanded once data is mapped.
    pub schema: Schema,
    pub sequencing: Option<SequencingSettings>,
}

impl Study {
    pub fn source(&self, name: &SourceName) -> Option<&SourceSpec> {
        self.sources.iter().find(|source| &source.name == name)
    }

    /// Source names in configuration order.
    pub fn source_order(&self) -> Vec<SourceName> {
        self.sources.iter().map(|source| source.name.clone()).collect()
    }
}

/// Reads and validates a study file.
pub fn load_study_config(path: &Path) -> Result<Study> {
    let contents = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let study = parse_study_config(&contents, path)?;
    info!(
        path = %path.display(),
        sources = study.sources.len(),
        fields = study.schema.len(),
        sequencing = study.sequencing.is_some(),
        "loaded study configuration"
    );
    Ok(study)
}

/// Parses and validates study TOML read from `path`.
///
/// Relative paths inside the study resolve against the parent of `path`.
pub fn parse_study_config(contents: &str, path: &Path) -> Result<Study> {
    let file: StudyFile = toml::from_str(contents).map_err(|source| IngestError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    resolve_study(file, &root)
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn invalid(message: impl Into<String>) -> IngestError {
    IngestError::InvalidConfig(message.into())
}

fn resolve_study(file: StudyFile, root: &Path) -> Result<Study> {
    if file.sources.is_empty() {
        return Err(invalid("at least one [[sources]] entry is required"));
    }

    let mut kinds: BTreeMap<SourceName, SourceKind> = BTreeMap::new();
    for section in &file.sources {
        let name = SourceName::new(section.name.as_str())?;
        if kinds.insert(name.clone(), section.kind).is_some() {
            return Err(invalid(format!("source {name} is declared twice")));
        }
    }
    if !file.sources.iter().any(|section| section.cohort) {
        return Err(invalid("no source defines the cohort (all have cohort = false)"));
    }

    let schema = resolve_schema(&file.fields, &kinds)?;
    if schema.contains(&file.dataset.key_column) {
        return Err(invalid(format!(
            "key column {} clashes with a field of the same name",
            file.dataset.key_column
        )));
    }

    let sources = file
        .sources
        .into_iter()
        .map(|section| resolve_source(section, &schema, root))
        .collect::<Result<Vec<_>>>()?;

    let identifiers = file.identifiers;
    let rules = identifiers
        .prefix_aliases
        .into_iter()
        .fold(
            IdentifierRules::default().with_min_digits(identifiers.min_digits),
            |rules, (alias, canonical)| rules.with_alias(alias, canonical),
        );
    let rules = identifiers
        .ignore
        .into_iter()
        .fold(rules, IdentifierRules::with_ignored);

    let sequencing = file.sequencing.map(|section| SequencingSettings {
        variants: resolve_path(root, &section.variants),
        sites: section.sites.as_deref().map(|path| resolve_path(root, path)),
        clusters: section.clusters.as_deref().map(|path| resolve_path(root, path)),
        sample_column: section.sample_column,
        cluster_column: section.cluster_column,
        min_read_depth: section.min_read_depth,
        af_sites: section.af_sites,
    });
    if file.options.include_sequencing && sequencing.is_none() {
        return Err(invalid("include_sequencing requires a [sequencing] section"));
    }

    Ok(Study {
        root: root.to_path_buf(),
        dataset: file.dataset,
        options: file.options,
        identifiers: rules,
        sources,
        schema,
        sequencing,
    })
}

fn resolve_schema(
    sections: &[FieldSection],
    kinds: &BTreeMap<SourceName, SourceKind>,
) -> Result<Schema> {
    let known = |field: &str, source: &str| -> Result<SourceName> {
        let name = SourceName::new(source)?;
        if !kinds.contains_key(&name) {
            return Err(LinkageError::UnknownSource {
                field: field.to_string(),
                source_name: source.to_string(),
            }
            .into());
        }
        Ok(name)
    };

    let mut fields = Vec::with_capacity(sections.len());
    for section in sections {
        let mut field = match &section.series {
            Some(series) => {
                let source = known(&section.name, series)?;
                if kinds.get(&source) != Some(&SourceKind::Series) {
                    return Err(invalid(format!(
                        "field {} is fed by {source}, which is not a series source",
                        section.name
                    )));
                }
                if !section.priority.is_empty() {
                    return Err(invalid(format!(
                        "series field {} takes its source from `series`, not `priority`",
                        section.name
                    )));
                }
                CanonicalField::series(
                    section.name.as_str(),
                    section.field_type,
                    source,
                    section.summary,
                )
            }
            None => {
                if section.summary {
                    return Err(invalid(format!(
                        "field {} sets summary without a series source",
                        section.name
                    )));
                }
                let priority = section
                    .priority
                    .iter()
                    .map(|source| known(&section.name, source))
                    .collect::<Result<Vec<_>>>()?;
                CanonicalField::new(section.name.as_str(), section.field_type)
                    .with_priority(priority)
            }
        };
        if let Some(transform) = section.transform {
            if section.field_type != FieldType::Numeric {
                return Err(invalid(format!(
                    "transform on non-numeric field {}",
                    section.name
                )));
            }
            field = field.with_transform(transform);
        }
        field.label = section.label.clone();
        field.group = section.group.clone();
        field.table = section.table.clone();
        field.codes = section.codes.clone();
        fields.push(field);
    }
    Ok(Schema::new(fields)?)
}

fn resolve_source(section: SourceSection, schema: &Schema, root: &Path) -> Result<SourceSpec> {
    let name = SourceName::new(section.name.as_str())?;
    if !section.delimiter.is_ascii() {
        return Err(invalid(format!(
            "source {name}: delimiter {:?} is not an ASCII character",
            section.delimiter
        )));
    }

    let mut mapping = MappingTable::new(name.clone());
    for column in section.columns {
        let field = schema
            .field(&column.field)
            .ok_or_else(|| LinkageError::UnknownField {
                source_name: name.to_string(),
                field: column.field.clone(),
            })?;
        let kind = column.coerce.unwrap_or(match field.field_type {
            FieldType::Numeric => CoercionKind::Numeric,
            FieldType::Categorical => CoercionKind::Categorical,
            FieldType::Date => CoercionKind::Date,
            FieldType::Text => CoercionKind::Text,
        });
        if !column.lookup.is_empty() && kind != CoercionKind::Categorical {
            return Err(invalid(format!(
                "source {name}: lookup on non-categorical column {:?}",
                column.column
            )));
        }
        let coercion = match kind {
            CoercionKind::Numeric => Coercion::Numeric,
            CoercionKind::Categorical => Coercion::Categorical {
                lookup: column.lookup,
            },
            CoercionKind::Date => {
                Coercion::date(column.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT))
            }
            CoercionKind::Text => Coercion::Text,
        };
        mapping = mapping.with_column(column.column, column.field, coercion);
    }

    Ok(SourceSpec {
        path: resolve_path(root, &section.path),
        id_column: section.id_column,
        kind: section.kind,
        cohort: section.cohort,
        delimiter: section.delimiter as u8,
        mapping,
        name,
    })
}
