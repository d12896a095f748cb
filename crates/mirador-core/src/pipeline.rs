//! Pipeline driver: sources in, one assembled dataset out.
//!
//! Stages run in a fixed order, each in its own span:
//!
//! 1. **link** - normalize identifiers and group records per source
//! 2. **map** - coerce cells onto canonical fields
//! 3. **expand** - size series fields to the deepest series
//! 4. **genomics** - build profiles for cohort patients (sequencing option)
//! 5. **merge** - resolve conflicts per field
//! 6. **assemble** - lay the records out as a table
//!
//! Fatal errors abort before a dataset exists; everything else lands in the
//! returned [`DiagnosticReport`].

use std::collections::{BTreeMap, BTreeSet};

use mirador_genomics::{AggregationSettings, GenomicPanel, SequencingData, build_profiles};
use mirador_ingest::{IngestError, Study};
use mirador_model::{
    Dataset, DiagnosticReport, IdentifierRules, LinkageError, MappingTable, PatientRecord,
    PipelineOptions, Schema, SourceKind, SourceName, SourceRecordSet,
};
use mirador_transform::{IdentifierNormalizer, link_source, map_source};
use serde::Serialize;
use tracing::{info, info_span};

use crate::assemble::assemble_dataset;
use crate::merge::{MergeSource, cohort_keys, merge_records};

/// One loaded source with its mapping.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub records: SourceRecordSet,
    pub mapping: MappingTable,
    /// Whether the source's patients define the cohort.
    pub cohort: bool,
}

/// Sequencing inputs and their aggregation settings.
#[derive(Debug, Clone)]
pub struct SequencingInput {
    pub data: SequencingData,
    pub settings: AggregationSettings,
}

/// Everything a run needs, already in memory.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Declared schema; series fields are expanded during the run.
    pub schema: Schema,
    pub identifiers: IdentifierRules,
    pub key_column: String,
    /// Sources in configuration order.
    pub sources: Vec<SourceInput>,
    pub sequencing: Option<SequencingInput>,
}

impl PipelineInput {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            identifiers: IdentifierRules::default(),
            key_column: mirador_ingest::DEFAULT_KEY_COLUMN.to_string(),
            sources: Vec::new(),
            sequencing: None,
        }
    }

    /// Adds a cohort-defining source.
    #[must_use]
    pub fn with_source(mut self, records: SourceRecordSet, mapping: MappingTable) -> Self {
        self.sources.push(SourceInput {
            records,
            mapping,
            cohort: true,
        });
        self
    }

    /// Adds a source that only enriches patients defined elsewhere.
    #[must_use]
    pub fn with_enrichment_source(mut self, records: SourceRecordSet, mapping: MappingTable) -> Self {
        self.sources.push(SourceInput {
            records,
            mapping,
            cohort: false,
        });
        self
    }

    #[must_use]
    pub fn with_identifiers(mut self, identifiers: IdentifierRules) -> Self {
        self.identifiers = identifiers;
        self
    }

    #[must_use]
    pub fn with_key_column(mut self, key_column: impl Into<String>) -> Self {
        self.key_column = key_column.into();
        self
    }

    #[must_use]
    pub fn with_sequencing(mut self, data: SequencingData, settings: AggregationSettings) -> Self {
        self.sequencing = Some(SequencingInput { data, settings });
        self
    }
}

/// Per-source counts of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub name: SourceName,
    pub kind: SourceKind,
    pub cohort: bool,
    /// Rows read.
    pub records: usize,
    /// Distinct patients after linkage.
    pub patients: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub sources: Vec<SourceStats>,
    pub patients: usize,
    pub columns: usize,
    pub genomic_profiles: usize,
    pub warnings: usize,
    pub dropped_records: usize,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dataset: Dataset,
    pub records: Vec<PatientRecord>,
    pub diagnostics: DiagnosticReport,
    pub stats: RunStats,
}

fn check_sources(input: &PipelineInput) -> Result<(), LinkageError> {
    let mut names = BTreeSet::new();
    for source in &input.sources {
        let name = &source.records.source;
        if !names.insert(name) {
            return Err(LinkageError::InvalidConfig(format!(
                "source {name} is given twice"
            )));
        }
        if &source.mapping.source != name {
            return Err(LinkageError::InvalidConfig(format!(
                "mapping of {} is attached to source {name}",
                source.mapping.source
            )));
        }
    }
    for field in input.schema.fields() {
        if let Some(unknown) = field.priority.iter().find(|source| !names.contains(source)) {
            return Err(LinkageError::UnknownSource {
                field: field.name.clone(),
                source_name: unknown.to_string(),
            });
        }
    }
    if input.schema.contains(&input.key_column) {
        return Err(LinkageError::InvalidConfig(format!(
            "key column {} clashes with a field of the same name",
            input.key_column
        )));
    }
    if !input.sources.iter().any(|source| source.cohort) {
        return Err(LinkageError::InvalidConfig(
            "at least one source must define the cohort".to_string(),
        ));
    }
    Ok(())
}

/// Runs every stage over in-memory inputs.
///
/// Sequencing inputs are used only when `options.include_sequencing` is set;
/// asking for sequencing without inputs is a configuration error.
pub fn run_pipeline(
    input: PipelineInput,
    options: &PipelineOptions,
) -> Result<PipelineOutput, LinkageError> {
    let span = info_span!(
        "pipeline",
        sources = input.sources.len(),
        sequencing = options.include_sequencing,
        log_transform = options.log_transform_viral_load
    );
    let _guard = span.enter();

    check_sources(&input)?;
    let sequencing = match (options.include_sequencing, input.sequencing) {
        (true, Some(sequencing)) => Some(sequencing),
        (true, None) => {
            return Err(LinkageError::InvalidConfig(
                "sequencing was requested but no sequencing inputs were given".to_string(),
            ));
        }
        (false, _) => None,
    };

    let mut diagnostics = DiagnosticReport::new();
    let normalizer = IdentifierNormalizer::new(input.identifiers);

    let mut source_stats = Vec::with_capacity(input.sources.len());
    let mut mapped = Vec::with_capacity(input.sources.len());
    for source in input.sources {
        let records = source.records.len();
        let linked = link_source(source.records, &normalizer, &mut diagnostics)?;
        source_stats.push(SourceStats {
            name: linked.source.clone(),
            kind: linked.kind,
            cohort: source.cohort,
            records,
            patients: linked.len(),
        });
        let result = map_source(
            &linked,
            &source.mapping,
            &input.schema,
            options,
            &mut diagnostics,
        )?;
        mapped.push((result, source.cohort));
    }

    let depths: BTreeMap<SourceName, usize> = mapped
        .iter()
        .filter(|(source, _)| source.kind == SourceKind::Series)
        .map(|(source, _)| (source.source.clone(), source.series_depth))
        .collect();
    let schema = {
        let _expand = info_span!("expand", series_sources = depths.len()).entered();
        input.schema.expand_series(&depths)?
    };

    let merge_sources: Vec<MergeSource<'_>> = mapped
        .iter()
        .map(|(source, cohort)| MergeSource {
            mapped: source,
            cohort: *cohort,
        })
        .collect();

    let (profiles, panel) = match &sequencing {
        Some(sequencing) => {
            let cohort = cohort_keys(&merge_sources);
            let aggregate = build_profiles(
                &sequencing.data,
                &cohort,
                &normalizer,
                sequencing.settings,
                &mut diagnostics,
            );
            let panel = GenomicPanel::from_aggregate(&aggregate);
            (aggregate.profiles, Some(panel))
        }
        None => (BTreeMap::new(), None),
    };
    let genomic_profiles = profiles.len();

    let records = merge_records(&schema, &merge_sources, profiles, &mut diagnostics);
    let dataset = assemble_dataset(
        &schema,
        &records,
        &input.key_column,
        panel.as_ref(),
        options,
    );

    let stats = RunStats {
        sources: source_stats,
        patients: dataset.len(),
        columns: dataset.columns.len(),
        genomic_profiles,
        warnings: diagnostics.len(),
        dropped_records: diagnostics.dropped_records(),
    };
    info!(
        patients = stats.patients,
        columns = stats.columns,
        warnings = stats.warnings,
        "pipeline finished"
    );
    Ok(PipelineOutput {
        dataset,
        records,
        diagnostics,
        stats,
    })
}

/// Reads every file a study names and runs the pipeline over it.
///
/// `options` replace the study's own `[options]`; callers fold command-line
/// switches in before calling.
pub fn run_study(study: &Study, options: &PipelineOptions) -> Result<PipelineOutput, IngestError> {
    let span = info_span!("study", title = %study.dataset.title);
    let _guard = span.enter();

    let mut input = PipelineInput::new(study.schema.clone())
        .with_identifiers(study.identifiers.clone())
        .with_key_column(study.dataset.key_column.clone());
    for spec in &study.sources {
        let records = spec.load()?;
        input = if spec.cohort {
            input.with_source(records, spec.mapping.clone())
        } else {
            input.with_enrichment_source(records, spec.mapping.clone())
        };
    }

    if options.include_sequencing {
        let settings = study.sequencing.as_ref().ok_or_else(|| {
            IngestError::InvalidConfig(
                "sequencing was requested but the study has no [sequencing] section".to_string(),
            )
        })?;
        let data = SequencingData::read(settings)?;
        input = input.with_sequencing(
            data,
            AggregationSettings {
                min_read_depth: settings.min_read_depth,
            },
        );
    }

    Ok(run_pipeline(input, options)?)
}
