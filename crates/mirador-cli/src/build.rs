//! The `build` command without its terminal output: run a study, write the
//! requested files and report what was written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirador_core::{PipelineOutput, run_study};
use mirador_ingest::{Study, load_study_config};
use mirador_model::{DiagnosticReport, PipelineOptions};
use mirador_output::{
    FlatCsvOptions, MiradorFiles, MiradorOptions, SpssFiles, ensure_parent_dir,
    write_flat_csv, write_mirador_folder, write_spss_outputs,
};
use tracing::{info, info_span, warn};

pub const WARNINGS_FILE: &str = "warnings.json";

/// What to build and where to put it.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub config: PathBuf,
    /// Switches sequencing on even when the study leaves it off.
    pub include_sequencing: bool,
    /// Switches the viral load log transform on.
    pub log_transform: bool,
    /// Mirador folder; `<config dir>/mirador` when unset.
    pub output_dir: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub spss: Option<PathBuf>,
    /// Overrides the study's missing-value string.
    pub missing: Option<String>,
    /// Null text of the flat CSV; empty when unset.
    pub csv_null: Option<String>,
    pub dry_run: bool,
    /// Dropped records make the run fail.
    pub strict: bool,
}

/// Files written by a build; all unset on a dry run.
#[derive(Debug, Clone, Default)]
pub struct WrittenFiles {
    pub mirador: Option<MiradorFiles>,
    pub warnings: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub spss: Option<SpssFiles>,
}

#[derive(Debug)]
pub struct BuildResult {
    pub title: String,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub fingerprint: String,
    pub files: WrittenFiles,
    pub output: PipelineOutput,
    pub strict: bool,
}

impl BuildResult {
    /// Process exit code: 2 when a strict run dropped records, else 0.
    pub fn exit_code(&self) -> i32 {
        if self.strict && self.output.stats.dropped_records > 0 {
            2
        } else {
            0
        }
    }
}

/// Study options with the command-line switches folded in.
pub fn effective_options(study: &Study, request: &BuildRequest) -> PipelineOptions {
    PipelineOptions {
        include_sequencing: study.options.include_sequencing || request.include_sequencing,
        log_transform_viral_load: study.options.log_transform_viral_load
            || request.log_transform,
    }
}

/// Loads the study, runs the pipeline and writes the outputs.
///
/// Fatal pipeline errors return before any file is created.
pub fn build_dataset(request: &BuildRequest) -> Result<BuildResult> {
    let study = load_study(&request.config)?;
    let span = info_span!("build", title = %study.dataset.title, dry_run = request.dry_run);
    let _guard = span.enter();

    let options = effective_options(&study, request);
    let output = run_study(&study, &options).context("run pipeline")?;
    let fingerprint = output.dataset.fingerprint();
    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| study.root.join("mirador"));
    let missing = request
        .missing
        .clone()
        .unwrap_or_else(|| study.dataset.missing.clone());

    let mut files = WrittenFiles::default();
    if request.dry_run {
        info!("dry run, no files written");
    } else {
        let mirador = MiradorOptions {
            title: study.dataset.title.clone(),
            missing: missing.clone(),
        };
        files.mirador = Some(write_mirador_folder(&output_dir, &output.dataset, &mirador)?);
        let warnings = output_dir.join(WARNINGS_FILE);
        write_warnings(&warnings, &output.diagnostics)?;
        files.warnings = Some(warnings);
        if let Some(path) = &request.csv {
            let flat = FlatCsvOptions {
                null_string: request.csv_null.clone().unwrap_or_default(),
            };
            write_flat_csv(path, &output.dataset, &flat)?;
            files.csv = Some(path.clone());
        }
        if let Some(path) = &request.spss {
            files.spss = Some(write_spss_outputs(path, &output.dataset, &missing)?);
        }
    }
    if !output.diagnostics.is_empty() {
        warn!(count = output.diagnostics.len(), "run finished with warnings");
    }

    Ok(BuildResult {
        title: study.dataset.title.clone(),
        output_dir,
        dry_run: request.dry_run,
        fingerprint,
        files,
        output,
        strict: request.strict,
    })
}

/// Writes the diagnostic report as pretty-printed JSON.
pub fn write_warnings(path: &Path, report: &DiagnosticReport) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("write {}", path.display()))?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Loads a study file for commands that only inspect it.
pub fn load_study(config: &Path) -> Result<Study> {
    load_study_config(config).with_context(|| format!("load study {}", config.display()))
}
