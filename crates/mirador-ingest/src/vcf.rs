//! Minimal VCF reader for the sequencing inputs.
//!
//! Two files are read: the multi-sample variant calls (`GT`, `DP`, `AF`
//! sample keys) and the intra-host site variation file, of which only the
//! per-sample `AF` is used. Meta lines (`##`) are skipped; the `#CHROM`
//! header names the sample columns.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mirador_model::{ReadSupport, SampleCall, SiteFrequencies, VariantCallSet, VariantSite};
use tracing::debug;

use crate::error::{IngestError, Result};

const FIXED_COLUMNS: usize = 8;
const FORMAT_COLUMN: usize = 8;

/// One data line split into its fixed and per-sample parts.
struct VcfRecord<'a> {
    position: u64,
    reference: &'a str,
    alternates: Vec<String>,
    format: Vec<&'a str>,
    samples: Vec<&'a str>,
}

impl<'a> VcfRecord<'a> {
    fn sample_value(&self, sample: usize, key: &str) -> Option<&'a str> {
        let index = self.format.iter().position(|name| *name == key)?;
        let fields: &'a str = self.samples.get(sample).copied()?;
        fields
            .split(':')
            .nth(index)
            .filter(|value| !value.is_empty() && *value != ".")
    }
}

struct VcfReader<'p> {
    path: &'p Path,
    samples: Vec<String>,
}

impl<'p> VcfReader<'p> {
    fn error(&self, line: usize, message: impl Into<String>) -> IngestError {
        IngestError::Vcf {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    /// Walks `reader`, calling `visit` for every data line.
    fn read<R, F>(path: &'p Path, reader: R, mut visit: F) -> Result<Vec<String>>
    where
        R: BufRead,
        F: FnMut(&VcfRecord<'_>, &[String]),
    {
        let mut state = Self {
            path,
            samples: Vec::new(),
        };
        let mut header_seen = false;
        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line.map_err(|source| IngestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with("##") {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                let columns: Vec<&str> = header.split('\t').collect();
                if columns.first().copied() != Some("CHROM") || columns.len() < FIXED_COLUMNS {
                    return Err(state.error(number, "header line must start with #CHROM"));
                }
                state.samples = columns
                    .iter()
                    .skip(FORMAT_COLUMN + 1)
                    .map(|sample| sample.trim().to_string())
                    .collect();
                header_seen = true;
                continue;
            }
            if !header_seen {
                return Err(state.error(number, "data line before the #CHROM header"));
            }
            let record = state.parse_record(number, line)?;
            visit(&record, &state.samples);
        }
        if !header_seen {
            return Err(state.error(0, "missing #CHROM header"));
        }
        Ok(state.samples)
    }

    fn parse_record<'l>(&self, number: usize, line: &'l str) -> Result<VcfRecord<'l>> {
        let columns: Vec<&str> = line.split('\t').collect();
        let expected = if self.samples.is_empty() {
            FIXED_COLUMNS
        } else {
            FORMAT_COLUMN + 1 + self.samples.len()
        };
        if columns.len() < expected {
            return Err(self.error(
                number,
                format!("expected {expected} columns, found {}", columns.len()),
            ));
        }
        let position = columns[1]
            .trim()
            .parse::<u64>()
            .map_err(|_| self.error(number, format!("POS {:?} is not a number", columns[1])))?;
        let alternates = match columns[4].trim() {
            "" | "." => Vec::new(),
            alt => alt.split(',').map(str::to_string).collect(),
        };
        let (format, samples) = if self.samples.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                columns[FORMAT_COLUMN].split(':').collect(),
                columns[FORMAT_COLUMN + 1..].to_vec(),
            )
        };
        Ok(VcfRecord {
            position,
            reference: columns[3].trim(),
            alternates,
            format,
            samples,
        })
    }
}

/// Alternate alleles a `GT` value carries, in `ALT` order (`0|2` at `A,T`
/// gives `T`). Empty for reference or missing genotypes.
fn observed_alleles(genotype: &str, alternates: &[String]) -> Vec<String> {
    let mut indices: Vec<usize> = genotype
        .split(['/', '|'])
        .filter_map(|allele| allele.parse::<usize>().ok())
        .filter(|&allele| allele > 0)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
        .into_iter()
        .filter_map(|allele| alternates.get(allele - 1).cloned())
        .collect()
}

/// First number of a possibly comma-separated `AF` list.
fn parse_frequency(raw: &str) -> Option<f64> {
    raw.split(',')
        .next()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

pub fn parse_variant_calls<R: BufRead>(path: &Path, reader: R) -> Result<VariantCallSet> {
    let mut sites = Vec::new();
    let mut calls = Vec::new();
    let samples = VcfReader::read(path, reader, |record, samples| {
        sites.push(VariantSite {
            position: record.position,
            reference: record.reference.to_string(),
            alternates: record.alternates.clone(),
        });
        for (index, sample) in samples.iter().enumerate() {
            let Some(genotype) = record.sample_value(index, "GT") else {
                continue;
            };
            let alternates = observed_alleles(genotype, &record.alternates);
            if alternates.is_empty() {
                continue;
            }
            calls.push(SampleCall {
                sample: sample.clone(),
                position: record.position,
                reference: record.reference.to_string(),
                alternates,
                support: ReadSupport {
                    depth: record
                        .sample_value(index, "DP")
                        .and_then(|dp| dp.parse::<u32>().ok()),
                    alt_frequency: record.sample_value(index, "AF").and_then(parse_frequency),
                },
            });
        }
    })?;
    debug!(
        path = %path.display(),
        samples = samples.len(),
        sites = sites.len(),
        calls = calls.len(),
        "parsed variant calls"
    );
    Ok(VariantCallSet {
        samples,
        sites,
        calls,
    })
}

/// Reads the multi-sample variant-call VCF.
pub fn read_variant_calls(path: &Path) -> Result<VariantCallSet> {
    parse_variant_calls(path, open(path)?)
}

/// Parses per-sample allele frequencies, keeping only `sites` when given.
pub fn parse_site_frequencies<R: BufRead>(
    path: &Path,
    reader: R,
    sites: &[u64],
) -> Result<Vec<SiteFrequencies>> {
    let mut selected = Vec::new();
    VcfReader::read(path, reader, |record, samples| {
        if !sites.is_empty() && !sites.contains(&record.position) {
            return;
        }
        let frequencies = samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                let frequency = record.sample_value(index, "AF").and_then(parse_frequency)?;
                Some((sample.clone(), frequency))
            })
            .collect();
        selected.push(SiteFrequencies {
            position: record.position,
            reference: record.reference.to_string(),
            alternates: record.alternates.clone(),
            frequencies,
        });
    })?;
    Ok(selected)
}

/// Reads the site-variation VCF.
pub fn read_site_frequencies(path: &Path, sites: &[u64]) -> Result<Vec<SiteFrequencies>> {
    parse_site_frequencies(path, open(path)?, sites)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })
}
