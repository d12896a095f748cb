//! Genomic variant aggregation: raw sequencing inputs to per-patient
//! profiles.

use std::collections::{BTreeMap, BTreeSet};

use mirador_ingest::{ClusterRow, SequencingSettings};
use mirador_model::{
    ClusterAssignment, Diagnostic, DiagnosticKind, DiagnosticReport, GenomicProfile, PatientKey,
    SiteFrequencies, SiteVariation, VariantCall, VariantCallSet, VariantSite,
};
use mirador_transform::{IdentifierNormalizer, sample_identifier};
use tracing::{debug, info, info_span};

/// Sequencing inputs as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequencingData {
    pub calls: VariantCallSet,
    pub site_frequencies: Vec<SiteFrequencies>,
    /// `None` when no classification table is configured.
    pub clusters: Option<Vec<ClusterRow>>,
}

impl SequencingData {
    /// Reads every configured sequencing file.
    pub fn read(settings: &SequencingSettings) -> mirador_ingest::Result<Self> {
        let calls = mirador_ingest::read_variant_calls(&settings.variants)?;
        let site_frequencies = match &settings.sites {
            Some(path) => mirador_ingest::read_site_frequencies(path, &settings.af_sites)?,
            None => Vec::new(),
        };
        let clusters = settings
            .clusters
            .as_deref()
            .map(|path| {
                mirador_ingest::read_cluster_table(
                    path,
                    &settings.sample_column,
                    &settings.cluster_column,
                )
            })
            .transpose()?;
        Ok(Self {
            calls,
            site_frequencies,
            clusters,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSettings {
    /// Calls below this depth are dropped; `None` keeps every call.
    pub min_read_depth: Option<u32>,
}

/// Output of [`build_profiles`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenomicAggregate {
    pub profiles: BTreeMap<PatientKey, GenomicProfile>,
    /// Every site of the variant-call source, in file order.
    pub sites: Vec<VariantSite>,
    /// Cohort allele frequencies at the selected sites.
    pub variation: Vec<SiteVariation>,
}

struct SampleResolver<'a> {
    normalizer: &'a IdentifierNormalizer,
    cohort: &'a BTreeSet<PatientKey>,
    source: &'static str,
    reported_outside: BTreeSet<PatientKey>,
    /// Raw sample names already reported as unresolvable.
    reported_unmatched: BTreeSet<String>,
}

impl<'a> SampleResolver<'a> {
    fn new(normalizer: &'a IdentifierNormalizer, cohort: &'a BTreeSet<PatientKey>) -> Self {
        Self {
            normalizer,
            cohort,
            source: VARIANTS,
            reported_outside: BTreeSet::new(),
            reported_unmatched: BTreeSet::new(),
        }
    }

    /// Patient key of a raw sample name; warns once per name that fails.
    fn normalize(
        &mut self,
        sample: &str,
        diagnostics: &mut DiagnosticReport,
    ) -> Option<PatientKey> {
        match self.normalizer.normalize(sample_identifier(sample)) {
            Ok(key) => Some(key),
            Err(error) => {
                if self.reported_unmatched.insert(sample.to_string()) {
                    diagnostics.record(
                        Diagnostic::new(DiagnosticKind::UnmatchedSequencingSample, error.to_string())
                            .with_source(self.source)
                            .with_raw_value(sample),
                    );
                }
                None
            }
        }
    }

    /// Key of a cohort patient for a raw sample name; warns otherwise.
    fn resolve(&mut self, sample: &str, diagnostics: &mut DiagnosticReport) -> Option<PatientKey> {
        let key = self.normalize(sample, diagnostics)?;
        if self.normalizer.is_ignored(&key) {
            return None;
        }
        if !self.cohort.contains(&key) {
            if self.reported_outside.insert(key.clone()) {
                diagnostics.record(
                    Diagnostic::new(
                        DiagnosticKind::OutsideCohort,
                        "sequenced patient has no clinical record; profile dropped",
                    )
                    .with_source(self.source)
                    .with_patient(&key)
                    .with_raw_value(sample),
                );
            }
            return None;
        }
        Some(key)
    }
}

const VARIANTS: &str = "variants";
const SITES: &str = "sites";
const CLUSTERS: &str = "clusters";

/// Builds one profile per cohort patient present in the variant calls.
///
/// Samples that do not normalize, or normalize outside the cohort, are
/// reported and skipped. Calls below `min_read_depth` are dropped with a
/// warning; a missing depth counts as zero. Replicate samples of one patient
/// share a profile.
pub fn build_profiles(
    data: &SequencingData,
    cohort: &BTreeSet<PatientKey>,
    normalizer: &IdentifierNormalizer,
    settings: AggregationSettings,
    diagnostics: &mut DiagnosticReport,
) -> GenomicAggregate {
    let span = info_span!("genomics", samples = data.calls.samples.len());
    let _guard = span.enter();

    let mut resolver = SampleResolver::new(normalizer, cohort);
    let mut sample_keys: BTreeMap<&str, PatientKey> = BTreeMap::new();
    let mut profiles: BTreeMap<PatientKey, GenomicProfile> = BTreeMap::new();
    for sample in &data.calls.samples {
        if let Some(key) = resolver.resolve(sample, diagnostics) {
            profiles
                .entry(key.clone())
                .or_insert_with(|| GenomicProfile::new(key.clone()));
            sample_keys.insert(sample.as_str(), key);
        }
    }

    for call in &data.calls.calls {
        let Some(key) = sample_keys.get(call.sample.as_str()) else {
            continue;
        };
        let Some(profile) = profiles.get_mut(key) else {
            continue;
        };
        if let Some(min_depth) = settings.min_read_depth {
            let depth = call.support.depth.unwrap_or(0);
            if depth < min_depth {
                diagnostics.record(
                    Diagnostic::new(
                        DiagnosticKind::LowConfidenceCall,
                        format!("call at {} has depth {depth}, below {min_depth}", call.position),
                    )
                    .with_source(resolver.source)
                    .with_patient(key)
                    .with_field(format!("SNP{}", call.position))
                    .with_raw_value(depth.to_string()),
                );
                profile.low_confidence_sites.insert(call.position);
                continue;
            }
        }
        profile.calls.push(VariantCall {
            key: key.clone(),
            position: call.position,
            reference: call.reference.clone(),
            alternates: call.alternates.clone(),
            support: call.support,
        });
    }
    for profile in profiles.values_mut() {
        profile
            .calls
            .sort_by(|a, b| (a.position, &a.alternates).cmp(&(b.position, &b.alternates)));
        profile
            .calls
            .dedup_by(|a, b| a.position == b.position && a.alternates == b.alternates);
        let called: BTreeSet<u64> = profile.calls.iter().map(|call| call.position).collect();
        profile
            .low_confidence_sites
            .retain(|position| !called.contains(position));
    }

    if let Some(rows) = &data.clusters {
        resolver.source = CLUSTERS;
        assign_clusters(&mut profiles, rows, &mut resolver, diagnostics);
    }

    resolver.source = SITES;
    let mut variation = Vec::with_capacity(data.site_frequencies.len());
    for site in &data.site_frequencies {
        let mut frequencies = BTreeMap::new();
        for (sample, frequency) in &site.frequencies {
            let Some(key) = resolver.resolve(sample, diagnostics) else {
                continue;
            };
            match profiles.get_mut(&key) {
                Some(profile) => {
                    profile.allele_frequencies.insert(site.position, *frequency);
                    frequencies.insert(key, *frequency);
                }
                None => debug!(patient = %key, position = site.position, "frequency without variant calls"),
            }
        }
        variation.push(SiteVariation {
            position: site.position,
            reference: site.reference.clone(),
            alternates: site.alternates.clone(),
            frequencies,
        });
    }

    info!(
        profiles = profiles.len(),
        sites = data.calls.sites.len(),
        af_sites = variation.len(),
        "built genomic profiles"
    );
    GenomicAggregate {
        profiles,
        sites: data.calls.sites.clone(),
        variation,
    }
}

fn assign_clusters(
    profiles: &mut BTreeMap<PatientKey, GenomicProfile>,
    rows: &[ClusterRow],
    resolver: &mut SampleResolver<'_>,
    diagnostics: &mut DiagnosticReport,
) {
    let mut codes: BTreeMap<PatientKey, &str> = BTreeMap::new();
    for row in rows {
        if let Some(key) = resolver.normalize(&row.sample, diagnostics) {
            codes.insert(key, row.code.as_str());
        }
    }

    for (key, profile) in profiles.iter_mut() {
        let code = codes.get(key).copied();
        match code.and_then(ClusterAssignment::from_classification) {
            Some(assignment) => profile.cluster = Some(assignment),
            None => {
                let mut diagnostic = Diagnostic::new(
                    DiagnosticKind::UnclassifiedCluster,
                    match code {
                        Some(_) => "cluster code not recognized",
                        None => "patient missing from the cluster classification",
                    },
                )
                .with_source(CLUSTERS)
                .with_patient(key)
                .with_field("CLUST");
                if let Some(code) = code {
                    diagnostic = diagnostic.with_raw_value(code);
                }
                diagnostics.record(diagnostic);
                profile.cluster = Some(ClusterAssignment::unclassified());
            }
        }
    }
}
