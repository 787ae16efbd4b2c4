//! Per-run statistics and diagnostics.
//!
//! One [`MigrationReport`] belongs to one engine. Parallel batch workers each
//! own an engine/report pair and fold the results together with
//! [`MigrationReport::merge`]; nothing here is process-global.

use std::collections::BTreeMap;

use serde::Serialize;

/// Diagnostic counter topics the engine emits.
pub mod topic {
    /// Entities dropped by the admission policy.
    pub const INCOMPLETE_ENTITY: &str = "incomplete entity dropped";
    /// Fields whose tag has no mapping rules.
    pub const UNMAPPED_TAG: &str = "mappings not found for tag";
    /// Non-numeric tags encountered in records.
    pub const NON_NUMERIC_TAG: &str = "non-numeric tags in records";
    /// Linked-field replacements performed.
    pub const LINKED_FIELD: &str = "linked field replacements";
}

/// Tally for one destination property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DestinationTally {
    /// Records in which the property was mapped.
    pub mapped: u64,
    /// Records in which the property was mapped but held no usable value.
    pub empty: u64,
}

/// Tally for one source tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    /// Occurrences seen in the input.
    pub present: u64,
    /// Occurrences that produced mapped output.
    pub mapped: u64,
    /// Occurrences that produced nothing.
    pub empty: u64,
}

/// Statistics aggregate for one engine's run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    destination_fields: BTreeMap<String, DestinationTally>,
    source_fields: BTreeMap<String, SourceTally>,
    diagnostics: BTreeMap<String, BTreeMap<String, u64>>,
    records_processed: u64,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record's outcome for a destination property.
    pub fn record_destination(&mut self, property: &str, mapped: bool, empty: bool) {
        let tally = self
            .destination_fields
            .entry(property.to_string())
            .or_default();
        tally.mapped += u64::from(mapped);
        tally.empty += u64::from(empty);
    }

    /// Count one field occurrence for a source tag.
    pub fn record_source(&mut self, tag: &str, present: bool, mapped: bool, empty: bool) {
        let tally = self.source_fields.entry(tag.to_string()).or_default();
        tally.present += u64::from(present);
        tally.mapped += u64::from(mapped);
        tally.empty += u64::from(empty);
    }

    /// Increment a diagnostic counter under a topic.
    pub fn add_diagnostic(&mut self, topic: &str, measure: impl Into<String>) {
        *self
            .diagnostics
            .entry(topic.to_string())
            .or_default()
            .entry(measure.into())
            .or_default() += 1;
    }

    pub fn record_processed(&mut self) {
        self.records_processed += 1;
    }

    /// Per-destination-property tallies.
    pub fn destination_fields(&self) -> &BTreeMap<String, DestinationTally> {
        &self.destination_fields
    }

    /// Per-source-tag tallies.
    pub fn source_fields(&self) -> &BTreeMap<String, SourceTally> {
        &self.source_fields
    }

    /// Diagnostic counters: topic → measure → count.
    pub fn diagnostics(&self) -> &BTreeMap<String, BTreeMap<String, u64>> {
        &self.diagnostics
    }

    pub fn diagnostic_count(&self, topic: &str, measure: &str) -> u64 {
        self.diagnostics
            .get(topic)
            .and_then(|measures| measures.get(measure))
            .copied()
            .unwrap_or(0)
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed
    }

    /// Fold another worker's report into this one.
    pub fn merge(&mut self, other: MigrationReport) {
        for (property, tally) in other.destination_fields {
            let entry = self.destination_fields.entry(property).or_default();
            entry.mapped += tally.mapped;
            entry.empty += tally.empty;
        }
        for (tag, tally) in other.source_fields {
            let entry = self.source_fields.entry(tag).or_default();
            entry.present += tally.present;
            entry.mapped += tally.mapped;
            entry.empty += tally.empty;
        }
        for (topic, measures) in other.diagnostics {
            let entry = self.diagnostics.entry(topic).or_default();
            for (measure, count) in measures {
                *entry.entry(measure).or_default() += count;
            }
        }
        self.records_processed += other.records_processed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_accumulate() {
        let mut report = MigrationReport::new();
        report.record_destination("title", true, false);
        report.record_destination("title", true, true);
        report.record_destination("subjects", false, false);
        assert_eq!(
            report.destination_fields()["title"],
            DestinationTally { mapped: 2, empty: 1 }
        );
        assert_eq!(
            report.destination_fields()["subjects"],
            DestinationTally { mapped: 0, empty: 0 }
        );

        report.record_source("245", true, true, false);
        report.record_source("245", true, false, true);
        assert_eq!(
            report.source_fields()["245"],
            SourceTally {
                present: 2,
                mapped: 1,
                empty: 1
            }
        );
    }

    #[test]
    fn merge_sums_everything() {
        let mut a = MigrationReport::new();
        a.record_destination("title", true, false);
        a.record_source("245", true, true, false);
        a.add_diagnostic(topic::UNMAPPED_TAG, "999");
        a.record_processed();

        let mut b = MigrationReport::new();
        b.record_destination("title", true, false);
        b.record_destination("languages", true, false);
        b.add_diagnostic(topic::UNMAPPED_TAG, "999");
        b.add_diagnostic(topic::NON_NUMERIC_TAG, "LDR");
        b.record_processed();

        a.merge(b);
        assert_eq!(a.destination_fields()["title"].mapped, 2);
        assert_eq!(a.destination_fields()["languages"].mapped, 1);
        assert_eq!(a.diagnostic_count(topic::UNMAPPED_TAG, "999"), 2);
        assert_eq!(a.diagnostic_count(topic::NON_NUMERIC_TAG, "LDR"), 1);
        assert_eq!(a.records_processed(), 2);
    }
}
