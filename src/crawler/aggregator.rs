use crate::crawler::Record;

/// Accumulates records in arrival order
///
/// Records from page N always precede records from page N+1. No
/// deduplication is performed: two containers with identical values are
/// still two records.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    records: Vec<Record>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page's worth of records
    pub fn append<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let before = self.records.len();
        self.records.extend(records);
        tracing::debug!(
            "Aggregated {} records ({} total)",
            self.records.len() - before,
            self.records.len()
        );
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the aggregator, returning every record in arrival order
    pub fn finalize(self) -> Vec<Record> {
        self.records
    }
}
