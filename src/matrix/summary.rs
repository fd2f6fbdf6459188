//! Per-partition scalar summary of the distributed matrix.

/// Row, column and nonzero counts for one partition.
///
/// The `total_*` fields are global and replicated on every partition; the
/// remaining fields describe this partition only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixSummary {
    /// Max number of nonzero elements in any row.
    pub max_nonzeros_per_row: usize,
    /// Total number of matrix rows across all partitions.
    pub total_number_of_rows: usize,
    /// Total number of matrix nonzeros across all partitions.
    pub total_number_of_nonzeros: usize,
    /// Number of rows owned by this partition.
    pub local_number_of_rows: usize,
    /// Owned rows plus distinct externally referenced columns.
    pub local_number_of_columns: usize,
    pub local_number_of_nonzeros: usize,
    /// Number of column values pulled from neighbors.
    pub number_of_external_values: usize,
    /// Number of neighboring partitions this partition sends data to.
    pub number_of_send_neighbors: usize,
    /// Total number of entries to be sent.
    pub total_to_be_sent: usize,
}
