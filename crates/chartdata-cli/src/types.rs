use std::path::PathBuf;

use chartdata_aggregate::AggregationSummary;

#[derive(Debug)]
pub struct RunResult {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub rows: usize,
    pub columns: usize,
    pub entities: usize,
    pub synthetic_entities: usize,
    pub hidden_rows: usize,
    pub regions: AggregationSummary,
    pub derived: Vec<String>,
    pub skipped: Vec<String>,
}
