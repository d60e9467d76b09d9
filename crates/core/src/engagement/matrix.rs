use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::FactorizationConfig;
use crate::domain::interaction::{ClickEvent, DwellEvent};
use crate::errors::ConfigurationError;
use crate::quality::{DataQualityWarning, QualityReport};

/// Sparse `(session x item)` engagement matrix. Sessions and items are both
/// sorted lexicographically; item names are case-folded.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionMatrix {
    sessions: Vec<String>,
    items: Vec<String>,
    cells: BTreeMap<(usize, usize), f64>,
}

impl InteractionMatrix {
    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.sessions.len(), self.items.len())
    }

    pub fn nnz(&self) -> usize {
        self.cells.len()
    }

    /// Percentage of cells without an observation.
    pub fn sparsity(&self) -> f64 {
        let (rows, columns) = self.shape();
        if rows == 0 || columns == 0 {
            return 100.0;
        }
        100.0 * (1.0 - self.nnz() as f64 / (rows * columns) as f64)
    }

    pub fn get(&self, session: &str, item: &str) -> Option<f64> {
        let row = self.sessions.binary_search_by(|candidate| candidate.as_str().cmp(session)).ok()?;
        let column = self.items.binary_search_by(|candidate| candidate.as_str().cmp(item)).ok()?;
        self.cells.get(&(row, column)).copied()
    }

    /// Observed `(item, value)` pairs per session row.
    pub fn session_rows(&self) -> Vec<Vec<(usize, f64)>> {
        let mut rows = vec![Vec::new(); self.sessions.len()];
        for (&(session, item), &value) in &self.cells {
            rows[session].push((item, value));
        }
        rows
    }

    /// Observed `(session, value)` pairs per item row, i.e. the transpose.
    pub fn item_rows(&self) -> Vec<Vec<(usize, f64)>> {
        let mut rows = vec![Vec::new(); self.items.len()];
        for (&(session, item), &value) in &self.cells {
            rows[item].push((session, value));
        }
        rows
    }
}

#[derive(Clone, Debug)]
pub struct MatrixBuilder {
    click_weight: f64,
    min_dwell_records: usize,
}

impl MatrixBuilder {
    pub fn new(config: &FactorizationConfig) -> Self {
        Self { click_weight: config.click_weight, min_dwell_records: config.min_dwell_records }
    }

    /// Cell value is the summed dwell seconds of that session on that item plus
    /// the item's global click bonus. Rows that fail to join are dropped, and the
    /// dwell minimum applies both before and after the join.
    pub fn build(
        &self,
        dwell: &[DwellEvent],
        clicks: &[ClickEvent],
        report: &mut QualityReport,
    ) -> Result<InteractionMatrix, ConfigurationError> {
        if dwell.len() < self.min_dwell_records {
            return Err(ConfigurationError::InsufficientInteractions {
                found: dwell.len(),
                required: self.min_dwell_records,
            });
        }

        let sessions: Vec<String> = dwell
            .iter()
            .filter_map(|event| non_empty(event.session_id.as_deref()))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items: Vec<String> = dwell
            .iter()
            .filter_map(|event| non_empty(event.name.as_deref()))
            .chain(clicks.iter().filter_map(|event| non_empty(event.name.as_deref())))
            .map(str::to_lowercase)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let session_index: HashMap<&str, usize> =
            sessions.iter().enumerate().map(|(index, id)| (id.as_str(), index)).collect();
        let item_index: HashMap<&str, usize> =
            items.iter().enumerate().map(|(index, name)| (name.as_str(), index)).collect();

        let mut click_bonus: HashMap<usize, f64> = HashMap::new();
        for event in clicks {
            let Some(name) = non_empty(event.name.as_deref()) else { continue };
            let count = clamp_count(event.click_count, "clicks", name, report);
            if let Some(&column) = item_index.get(name.to_lowercase().as_str()) {
                *click_bonus.entry(column).or_insert(0.0) += count as f64 * self.click_weight;
            }
        }

        let mut cells: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut joined = 0usize;
        for event in dwell {
            let (Some(session), Some(name)) =
                (non_empty(event.session_id.as_deref()), non_empty(event.name.as_deref()))
            else {
                continue;
            };
            let key = name.to_lowercase();
            let (Some(&row), Some(&column)) =
                (session_index.get(session), item_index.get(key.as_str()))
            else {
                continue;
            };
            let dwell_ms = clamp_count(event.dwell_ms, "dwell", name, report);
            *cells.entry((row, column)).or_insert(0.0) += dwell_ms as f64 / 1000.0;
            joined += 1;
        }
        if joined < self.min_dwell_records {
            tracing::warn!(
                event_name = "engagement.matrix.refused",
                records = dwell.len(),
                joined,
                "too few dwell records carry both a session and an item"
            );
            return Err(ConfigurationError::InsufficientInteractions {
                found: joined,
                required: self.min_dwell_records,
            });
        }
        for (&(_, column), value) in cells.iter_mut() {
            *value += click_bonus.get(&column).copied().unwrap_or(0.0);
        }

        let matrix = InteractionMatrix { sessions, items, cells };
        tracing::info!(
            event_name = "engagement.matrix.built",
            sessions = matrix.sessions.len(),
            items = matrix.items.len(),
            nnz = matrix.nnz(),
            sparsity_pct = matrix.sparsity(),
            "interaction matrix built"
        );
        Ok(matrix)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn clamp_count(value: i64, source: &str, name: &str, report: &mut QualityReport) -> i64 {
    if value < 0 {
        report.record(DataQualityWarning::MalformedEvent {
            source: source.to_string(),
            reason: format!("negative value {value} for `{name}` treated as 0"),
        });
        return 0;
    }
    value
}
