use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::helper_functions::read_csv;
use crate::models::polars_err;

/// A sample holding one table per tree.
pub trait DataSource {
    /// Values of `variable` in `tree`, each divided by `weight` when given.
    /// Entries with a missing value or weight are skipped.
    fn extract_series(
        &mut self,
        tree: &str,
        variable: &str,
        weight: Option<&str>,
    ) -> PolarsResult<Vec<f64>>;
}

pub trait SourceOpener {
    type Source: DataSource;

    fn open(&self, path: &Path) -> PolarsResult<Self::Source>;
}

/// Sample directory with one `t_<tree>.csv` per tree, read on first use.
pub struct CsvTreeSource {
    root: PathBuf,
    trees: HashMap<String, DataFrame>,
}

impl CsvTreeSource {
    pub fn open(root: &Path) -> PolarsResult<Self> {
        if !root.is_dir() {
            return Err(polars_err(
                format!("sample directory {} does not exist", root.display()).into(),
            ));
        }
        info!("Opening sample {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            trees: HashMap::new(),
        })
    }

    pub fn tree_path(&self, tree: &str) -> PathBuf {
        self.root.join(format!("t_{tree}.csv"))
    }

    fn tree(&mut self, tree: &str) -> PolarsResult<&DataFrame> {
        if !self.trees.contains_key(tree) {
            let path = self.tree_path(tree);
            debug!("Reading tree {} from {}", tree, path.display());
            let df = read_csv(&path)?;
            self.trees.insert(tree.to_string(), df);
        }
        Ok(&self.trees[tree])
    }
}

impl DataSource for CsvTreeSource {
    fn extract_series(
        &mut self,
        tree: &str,
        variable: &str,
        weight: Option<&str>,
    ) -> PolarsResult<Vec<f64>> {
        let df = self.tree(tree)?;
        let raw = df.column(variable)?.cast(&DataType::Float64)?;
        let values = raw.f64()?;

        let series = match weight {
            Some(weight) => {
                let raw_weights = df.column(weight)?.cast(&DataType::Float64)?;
                let weights = raw_weights.f64()?;
                values
                    .into_iter()
                    .zip(weights.into_iter())
                    .filter_map(|(v, w)| Some(v? / w?))
                    .collect()
            }
            None => values.into_iter().flatten().collect(),
        };
        Ok(series)
    }
}

pub struct CsvOpener;

impl SourceOpener for CsvOpener {
    type Source = CsvTreeSource;

    fn open(&self, path: &Path) -> PolarsResult<CsvTreeSource> {
        CsvTreeSource::open(path)
    }
}
