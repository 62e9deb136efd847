use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binning::{BinningResolver, BinningTable, OverrideTable};
use crate::cli::Args;
use crate::data_handling::sources::SourceIndex;
use crate::models::{Domains, WildcardToken};

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Trees and variables whose entries are divided by a weight column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeightRule {
    pub trees: Vec<String>,
    pub variables: Vec<String>,
    pub column: String,
}

impl Default for WeightRule {
    fn default() -> Self {
        Self {
            trees: vec!["t_tracks".into(), "t_tragam".into()],
            variables: [
                "j_mass",
                "j_mass_trim",
                "j_mass_sdb2",
                "j_mass_sdm1",
                "j_mass_prun",
                "j_mass_mmdt",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            column: "j_ptfrac".into(),
        }
    }
}

impl WeightRule {
    /// Weight column for `tree`/`variable`, `None` means unweighted.
    pub fn weight_for(&self, tree: &str, variable: &str) -> Option<&str> {
        let tree_key = format!("t_{tree}");
        let weighted = self.trees.iter().any(|t| *t == tree_key)
            && self.variables.iter().any(|v| v == variable);
        weighted.then_some(self.column.as_str())
    }
}

/// Display names and naming tags, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Catalog {
    pub tree_names: BTreeMap<String, String>,
    pub analysis_names: BTreeMap<String, String>,
    pub energy_names: BTreeMap<String, String>,
    pub energy_tags: BTreeMap<String, String>,
    pub weighting: WeightRule,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            tree_names: table(&[
                ("tracks", "tracks"),
                ("tragam", "tr+#gamma"),
                ("allpar", "all particles"),
            ]),
            analysis_names: table(&[
                ("r0_h0_e0", "perfect"),
                ("r05_h05_e005", "HCAL0.05"),
                ("r05_h01_e005", "HCAL0.01"),
                ("r05_h01_e005_t", "tracker deg."),
                ("r05_h002_e005_t", "high-res"),
            ]),
            energy_names: table(&[("pt1", "p_{T} 1 TeV"), ("pt5", "p_{T} 5 TeV")]),
            energy_tags: table(&[
                ("pt1", "processed-pythia82-lhc13"),
                ("pt5", "processed-pythia82-fcc100"),
            ]),
            weighting: WeightRule::default(),
        }
    }
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        let catalog = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        Ok(catalog)
    }

    fn display<'a>(names: &'a BTreeMap<String, String>, key: &'a str) -> &'a str {
        names.get(key).map(String::as_str).unwrap_or(key)
    }

    /// `"<sig> <tree>, <energy>, <ana>"` with display names where known.
    pub fn legend(&self, tree: &str, energy: &str, signal: &str, analysis: &str) -> String {
        format!(
            "{} {}, {}, {}",
            signal,
            Self::display(&self.tree_names, tree),
            Self::display(&self.energy_names, energy),
            Self::display(&self.analysis_names, analysis),
        )
    }
}

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub lines: String,
    pub variables: Vec<String>,
    pub domains: Domains,
    pub sources: SourceIndex,
    pub outdir: PathBuf,
    pub outname: String,
    pub log_plots: bool,
    pub catalog: Catalog,
    pub binning: BinningResolver,
}

pub fn split_csv(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let lines = match args.lines.as_deref().map(str::trim) {
            Some(lines) if !lines.is_empty() => lines.to_string(),
            _ => bail!("no lines specified, pass them with --lines"),
        };

        let domains = Domains {
            trees: split_csv(&args.trees),
            energies: split_csv(&args.energies),
            signals: split_csv(&args.signals),
            analyses: split_csv(&args.analyses),
        };
        for (index, values) in [
            &domains.trees,
            &domains.energies,
            &domains.signals,
            &domains.analyses,
        ]
        .into_iter()
        .enumerate()
        {
            if let Some(bad) = values.iter().find(|v| WildcardToken::is_token(v)) {
                bail!("{} list may not contain the wildcard '{bad}'", Domains::name_of(index));
            }
        }

        let catalog = match &args.catalog {
            Some(path) => {
                info!("Reading catalog from {}", path.display());
                Catalog::load(path)?
            }
            None => Catalog::default(),
        };

        let sources = if args.files.trim().is_empty() {
            SourceIndex::generate(&args.basedir, &domains, &catalog.energy_tags)?
        } else {
            SourceIndex::parse(&args.files)?
        };

        let overrides = if args.apply_bin_overrides {
            let table = OverrideTable::with_defaults()?;
            info!("Applying {} binning override rules", table.len());
            Some(table)
        } else {
            None
        };

        Ok(Self {
            lines,
            variables: split_csv(&args.variables),
            domains,
            sources,
            outdir: args.outdir.clone(),
            outname: args.outname.clone(),
            log_plots: !args.no_log_plots,
            catalog,
            binning: BinningResolver {
                table: BinningTable::default(),
                overrides,
            },
        })
    }
}
