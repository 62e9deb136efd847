// src/data_handling/sources.rs
// -----------------------------------------------------------------------------
// Maps (energy, signal, analysis) to the sample a line reads from, either from
// an explicit "-i" list or generated from the base directory naming scheme:
//   <basedir>/<energy tag>-<sig><sig>-<energy>-50k-<analysis>
// -----------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::debug;

use crate::models::Domains;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub signal: String,
    pub path: PathBuf,
    pub energy: String,
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.path.display(), self.signal, self.energy)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    files: Vec<SourceFile>,
}

impl SourceIndex {
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Parse `"signal,path,energy;signal,path,energy;..."`.
    pub fn parse(list: &str) -> Result<Self> {
        let mut files = Vec::new();
        for entry in list.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
            let [signal, path, energy] = parts.as_slice() else {
                bail!("input entry '{entry}' must be 'signal,path,energy'");
            };
            files.push(SourceFile {
                signal: signal.to_string(),
                path: PathBuf::from(*path),
                energy: energy.to_string(),
            });
        }
        Ok(Self { files })
    }

    /// One sample per analysis, signal and energy under `base`.
    pub fn generate(
        base: &Path,
        domains: &Domains,
        energy_tags: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut files = Vec::new();
        for analysis in &domains.analyses {
            for signal in &domains.signals {
                for energy in &domains.energies {
                    let Some(tag) = energy_tags.get(energy) else {
                        bail!("no file tag known for energy category '{energy}'");
                    };
                    let name = format!("{tag}-{signal}{signal}-{energy}-50k-{analysis}");
                    files.push(SourceFile {
                        signal: signal.clone(),
                        path: base.join(name),
                        energy: energy.clone(),
                    });
                }
            }
        }
        debug!("generated {} sample paths under {}", files.len(), base.display());
        Ok(Self { files })
    }

    /// First sample listed for `energy` whose path mentions the signal, energy
    /// and analysis.
    ///
    /// The listed signal itself is never compared, so a sample registered under
    /// another signal is still picked when its path contains `signal`.
    pub fn find(&self, energy: &str, signal: &str, analysis: &str) -> Option<&SourceFile> {
        self.files.iter().find(|file| {
            if file.energy != energy {
                return false;
            }
            let name = file.path.to_string_lossy();
            name.contains(signal) && name.contains(energy) && name.contains(analysis)
        })
    }
}
