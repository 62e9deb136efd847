//! Runs every (plot group, variable) pair: resolve binning, read the samples,
//! fill and normalize the histograms, then hand them to the renderer.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::analysis::histogram::Histogram;
use crate::analysis::overlay::{with_suffix, OverlayRenderer};
use crate::binning::OverrideContext;
use crate::config::RunConfig;
use crate::data_handling::columnar::{DataSource, SourceOpener};
use crate::models::PlotGroup;

/// `<outdir>/SummaryPlot_<outname>_<variable>` plus `_<value>` for every value the
/// fan-out pass substituted into the group.
pub fn output_prefix(outdir: &Path, outname: &str, variable: &str, group: &PlotGroup) -> PathBuf {
    let suffix: String = group.fan_out.iter().map(|value| format!("_{value}")).collect();
    outdir.join(format!("SummaryPlot_{outname}_{variable}{suffix}"))
}

/// Hands out `prefix`, or `prefix_2`, `prefix_3`, ... once it is taken.
fn claim_prefix(used: &mut HashSet<PathBuf>, prefix: PathBuf) -> PathBuf {
    if used.insert(prefix.clone()) {
        return prefix;
    }
    let mut n = 2;
    loop {
        let candidate = with_suffix(&prefix, &format!("_{n}"));
        if used.insert(candidate.clone()) {
            warn!(
                "{} is already written by another group, using {}",
                prefix.display(),
                candidate.display()
            );
            return candidate;
        }
        n += 1;
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub rendered: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: Vec<String>,
}

pub struct SummaryPlotter<'a, O: SourceOpener, R: OverlayRenderer> {
    pub config: &'a RunConfig,
    pub opener: O,
    pub renderer: R,
}

impl<'a, O: SourceOpener, R: OverlayRenderer> SummaryPlotter<'a, O, R> {
    pub fn new(config: &'a RunConfig, opener: O, renderer: R) -> Self {
        Self {
            config,
            opener,
            renderer,
        }
    }

    pub fn run(&self, groups: &[PlotGroup]) -> Result<RunReport> {
        create_dir_all(&self.config.outdir)
            .with_context(|| format!("creating {}", self.config.outdir.display()))?;

        let mut report = RunReport::default();
        let mut used = HashSet::new();
        for group in groups {
            for variable in &self.config.variables {
                let prefix = claim_prefix(
                    &mut used,
                    output_prefix(&self.config.outdir, &self.config.outname, variable, group),
                );
                info!("Plotting {} for {}", variable, group);

                match self.plot(group, variable, &prefix) {
                    Ok(Some(paths)) => report.rendered.extend(paths),
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        error!("Failed to plot {}: {:#}", prefix.display(), e);
                        report.failed.push(prefix.display().to_string());
                    }
                }
            }
        }
        Ok(report)
    }

    /// `Ok(None)` when the variable has no binning and nothing is drawn.
    fn plot(
        &self,
        group: &PlotGroup,
        variable: &str,
        prefix: &Path,
    ) -> Result<Option<Vec<PathBuf>>> {
        let Some(entry) = self.config.binning.table.lookup(variable) else {
            warn!("No binning known for variable {}, skipping", variable);
            return Ok(None);
        };

        let mut histograms = Vec::with_capacity(group.lines.len());
        let mut legends = Vec::with_capacity(group.lines.len());
        {
            // samples stay open for this group only
            let mut sources: HashMap<PathBuf, O::Source> = HashMap::new();

            for line in &group.lines {
                let (tree, energy, signal, analysis) = line.concrete().with_context(|| {
                    format!("line {line} is not a concrete tree,energy,signal,analysis tuple")
                })?;

                let ctx = OverrideContext {
                    signal: Some(signal),
                    energy: Some(energy),
                    tree: Some(tree),
                    variable: Some(variable),
                    ..Default::default()
                };
                let shape = self.config.binning.refine(entry.shape, &ctx);

                let file = self
                    .config
                    .sources
                    .find(energy, signal, analysis)
                    .with_context(|| {
                        format!(
                            "no sample for signal {signal}, energy {energy}, analysis {analysis}"
                        )
                    })?;

                let source = match sources.entry(file.path.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let opened = self
                            .opener
                            .open(&file.path)
                            .with_context(|| format!("opening {}", file))?;
                        e.insert(opened)
                    }
                };

                let weight = self.config.catalog.weighting.weight_for(tree, variable);
                let values = source
                    .extract_series(tree, variable, weight)
                    .with_context(|| format!("reading {variable} from tree {tree} of {}", file))?;

                let mut hist = Histogram::new(
                    format!("{variable}_{signal}_{energy}_{tree}"),
                    entry.axis_label,
                    shape,
                );
                hist.fill_all(&values);
                debug!(
                    "{}: {} entries, weight {:?}, integral {}, under/overflow {}/{}",
                    hist.name,
                    hist.entries(),
                    weight,
                    hist.integral(),
                    hist.underflow(),
                    hist.overflow()
                );

                histograms.push(hist);
                legends.push(self.config.catalog.legend(tree, energy, signal, analysis));
            }
        }

        for hist in histograms.iter_mut() {
            hist.normalize();
        }
        let written = self.renderer.render(&histograms, &legends, prefix)?;
        Ok(Some(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use polars::prelude::{PolarsError, PolarsResult};

    use crate::binning::BinningResolver;
    use crate::config::Catalog;
    use crate::data_handling::sources::SourceIndex;
    use crate::expansion::expand_all;
    use crate::models::{Domains, Line};

    type Columns = HashMap<String, Vec<f64>>;

    #[derive(Clone, Default)]
    struct MemorySource {
        trees: HashMap<String, Columns>,
    }

    impl DataSource for MemorySource {
        fn extract_series(
            &mut self,
            tree: &str,
            variable: &str,
            weight: Option<&str>,
        ) -> PolarsResult<Vec<f64>> {
            let missing = |what: &str| PolarsError::ComputeError(format!("missing {what}").into());
            let columns = self.trees.get(tree).ok_or_else(|| missing(tree))?;
            let values = columns.get(variable).ok_or_else(|| missing(variable))?;
            match weight {
                Some(w) => {
                    let weights = columns.get(w).ok_or_else(|| missing(w))?;
                    Ok(values.iter().zip(weights).map(|(v, w)| v / w).collect())
                }
                None => Ok(values.clone()),
            }
        }
    }

    #[derive(Default)]
    struct MemoryOpener {
        samples: HashMap<PathBuf, MemorySource>,
        opened: RefCell<Vec<PathBuf>>,
    }

    impl SourceOpener for MemoryOpener {
        type Source = MemorySource;

        fn open(&self, path: &Path) -> PolarsResult<MemorySource> {
            self.opened.borrow_mut().push(path.to_path_buf());
            self.samples
                .get(path)
                .cloned()
                .ok_or_else(|| PolarsError::ComputeError("no such sample".into()))
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<(Vec<Histogram>, Vec<String>, PathBuf)>>,
    }

    impl OverlayRenderer for RecordingRenderer {
        fn render(
            &self,
            histograms: &[Histogram],
            legends: &[String],
            prefix: &Path,
        ) -> Result<Vec<PathBuf>> {
            self.calls
                .borrow_mut()
                .push((histograms.to_vec(), legends.to_vec(), prefix.to_path_buf()));
            Ok(vec![prefix.with_extension("png")])
        }
    }

    fn sample(masses: &[f64], ptfrac: &[f64]) -> MemorySource {
        let columns: Columns = HashMap::from([
            ("j_mass_mmdt".to_string(), masses.to_vec()),
            ("j_ptfrac".to_string(), ptfrac.to_vec()),
        ]);
        MemorySource {
            trees: HashMap::from([
                ("tracks".to_string(), columns.clone()),
                ("allpar".to_string(), columns),
            ]),
        }
    }

    fn config(outdir: &Path, variables: &[&str]) -> RunConfig {
        RunConfig {
            lines: String::new(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            domains: Domains {
                trees: vec!["tracks".into(), "allpar".into()],
                energies: vec!["pt1".into()],
                signals: vec!["W".into(), "q".into()],
                analyses: vec!["r0_h0_e0".into()],
            },
            sources: SourceIndex::parse("W,/mem/WW-pt1-r0_h0_e0,pt1").unwrap(),
            outdir: outdir.to_path_buf(),
            outname: "test".into(),
            log_plots: true,
            catalog: Catalog::default(),
            binning: BinningResolver::default(),
        }
    }

    fn opener() -> MemoryOpener {
        MemoryOpener {
            samples: HashMap::from([(
                PathBuf::from("/mem/WW-pt1-r0_h0_e0"),
                sample(&[50.0, 50.0, 150.0, 500.0], &[0.5, 0.5, 1.0, 1.0]),
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn broadcast_group_becomes_one_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_mass_mmdt"]);
        let groups = expand_all("*,pt1,W,r0_h0_e0", &config.domains);
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());

        let report = plotter.run(&groups).unwrap();

        assert!(report.failed.is_empty());
        let calls = plotter.renderer.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (hists, legends, prefix) = &calls[0];
        assert_eq!(prefix, &dir.path().join("SummaryPlot_test_j_mass_mmdt"));
        assert_eq!(hists.len(), 2);
        assert_eq!(hists[0].name, "j_mass_mmdt_W_pt1_tracks");
        assert_eq!(legends[1], "W all particles, p_{T} 1 TeV, perfect");
        for h in hists {
            assert!((h.integral() - 1.0).abs() < 1e-12);
        }
        // both lines share one sample, opened once
        assert_eq!(plotter.opener.opened.borrow().len(), 1);
    }

    #[test]
    fn weights_apply_only_to_configured_trees() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_mass_mmdt"]);
        let groups = vec![PlotGroup::new(vec![
            Line::new(["tracks", "pt1", "W", "r0_h0_e0"]),
            Line::new(["allpar", "pt1", "W", "r0_h0_e0"]),
        ])];
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());
        plotter.run(&groups).unwrap();

        let calls = plotter.renderer.calls.borrow();
        let (hists, _, _) = &calls[0];
        // 80 bins over 0..200: width 2.5
        let tracks = hists[0].contents();
        let allpar = hists[1].contents();
        assert!(tracks[40] > 0.0, "50 / 0.5 lands at 100");
        assert_eq!(tracks[20], 0.0);
        assert!(allpar[20] > 0.0, "unweighted 50 stays at 50");
        assert_eq!(hists[0].overflow(), hists[1].overflow());
    }

    #[test]
    fn fan_out_names_outputs_by_value() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_mass_mmdt"]);
        let pattern = "**,pt1,W,r0_h0_e0";
        let groups = expand_all(pattern, &config.domains);
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());

        let report = plotter.run(&groups).unwrap();

        assert_eq!(report.rendered.len(), 2);
        let calls = plotter.renderer.calls.borrow();
        assert_eq!(calls[0].2, dir.path().join("SummaryPlot_test_j_mass_mmdt_tracks"));
        assert_eq!(calls[1].2, dir.path().join("SummaryPlot_test_j_mass_mmdt_allpar"));
    }

    #[test]
    fn unknown_variable_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_bogus", "j_mass_mmdt"]);
        let groups = expand_all("tracks,pt1,W,r0_h0_e0", &config.domains);
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());

        let report = plotter.run(&groups).unwrap();

        assert_eq!(report.skipped, 1);
        assert!(report.failed.is_empty());
        assert_eq!(plotter.renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn missing_sample_fails_only_its_group() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_mass_mmdt"]);
        // no sample is listed for signal "q"
        let groups = expand_all("**,pt1,*,r0_h0_e0", &Domains {
            trees: vec!["tracks".into()],
            ..config.domains.clone()
        });
        assert_eq!(groups.len(), 1);
        let split = vec![
            PlotGroup::new(vec![groups[0].lines[0].clone()]),
            PlotGroup::new(vec![groups[0].lines[1].clone()]),
        ];
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());

        let report = plotter.run(&split).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(plotter.renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn output_prefix_appends_fan_out_values() {
        let mut group = PlotGroup::new(vec![Line::new(["tracks", "pt5", "W", "r0_h0_e0"])]);
        assert_eq!(
            output_prefix(Path::new("out"), "n", "j_pt", &group),
            PathBuf::from("out/SummaryPlot_n_j_pt")
        );
        group.fan_out = vec!["pt5".into(), "W".into()];
        assert_eq!(
            output_prefix(Path::new("out"), "n", "j_pt", &group),
            PathBuf::from("out/SummaryPlot_n_j_pt_pt5_W")
        );
    }

    #[test]
    fn fan_out_groups_never_share_a_prefix() {
        let domains = Domains {
            trees: vec!["tracks".into(), "allpar".into()],
            energies: vec!["pt1".into(), "pt5".into()],
            signals: vec!["W".into(), "Z".into(), "t".into()],
            analyses: vec!["r0_h0_e0".into()],
        };
        for pattern in [
            "tracks,pt1,W,r0_h0_e0;allpar,pt1,**,r0_h0_e0",
            "tracks,**,W,r0_h0_e0;allpar,pt1,**,r0_h0_e0",
        ] {
            let groups = expand_all(pattern, &domains);
            assert_eq!(groups.len(), 3);
            let prefixes: HashSet<PathBuf> = groups
                .iter()
                .map(|g| output_prefix(Path::new("o"), "n", "v", g))
                .collect();
            assert_eq!(prefixes.len(), groups.len(), "{pattern}");
        }
    }

    #[test]
    fn repeated_prefix_is_renamed_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["j_mass_mmdt"]);
        let line = Line::new(["tracks", "pt1", "W", "r0_h0_e0"]);
        let groups = vec![PlotGroup::new(vec![line.clone()]), PlotGroup::new(vec![line])];
        let plotter = SummaryPlotter::new(&config, opener(), RecordingRenderer::default());

        plotter.run(&groups).unwrap();

        let calls = plotter.renderer.calls.borrow();
        assert_eq!(calls[0].2, dir.path().join("SummaryPlot_test_j_mass_mmdt"));
        assert_eq!(calls[1].2, dir.path().join("SummaryPlot_test_j_mass_mmdt_2"));
    }
}
