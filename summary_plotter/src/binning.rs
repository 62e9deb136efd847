//! Histogram binning per variable, plus the category-keyed override rules.

use anyhow::{bail, Context, Result};
use regex::Regex;

/// Shape of a 1D histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinShape {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

impl BinShape {
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinningEntry {
    pub variable: &'static str,
    pub axis_label: &'static str,
    pub shape: BinShape,
}

const fn entry(
    variable: &'static str,
    axis_label: &'static str,
    bins: usize,
    min: f64,
    max: f64,
) -> BinningEntry {
    BinningEntry {
        variable,
        axis_label,
        shape: BinShape::new(bins, min, max),
    }
}

//        VARIABLE            AXIS TITLE                          BINS, MIN, MAX
#[rustfmt::skip]
pub const DEFAULT_BINNING: &[BinningEntry] = &[
    entry("j_pt",           "; jet pT (GeV);",                325, 0.0, 1500.0),
    entry("j_ptfrac",       "; jet energy fraction;",         60, 0.0, 2.0),
    entry("j_eta",          "; eta;",                         60, -3.0, 3.0),
    entry("j_c1_b0",        "; C_{1}^{#beta=0};",             20, 0.0, 0.5),
    entry("j_c1_b1",        "; C_{1}^{#beta=1};",             20, 0.0, 0.5),
    entry("j_c1_b2",        "; C_{1}^{#beta=2};",             20, 0.0, 0.5),
    entry("j_c2_b1",        "; C_{2}^{#beta=1};",             20, 0.0, 0.5),
    entry("j_c2_b2",        "; C_{2}^{#beta=2};",             20, 0.0, 0.5),
    entry("j_d2_b1",        "; D_{2}^{#beta=1};",             20, 0.0, 0.5),
    entry("j_d2_b2",        "; D_{2}^{#beta=2};",             20, 0.0, 0.5),
    entry("j_multiplicity", "; multiplicity;",                40, 0.0, 200.0),
    entry("j_mass",         "; mass (GeV);",                  80, 0.0, 300.0),
    entry("j_mass_mmdt",    "; m_{SD}^{#beta=0} (GeV);",      80, 0.0, 200.0),
    entry("j_mass_sdb2",    "; m_{SD}^{#beta=2} (GeV);",      80, 0.0, 200.0),
    entry("j_mass_prun",    "; m_{prun} (GeV);",              80, 0.0, 200.0),
    entry("j_mass_sdm1",    "; m_{SD}^{#beta=1} (GeV);",      80, 0.0, 200.0),
    entry("j_mass_trim",    "; m_{trim} (GeV);",              80, 0.0, 200.0),
    entry("j_zlogz",        "; #Sigma z logz;",               28, -6.0, 1.0),
    entry("j_tau1_b1",      "; N-subjettiness 1, #beta=1;",   100, 0.0, 150.0),
    entry("j_tau2_b1",      "; N-subjettiness 2, #beta=1;",   100, 0.0, 150.0),
    entry("j_tau3_b1",      "; N-subjettiness 3, #beta=1;",   100, 0.0, 150.0),
    entry("j_tau1_b2",      "; N-subjettiness 1, #beta=2;",   100, 0.0, 150.0),
    entry("j_tau2_b2",      "; N-subjettiness 2, #beta=2;",   100, 0.0, 150.0),
    entry("j_tau3_b2",      "; N-subjettiness 3, #beta=2;",   100, 0.0, 150.0),
    entry("j_tau32_b1",     "; N-subjettiness 3/2, #beta=1;", 100, 0.0, 1.0),
    entry("j_tau21_b1",     "; N-subjettiness 2/1, #beta=1;", 100, 0.0, 1.0),
    entry("j_tau32_b2",     "; N-subjettiness 3/2, #beta=2;", 100, 0.0, 1.0),
    entry("j_tau21_b2",     "; N-subjettiness 2/1, #beta=2;", 100, 0.0, 1.0),
];

/// Per-variable defaults, first exact match wins.
#[derive(Debug, Clone)]
pub struct BinningTable {
    entries: &'static [BinningEntry],
}

impl Default for BinningTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_BINNING,
        }
    }
}

impl BinningTable {
    pub fn lookup(&self, variable: &str) -> Option<&BinningEntry> {
        self.entries.iter().find(|e| e.variable == variable)
    }
}

// Override keys: "sig1;;sig2;;energy1;;energy2;;tree;;variable".
// Order matters: the last rule matching a context wins.
#[rustfmt::skip]
pub const DEFAULT_OVERRIDES: &[(&str, BinShape)] = &[
    // tau 1,2,3 beta=1
    ("[W,Z,q];;[W,Z,q];;pt;;pt;;[tracks,allpar,tragam];;tau[1,2,3]_b1", BinShape::new(150, 0.0, 150.0)),
    ("[t,g];;[W,t,g,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;tau1_b1", BinShape::new(250, 0.0, 250.0)),
    ("[t];;[W,t,g,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau1_b1", BinShape::new(250, 0.0, 250.0)),
    ("[g];;[W,t,g,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau1_b1", BinShape::new(150, 0.0, 150.0)),
    ("[W,q,Z];;[W,g,t,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau2_b1", BinShape::new(70, 0.0, 70.0)),
    ("[W,q,Z];;[W,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;tau2_b1", BinShape::new(100, 0.0, 100.0)),
    ("[W,q,Z];;[t,g];;pt5;;pt5;;[tracks,allpar,tragam];;tau2_b1", BinShape::new(200, 0.0, 200.0)),
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;tau3_b1", BinShape::new(150, 0.0, 150.0)),
    // tau 1,2,3 beta=2
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;tau1_b2", BinShape::new(50, 0.0, 25.0)),
    ("[t,g];;[W,g,t,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau1_b2", BinShape::new(50, 0.0, 50.0)),
    ("[t,g];;[W,g,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;tau1_b2", BinShape::new(75, 0.0, 75.0)),
    ("[g,t];;[W,g,t,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau2_b2", BinShape::new(50, 0.0, 50.0)),
    ("[W,Z,q];;[W,t,Z,q];;pt1;;pt1;;[tracks,allpar,tragam];;tau2_b2", BinShape::new(40, 0.0, 20.0)),
    ("[g];;[W,g,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;tau2_b2", BinShape::new(60, 0.0, 60.0)),
    ("[W,Z,q];;[W,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;tau2_b2", BinShape::new(40, 0.0, 40.0)),
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;tau3_b2", BinShape::new(50, 0.0, 50.0)),
    // tau ratios
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;tau.._b", BinShape::new(100, 0.0, 1.1)),
    ("[g,t,q];;[W,Z,g,t,q];;pt5;;pt5;;[tracks,allpar,tragam];;multiplicity", BinShape::new(50, 0.0, 275.0)),
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;c1_b0", BinShape::new(50, 0.0, 0.5)),
    ("[W,Z,q];;[W,Z,q];;pt;;pt;;[tracks,allpar,tragam];;c1_b1", BinShape::new(80, 0.0, 0.2)),
    ("[g,t];;[g,t];;pt;;pt;;[tracks,allpar,tragam];;c1_b1", BinShape::new(35, 0.0, 0.35)),
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;c1_b2", BinShape::new(32, 0.0, 0.08)),
    ("[W,g,t,Z,q];;[W,g,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;j_pt$", BinShape::new(325, 0.0, 7500.0)),
    // jet mass
    ("[W,g,t,Z,q];;[g,t,q];;pt1;;pt1;;[tracks,allpar,tragam];;j_mass_[^m]", BinShape::new(700, 0.0, 350.0)),
    ("[W];;[Z];;pt1;;pt1;;[tracks,allpar,tragam];;j_mass_[^m]", BinShape::new(350, 0.0, 175.0)),
    ("[q];;[W,g,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;j_mass_[^m]", BinShape::new(500, 0.0, 500.0)),
    ("[g,t];;[W,g,t,Z,q];;pt5;;pt5;;[tracks,allpar,tragam];;j_mass_[^m]", BinShape::new(600, 0.0, 600.0)),
    ("[t];;[W,g,t,Z,q];;pt;;pt;;[tracks,allpar,tragam];;j_mass_mmdt", BinShape::new(100, 0.0, 250.0)),
];

/// Categories a histogram is built for. `None` slots are not tested.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideContext<'a> {
    pub signal: Option<&'a str>,
    pub signal2: Option<&'a str>,
    pub energy: Option<&'a str>,
    pub energy2: Option<&'a str>,
    pub tree: Option<&'a str>,
    pub variable: Option<&'a str>,
}

impl<'a> OverrideContext<'a> {
    fn slots(&self) -> [Option<&'a str>; 6] {
        [
            self.signal,
            self.signal2,
            self.energy,
            self.energy2,
            self.tree,
            self.variable,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct OverrideRule {
    fragments: [Regex; 6],
    pub shape: BinShape,
}

impl OverrideRule {
    pub fn parse(key: &str, shape: BinShape) -> Result<Self> {
        let parts: Vec<&str> = key.split(";;").collect();
        if parts.len() != 6 {
            bail!("override key '{key}' has {} fragments, expected 6", parts.len());
        }
        let compiled = parts
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("bad fragment '{p}' in '{key}'")))
            .collect::<Result<Vec<_>>>()?;
        let fragments: [Regex; 6] = compiled
            .try_into()
            .map_err(|_| anyhow::anyhow!("override key '{key}' lost fragments"))?;
        Ok(Self { fragments, shape })
    }

    pub fn matches(&self, ctx: &OverrideContext<'_>) -> bool {
        self.fragments
            .iter()
            .zip(ctx.slots())
            .all(|(fragment, value)| value.map_or(true, |v| fragment.is_match(v)))
    }
}

/// Ordered override rules; the last match wins.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    pub fn compile(rules: &[(&str, BinShape)]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|(key, shape)| OverrideRule::parse(key, *shape))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::compile(DEFAULT_OVERRIDES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn resolve(&self, ctx: &OverrideContext<'_>, base: BinShape) -> BinShape {
        self.rules
            .iter()
            .filter(|rule| rule.matches(ctx))
            .last()
            .map_or(base, |rule| rule.shape)
    }
}

/// Lookup table plus the optional override pass.
#[derive(Debug, Clone, Default)]
pub struct BinningResolver {
    pub table: BinningTable,
    pub overrides: Option<OverrideTable>,
}

impl BinningResolver {
    /// `base` after the override pass, unchanged when overrides are off.
    pub fn refine(&self, base: BinShape, ctx: &OverrideContext<'_>) -> BinShape {
        match &self.overrides {
            Some(overrides) => overrides.resolve(ctx, base),
            None => base,
        }
    }
}
