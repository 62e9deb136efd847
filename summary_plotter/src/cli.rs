use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "summary-plotter")]
#[command(about = "Overlay normalized histograms of jet variables for sets of sample lines")]
pub struct Args {
    /// File list of inputs ("signal,path,energy;...")
    #[arg(short = 'i', long = "files", default_value = "")]
    pub files: String,

    /// Name tag for the output plots
    #[arg(short = 'n', long = "outname", default_value = "")]
    pub outname: String,

    /// Where to store plotting output
    #[arg(short = 'o', long = "outdir", default_value = "./plots/")]
    pub outdir: PathBuf,

    /// Skip the log-scale images
    #[arg(long, default_value_t = false)]
    pub no_log_plots: bool,

    /// Location of input samples when no file list is given
    #[arg(long = "basedir", default_value = "../testSamples/")]
    pub basedir: PathBuf,

    /// Analysis configurations to use (csv)
    #[arg(
        long = "ana",
        default_value = "r0_h0_e0,r05_h05_e005,r05_h01_e005,r05_h01_e005_t,r05_h002_e005_t"
    )]
    pub analyses: String,

    /// Energy categories to use (csv)
    #[arg(long = "pts", default_value = "pt1,pt5")]
    pub energies: String,

    /// Signals to use (csv)
    #[arg(long = "sigs", default_value = "W,Z,t,q,g")]
    pub signals: String,

    /// Trees to use (csv)
    #[arg(long = "trees", default_value = "allpar,tragam,tracks")]
    pub trees: String,

    /// Variables to plot (csv)
    #[arg(long = "vars", default_value = "j_mass_mmdt")]
    pub variables: String,

    /// Lines to plot ("tree,energy,signal,ana;..."), `*` and `**` expand
    #[arg(long)]
    pub lines: Option<String>,

    /// JSON file replacing the built-in display names and weighting rules
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Refine binning with the per-category override rules
    #[arg(long, default_value_t = false)]
    pub apply_bin_overrides: bool,
}
