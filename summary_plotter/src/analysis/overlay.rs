use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::analysis::histogram::Histogram;
use crate::helper_functions::{split_axis_title, tex_to_unicode};

/// Draws labeled histograms onto one canvas and writes the image files.
pub trait OverlayRenderer {
    /// Returns the paths written, all starting with `prefix`.
    fn render(
        &self,
        histograms: &[Histogram],
        legends: &[String],
        prefix: &Path,
    ) -> Result<Vec<PathBuf>>;
}

// Line colours in draw order.
const LINE_COLOURS: [RGBColor; 8] = [
    RGBColor(0, 0, 0),
    RGBColor(255, 0, 0),
    RGBColor(0, 0, 255),
    RGBColor(255, 0, 255),
    RGBColor(0, 255, 255),
    RGBColor(89, 212, 84),
    RGBColor(89, 84, 217),
    RGBColor(191, 191, 191),
];

/// `prefix` with `suffix` appended to its last component.
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Output files for one canvas: linear SVG and PNG, then the log pair.
pub fn output_paths(prefix: &Path, log_plots: bool) -> Vec<(PathBuf, bool)> {
    let mut paths = vec![
        (with_suffix(prefix, ".svg"), false),
        (with_suffix(prefix, ".png"), false),
    ];
    if log_plots {
        paths.push((with_suffix(prefix, "_log.svg"), true));
        paths.push((with_suffix(prefix, "_log.png"), true));
    }
    paths
}

pub struct PlottersRenderer {
    pub log_plots: bool,
    pub size: (u32, u32),
}

impl PlottersRenderer {
    pub fn new(log_plots: bool) -> Self {
        Self {
            log_plots,
            size: (800, 600),
        }
    }
}

impl OverlayRenderer for PlottersRenderer {
    fn render(
        &self,
        histograms: &[Histogram],
        legends: &[String],
        prefix: &Path,
    ) -> Result<Vec<PathBuf>> {
        if histograms.is_empty() {
            bail!("no histograms to draw for {}", prefix.display());
        }
        if histograms.len() != legends.len() {
            bail!(
                "{} histograms but {} legend entries for {}",
                histograms.len(),
                legends.len(),
                prefix.display()
            );
        }

        let mut written = Vec::new();
        for (path, log_y) in output_paths(prefix, self.log_plots) {
            let is_svg = path.extension().is_some_and(|e| e == "svg");
            if is_svg {
                let root = SVGBackend::new(&path, self.size).into_drawing_area();
                draw_overlay(root, histograms, legends, log_y)?;
            } else {
                let root = BitMapBackend::new(&path, self.size).into_drawing_area();
                draw_overlay(root, histograms, legends, log_y)?;
            }
            info!("Saved {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

fn draw_overlay<DB>(
    root: DrawingArea<DB, Shift>,
    histograms: &[Histogram],
    legends: &[String],
    log_y: bool,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let first = &histograms[0];
    let (title, x_desc, y_desc) = split_axis_title(&first.axis_label);
    let y_desc = if y_desc.is_empty() { "normalized entries".to_string() } else { y_desc };
    let x_range = first.shape.min..first.shape.max;
    let max = histograms.iter().map(Histogram::maximum).fold(0.0, f64::max);

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20).x_label_area_size(50).y_label_area_size(70);
    if !title.is_empty() {
        builder.caption(&title, ("sans-serif", 22));
    }

    if log_y {
        let floor = histograms
            .iter()
            .filter_map(Histogram::minimum_positive)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(1e-3)
            * 0.5;
        let top = (max * 1.5).max(floor * 10.0);
        let mut chart = builder.build_cartesian_2d(x_range, (floor..top).log_scale())?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(x_desc.as_str())
            .y_desc(y_desc.as_str())
            .y_label_formatter(&|v| format!("{v:.0e}"))
            .label_style(("sans-serif", 16))
            .draw()?;
        draw_histograms(&mut chart, histograms, legends, floor)?;
    } else {
        let top = if max > 0.0 { max * 1.5 } else { 1.0 };
        let mut chart = builder.build_cartesian_2d(x_range, 0.0..top)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(x_desc.as_str())
            .y_desc(y_desc.as_str())
            .label_style(("sans-serif", 16))
            .draw()?;
        draw_histograms(&mut chart, histograms, legends, 0.0)?;
    }

    root.present()?;
    Ok(())
}

fn draw_histograms<'a, DB, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
    histograms: &[Histogram],
    legends: &[String],
    floor: f64,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64>,
{
    for (i, (hist, legend)) in histograms.iter().zip(legends).enumerate() {
        let style = LINE_COLOURS[i % LINE_COLOURS.len()].stroke_width(2);
        chart
            .draw_series(LineSeries::new(hist.step_points(floor), style))?
            .label(tex_to_unicode(legend))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .border_style(WHITE.mix(0.0))
        .label_font(("sans-serif", 16))
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_linear_and_log_outputs() {
        let prefix = Path::new("plots/SummaryPlot__j_mass_mmdt");
        let paths: Vec<PathBuf> = output_paths(prefix, true).into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("plots/SummaryPlot__j_mass_mmdt.svg"),
                PathBuf::from("plots/SummaryPlot__j_mass_mmdt.png"),
                PathBuf::from("plots/SummaryPlot__j_mass_mmdt_log.svg"),
                PathBuf::from("plots/SummaryPlot__j_mass_mmdt_log.png"),
            ]
        );
        assert_eq!(output_paths(prefix, false).len(), 2);
    }

    #[test]
    fn refuses_empty_or_mismatched_input() {
        let renderer = PlottersRenderer::new(false);
        let prefix = Path::new("unused");
        assert!(renderer.render(&[], &[], prefix).is_err());

        let h = Histogram::new("h", "; x;", crate::binning::BinShape::new(2, 0.0, 1.0));
        assert!(renderer.render(&[h], &[], prefix).is_err());
    }

    #[test]
    fn writes_linear_and_log_images() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("SummaryPlot_test_j_mass_mmdt");
        let shape = crate::binning::BinShape::new(80, 0.0, 200.0);

        let mut w = Histogram::new("j_mass_mmdt_W_pt1_tracks", "; m_{SD}^{#beta=0} (GeV);", shape);
        w.fill_all(&[78.0, 80.0, 81.5, 84.0, 90.0, 120.0]);
        let mut q = Histogram::new("j_mass_mmdt_q_pt1_tracks", "; m_{SD}^{#beta=0} (GeV);", shape);
        q.fill_all(&[5.0, 12.0, 30.0, 44.0, 60.0]);
        let mut histograms = vec![w, q];
        for h in histograms.iter_mut() {
            h.normalize();
        }
        let legends = vec![
            "W tracks, p_{T} 1 TeV, perfect".to_string(),
            "q tracks, p_{T} 1 TeV, perfect".to_string(),
        ];

        let written = PlottersRenderer::new(true)
            .render(&histograms, &legends, &prefix)
            .unwrap();

        assert_eq!(written.len(), 4);
        assert!(written.contains(&dir.path().join("SummaryPlot_test_j_mass_mmdt_log.png")));
        for path in &written {
            let size = std::fs::metadata(path).unwrap().len();
            assert!(size > 0, "{} is empty", path.display());
        }
    }
}
