use std::path::{Path, PathBuf};

use polars::error::PolarsResult;
use polars::frame::DataFrame;
use polars::prelude::{CsvReadOptions, SerReader};

pub fn read_csv(file_path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
}

/// Replace the TeX-like `#name` escapes used in labels with their Unicode glyphs.
pub fn tex_to_unicode(label: &str) -> String {
    const GLYPHS: &[(&str, &str)] = &[
        ("#Sigma", "Σ"),
        ("#alpha", "α"),
        ("#beta", "β"),
        ("#gamma", "γ"),
        ("#delta", "δ"),
        ("#eta", "η"),
        ("#tau", "τ"),
    ];
    GLYPHS
        .iter()
        .fold(label.to_string(), |acc, (tex, glyph)| acc.replace(tex, glyph))
}

/// Split a `"title;x axis;y axis"` label into its three parts.
pub fn split_axis_title(label: &str) -> (String, String, String) {
    let mut parts = label.split(';').map(|p| tex_to_unicode(p.trim()));
    (
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_greek_escapes() {
        assert_eq!(tex_to_unicode("tr+#gamma"), "tr+γ");
        assert_eq!(tex_to_unicode("#Sigma z logz"), "Σ z logz");
        assert_eq!(tex_to_unicode("m_{SD}^{#beta=0}"), "m_{SD}^{β=0}");
    }

    #[test]
    fn splits_axis_titles() {
        let (title, x, y) = split_axis_title("; m_{SD}^{#beta=0} (GeV);");
        assert_eq!(title, "");
        assert_eq!(x, "m_{SD}^{β=0} (GeV)");
        assert_eq!(y, "");
    }
}
