use crate::core::element::{ElementKind, TrackElement, DEFAULT_WIDTH};
use anyhow::Context;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ElementRecord {
    kind: ElementKind,
    length: f64,
    #[serde(default)]
    banking: Option<f64>,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    is_drs: Option<bool>,
}

/// read_track_elements reads a track element list from a CSV file with the header
/// `kind,length,banking,elevation,width,is_drs`. Empty fields fall back to defaults.
pub fn read_track_elements(filepath: &Path) -> anyhow::Result<Vec<TrackElement>> {
    let fh = std::fs::File::open(filepath).context(format!(
        "Failed to open track element file {}!",
        filepath.display()
    ))?;
    parse_track_elements(fh).context(format!(
        "Failed to parse track element file {}!",
        filepath.display()
    ))
}

pub fn parse_track_elements<R: Read>(rdr: R) -> anyhow::Result<Vec<TrackElement>> {
    let mut csv_rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut elements = Vec::new();

    for (i, record) in csv_rdr.deserialize::<ElementRecord>().enumerate() {
        let record = record.context(format!("Invalid element in row {}!", i + 1))?;
        if record.length <= 0.0 {
            anyhow::bail!("Element in row {} has a non-positive length!", i + 1);
        }

        let mut el = TrackElement::new(
            record.kind,
            record.length,
            record.banking.unwrap_or(0.0).clamp(0.0, 25.0),
            record.elevation.unwrap_or(0.0).clamp(-30.0, 30.0),
        );
        el.width = record.width.unwrap_or(DEFAULT_WIDTH);
        el.is_drs = record.is_drs.unwrap_or(false) && !el.is_corner();
        elements.push(el);
    }

    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_elements() {
        let data = "kind,length,banking,elevation,width,is_drs\n\
                    straight,600,,5,,true\n\
                    corner-left,150,12,-3,12,\n\
                    corner-right,220,40,0,,true\n";
        let elements = parse_track_elements(data.as_bytes()).unwrap();

        assert_eq!(elements.len(), 3);
        assert!(elements[0].is_drs);
        assert_eq!(elements[0].width, DEFAULT_WIDTH);
        assert_eq!(elements[1].kind, ElementKind::CornerLeft);
        assert_eq!(elements[1].width, 12.0);
        // banking is clamped and corners never carry DRS
        assert_eq!(elements[2].banking, 25.0);
        assert!(!elements[2].is_drs);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let data = "kind,length,banking,elevation,width,is_drs\nhairpin,100,0,0,,\n";
        assert!(parse_track_elements(data.as_bytes()).is_err());
    }
}
