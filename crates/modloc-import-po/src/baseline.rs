use std::path::Path;

use color_eyre::eyre::Result;
use modloc_core::BaselineReference;

/// Read a baseline table: a CSV with a header row whose first two columns are id and text.
pub fn read_baseline_csv(path: &Path) -> Result<BaselineReference> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut pairs = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).unwrap_or("").trim().to_string();
        let text = rec.get(1).unwrap_or("").to_string();
        pairs.push((id, text));
    }
    let baseline = BaselineReference::from_pairs(pairs);
    tracing::info!(event = "baseline_loaded", path = %path.display(), ids = baseline.len());
    Ok(baseline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modloc_core::BaselineMatch;

    #[test]
    fn reads_id_text_pairs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let p = dir.path().join("baseline.csv");
        std::fs::write(&p, "id,text\nfoo,Old\n\"bar\",\"Hello, world\"\n,orphan\n")?;
        let b = read_baseline_csv(&p)?;
        assert_eq!(b.len(), 2);
        assert_eq!(b.classify("bar", "Hello, world"), BaselineMatch::SameText);
        Ok(())
    }
}
