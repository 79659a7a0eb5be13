use std::io::Write;

use color_eyre::eyre::Result;
use modloc_core::{BaselineReference, Entry};

pub const CSV_HEADER: [&str; 7] = [
    "id",
    "text_source",
    "text_target",
    "file",
    "attribute",
    "updated",
    "duplicate_with_baseline",
];

/// Flat export of a catalog, one row per entry. `updated` means the translation is reviewed.
pub fn write_csv<W: Write>(
    writer: W,
    entries: &[Entry],
    baseline: Option<&BaselineReference>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for e in entries {
        let in_baseline = e.in_baseline || baseline.is_some_and(|b| b.contains_id(&e.id));
        wtr.write_record([
            e.id.as_str(),
            e.text_source.as_str(),
            e.text_target.as_deref().unwrap_or(""),
            e.file.as_str(),
            e.attribute.as_str(),
            bool_str(!e.needs_review),
            bool_str(in_baseline),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn render_csv(entries: &[Entry], baseline: Option<&BaselineReference>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, entries, baseline)?;
    Ok(buf)
}

/// Baseline table as `id,text` rows, readable by the baseline loader.
pub fn write_baseline_csv<W: Write>(writer: W, baseline: &BaselineReference) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["id", "text"])?;
    for (id, text) in baseline.pairs() {
        wtr.write_record([id, text])?;
    }
    wtr.flush()?;
    Ok(())
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
