//! Listing of the operation catalog

use deskbridge_core::{Area, OperationKind, OperationSpec};
use std::io::{self, Write};

/// One catalog line: name, caching behaviour and summary
pub fn describe(spec: &OperationSpec) -> String {
    let behaviour = match spec.kind {
        OperationKind::Read(tier) => format!("read, cached {} ({}m)", tier, tier.duration().as_secs() / 60),
        OperationKind::Mutation(targets) => format!("write, invalidates {}", targets.len()),
    };
    format!("  {:<34} {:<24} {}", spec.name, behaviour, spec.summary)
}

/// Write the catalog grouped by area, in table order
pub fn write_operations<W: Write>(out: &mut W, specs: &[OperationSpec]) -> io::Result<()> {
    let mut current: Option<Area> = None;
    for spec in specs {
        if current != Some(spec.area) {
            if current.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "{}:", spec.area)?;
            current = Some(spec.area);
        }
        writeln!(out, "{}", describe(spec))?;
    }
    Ok(())
}
