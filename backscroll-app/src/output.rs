//! JSON-lines rendering for stdout.
use backscroll_engine::{EntityId, FanoutReport, Item};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

#[derive(Serialize)]
struct Line<'a> {
    entity: &'a EntityId,
    item: &'a Item,
}

pub fn write_items<W: Write>(out: &mut W, entity: &EntityId, items: &[Item]) -> io::Result<()> {
    for item in items {
        serde_json::to_writer(&mut *out, &Line { entity, item })?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Items grouped per entity, entities in name order.
pub fn write_report<W: Write>(out: &mut W, report: &FanoutReport) -> io::Result<()> {
    let ordered: BTreeMap<&EntityId, &Vec<Item>> = report.items.iter().collect();
    for (entity, items) in ordered {
        write_items(out, entity, items)?;
    }
    out.flush()
}

pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    out.flush()
}
