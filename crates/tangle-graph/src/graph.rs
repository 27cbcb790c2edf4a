//! Bulk cell cloning with cross-reference remapping, and JSON import/export
//! of cell sets.
//!
//! `clone_cells` is the two-phase protocol: clone every cell first, building
//! the original-id → clone map, then walk the originals again and rewrite
//! `source`/`target` endpoints, `parent` ids, and `embeds` lists on the
//! clones through that map. For a graph `A --- L ---> B`, cloning
//! `[A, L, B]` yields `A2 --- L2 ---> B2`: the endpoints of `L2` point at
//! the clones, not at the originals.

use crate::cell::Cell;
use crate::error::GraphError;
use crate::id::IdGenerator;
use indexmap::IndexMap;
use tangle_engine::EngineResult;
use tangle_value::{Value, to_json};
use tracing::{debug, trace};

/// Original cell id → clone, in input order. One entry per distinct input
/// cell; this is the identity map external layers key their fix-ups on.
pub type CloneMap = IndexMap<String, Cell>;

/// Clone a set of cells and reconstruct the references among them.
///
/// Duplicate inputs (by id) are cloned once. References to cells outside the
/// set are left as they are for endpoints and parents, and dropped from
/// `embeds` lists — an embedded cell that was not cloned cannot be carried
/// over.
pub fn clone_cells(cells: &[Cell], ids: &mut IdGenerator) -> EngineResult<CloneMap> {
    let mut unique: Vec<&Cell> = Vec::new();
    for cell in cells {
        if !unique.iter().any(|seen| seen.id() == cell.id()) {
            unique.push(cell);
        }
    }
    debug!(cells = unique.len(), "cloning cell set");

    let mut map = CloneMap::new();
    for cell in &unique {
        map.insert(cell.id(), cell.clone_cell(ids)?);
    }

    for cell in &unique {
        let Some(clone) = map.get(&cell.id()) else {
            continue;
        };

        if clone.is_link() {
            if let Some(source_id) = clone.source_id()
                && let Some(mapped) = map.get(&source_id)
            {
                trace!(link = %clone.id(), source = %mapped.id(), "remapping source");
                clone.set_prop("source/id", Value::string(mapped.id()));
            }
            if let Some(target_id) = clone.target_id()
                && let Some(mapped) = map.get(&target_id)
            {
                trace!(link = %clone.id(), target = %mapped.id(), "remapping target");
                clone.set_prop("target/id", Value::string(mapped.id()));
            }
        }

        if let Some(parent) = cell.parent_id()
            && let Some(mapped) = map.get(&parent)
        {
            clone.set_prop("parent", Value::string(mapped.id()));
        }

        let embeds = cell.embeds();
        if !embeds.is_empty() {
            let carried: Vec<String> = embeds
                .iter()
                .filter_map(|embed| map.get(embed).map(|mapped| mapped.id()))
                .collect();
            if carried.is_empty() {
                clone.remove_prop("embeds");
            } else {
                clone.set_embeds(&carried);
            }
        }
    }

    Ok(map)
}

/// Serialize a cell set into a `{ "cells": [...] }` document.
pub fn cells_to_json(cells: &[Cell]) -> Result<serde_json::Value, GraphError> {
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
        out.push(to_json(cell.value())?);
    }
    Ok(serde_json::json!({ "cells": out }))
}

/// Deserialize a `{ "cells": [...] }` document (or a bare array) into cells.
pub fn cells_from_json(doc: &serde_json::Value) -> Result<Vec<Cell>, GraphError> {
    let items = match doc {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(members) => match members.get("cells") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(GraphError::MissingCells),
        },
        _ => return Err(GraphError::MissingCells),
    };
    items
        .iter()
        .map(|item| Cell::from_value(tangle_value::from_json(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_inputs_clone_once() {
        let mut ids = IdGenerator::default();
        let a = Cell::new("shape.Rect", &mut ids);
        let map = clone_cells(&[a.clone(), a.clone()], &mut ids).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn json_documents_round_trip() {
        let mut ids = IdGenerator::default();
        let cell = Cell::new("shape.Rect", &mut ids);
        cell.set_prop("attrs/rect/fill", Value::string("red"));

        let doc = cells_to_json(&[cell.clone()]).unwrap();
        let restored = cells_from_json(&doc).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id(), cell.id());
        assert_eq!(
            restored[0].prop("attrs/rect/fill"),
            Some(Value::string("red"))
        );
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            cells_from_json(&serde_json::json!({ "nodes": [] })),
            Err(GraphError::MissingCells)
        ));
        assert!(matches!(
            cells_from_json(&serde_json::json!({ "cells": [{ "type": "x" }] })),
            Err(GraphError::MissingId)
        ));
    }
}
