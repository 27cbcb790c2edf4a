//! Cells: record-backed node/edge data with path-addressed attributes.
//!
//! A cell is a record with a string `id`, a `type`, and arbitrary nested
//! attributes reached with slash paths (`attrs/rect/fill`). Edge-like cells
//! carry `source`/`target` endpoint records of the form `{ id: <cell id> }`;
//! containment uses a `parent` id and an `embeds` id list.

use crate::error::GraphError;
use crate::id::IdGenerator;
use tangle_engine::{EngineResult, Path, clone_deep, get_by_path, set_by_path, unset_by_path};
use tangle_value::Value;

/// A record-backed graph cell.
#[derive(Debug, Clone)]
pub struct Cell {
    data: Value,
}

impl Cell {
    /// A fresh cell of the given type with a generated id.
    pub fn new(cell_type: &str, ids: &mut IdGenerator) -> Self {
        let data = Value::record_from_pairs([
            ("id", Value::string(ids.next_id())),
            ("type", Value::string(cell_type)),
        ]);
        Self { data }
    }

    /// A fresh edge-like cell connecting two cell ids.
    pub fn new_link(ids: &mut IdGenerator, source: &str, target: &str) -> Self {
        let cell = Self::new("link", ids);
        cell.set_prop("source/id", Value::string(source));
        cell.set_prop("target/id", Value::string(target));
        cell
    }

    /// Adopt an existing record as a cell. The record must carry a string
    /// `id` field.
    pub fn from_value(data: Value) -> Result<Self, GraphError> {
        if !data.is_record() {
            return Err(GraphError::NotARecord { kind: data.kind() });
        }
        match data.get_field("id") {
            Some(Value::String(_)) => Ok(Self { data }),
            _ => Err(GraphError::MissingId),
        }
    }

    /// The backing record value.
    pub fn value(&self) -> &Value {
        &self.data
    }

    /// The cell id.
    pub fn id(&self) -> String {
        match self.data.get_field("id") {
            Some(Value::String(s)) => s.to_string(),
            // Construction guarantees a string id.
            _ => String::new(),
        }
    }

    /// Replace the cell id.
    pub fn set_id(&self, id: &str) {
        self.data.set_field("id", Value::string(id));
    }

    /// The cell's type tag.
    pub fn cell_type(&self) -> Option<String> {
        match self.data.get_field("type") {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        }
    }

    /// Whether this cell is edge-like: it carries a `source` or `target`
    /// endpoint record.
    pub fn is_link(&self) -> bool {
        matches!(self.data.get_field("source"), Some(Value::Record(_)))
            || matches!(self.data.get_field("target"), Some(Value::Record(_)))
    }

    /// Read an attribute by slash path.
    pub fn prop(&self, path: &str) -> Option<Value> {
        get_by_path(&self.data, &Path::parse(path, '/'))
    }

    /// Write an attribute by slash path, creating intermediate records.
    pub fn set_prop(&self, path: &str, value: Value) {
        set_by_path(&self.data, &Path::parse(path, '/'), value);
    }

    /// Remove an attribute by slash path.
    pub fn remove_prop(&self, path: &str) -> bool {
        unset_by_path(&self.data, &Path::parse(path, '/'))
    }

    /// The id recorded in the `source` endpoint, if any.
    pub fn source_id(&self) -> Option<String> {
        match self.prop("source/id") {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        }
    }

    /// The id recorded in the `target` endpoint, if any.
    pub fn target_id(&self) -> Option<String> {
        match self.prop("target/id") {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        }
    }

    /// The parent cell id, if any.
    pub fn parent_id(&self) -> Option<String> {
        match self.data.get_field("parent") {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        }
    }

    /// Ids of embedded cells, in order.
    pub fn embeds(&self) -> Vec<String> {
        let Some(Value::Array(list)) = self.data.get_field("embeds") else {
            return Vec::new();
        };
        let snapshot = list.read().clone();
        snapshot
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect()
    }

    /// Replace the embeds list.
    pub fn set_embeds(&self, ids: &[String]) {
        self.data.set_field(
            "embeds",
            Value::array(ids.iter().map(Value::string).collect()),
        );
    }

    /// An independent deep copy of this cell with a fresh id. Attribute
    /// trees are fully cloned; endpoint and containment references still
    /// carry the original ids until a clone-set remap rewrites them.
    pub fn clone_cell(&self, ids: &mut IdGenerator) -> EngineResult<Cell> {
        let data = clone_deep(&self.data)?;
        let copy = Cell { data };
        copy.set_id(&ids.next_id());
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cells_carry_id_and_type() {
        let mut ids = IdGenerator::default();
        let cell = Cell::new("shape.Rect", &mut ids);
        assert_eq!(cell.id(), "c_1");
        assert_eq!(cell.cell_type().as_deref(), Some("shape.Rect"));
        assert!(!cell.is_link());
    }

    #[test]
    fn links_are_detected_by_endpoint_records() {
        let mut ids = IdGenerator::default();
        let link = Cell::new_link(&mut ids, "a", "b");
        assert!(link.is_link());
        assert_eq!(link.source_id().as_deref(), Some("a"));
        assert_eq!(link.target_id().as_deref(), Some("b"));
    }

    #[test]
    fn props_traverse_attribute_trees() {
        let mut ids = IdGenerator::default();
        let cell = Cell::new("shape.Rect", &mut ids);
        cell.set_prop("attrs/rect/fill", Value::string("red"));
        assert_eq!(
            cell.prop("attrs/rect/fill"),
            Some(Value::string("red"))
        );
        assert!(cell.remove_prop("attrs/rect/fill"));
        assert_eq!(cell.prop("attrs/rect/fill"), None);
    }

    #[test]
    fn clone_cell_detaches_attributes_and_renames() {
        let mut ids = IdGenerator::default();
        let cell = Cell::new("shape.Rect", &mut ids);
        cell.set_prop("attrs/rect/fill", Value::string("red"));

        let copy = cell.clone_cell(&mut ids).unwrap();
        assert_ne!(copy.id(), cell.id());

        copy.set_prop("attrs/rect/fill", Value::string("blue"));
        assert_eq!(cell.prop("attrs/rect/fill"), Some(Value::string("red")));
    }

    #[test]
    fn from_value_requires_a_record_with_a_string_id() {
        assert!(Cell::from_value(Value::number(1.0)).is_err());
        assert!(Cell::from_value(Value::empty_record()).is_err());
        let ok = Value::record_from_pairs([("id", Value::string("x"))]);
        assert!(Cell::from_value(ok).is_ok());
    }
}
