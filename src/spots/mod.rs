pub mod error;
pub mod ordering;
pub mod validate;

pub use error::SpotError;
pub use ordering::{projection, reorder, reset, toggle};
pub use validate::validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A travel spot as the client sees it.
///
/// `is_selected` and `index` travel together: an unselected spot has no
/// index, a selected spot holds its dense rank within the selection.
/// Any other fields the client attaches (coordinates, descriptions, ...)
/// are kept in `details` and carried through every operation untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub name: String,
    pub is_selected: bool,
    pub index: Option<usize>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Spot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_selected: false,
            index: None,
            details: Map::new(),
        }
    }

    pub fn selected(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            is_selected: true,
            index: Some(index),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    fn deselected(&self) -> Self {
        Self {
            is_selected: false,
            index: None,
            ..self.clone()
        }
    }

    fn at(&self, index: usize) -> Self {
        Self {
            is_selected: true,
            index: Some(index),
            ..self.clone()
        }
    }
}

/// Full collection together with its ordered selection, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotsView {
    pub spots: Vec<Spot>,
    pub selected: Vec<Spot>,
}

impl SpotsView {
    pub fn of(spots: Vec<Spot>) -> Self {
        let selected = projection(&spots).into_iter().cloned().collect();
        Self { spots, selected }
    }
}
