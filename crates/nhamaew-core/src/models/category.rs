use serde::{Deserialize, Serialize};

/// One node of the product category tree.
///
/// `is_all` marks the synthetic "everything at this level" entry the backend
/// injects; it is never listed or selectable. A node with an empty `list`
/// is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub is_delete: bool,
    #[serde(default)]
    pub is_all: bool,
    #[serde(default)]
    pub category_level: i32,
    #[serde(default)]
    pub list: Vec<Category>,
}

impl Category {
    pub fn is_leaf(&self) -> bool {
        self.list.is_empty()
    }

    /// Whether this node may appear in a selection list.
    pub fn is_selectable(&self) -> bool {
        !self.is_all && !self.is_delete
    }

    pub fn display_name(&self) -> &str {
        if self.detail.is_empty() {
            "ไม่มีชื่อ"
        } else {
            &self.detail
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryResponse {
    #[serde(rename = "productsCategoryList", default)]
    pub products_category_list: Vec<Category>,
}
