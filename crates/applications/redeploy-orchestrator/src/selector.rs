//! Resource selection for taint and apply
//!
//! Both selections preserve catalog declaration order. Targeted applies are
//! sensitive to ordering when resources depend on each other implicitly, so
//! selection never sorts or deduplicates by anything but position.

use crate::context::RedeployInputs;
use crate::resource::{Resource, ResourceCatalog};
use tracing::debug;

/// Picks the resource subsets for a redeploy run
#[derive(Debug, Clone)]
pub struct ResourceSelector {
    taint_category: String,
}

impl ResourceSelector {
    /// Create a selector that taints the given category
    pub fn new(taint_category: impl Into<String>) -> Self {
        Self {
            taint_category: taint_category.into(),
        }
    }

    /// Resources that are always recreated on redeploy
    pub fn select_for_taint(
        &self,
        catalog: &ResourceCatalog,
        _inputs: &RedeployInputs,
    ) -> Vec<Resource> {
        let selected: Vec<Resource> = catalog
            .resources()
            .iter()
            .filter(|r| r.category() == self.taint_category)
            .cloned()
            .collect();

        debug!(
            category = %self.taint_category,
            selected = selected.len(),
            total = catalog.len(),
            "Selected resources for taint"
        );

        selected
    }

    /// Every resource needed for a from-scratch reinstall
    pub fn select_complete(
        &self,
        catalog: &ResourceCatalog,
        _inputs: &RedeployInputs,
    ) -> Vec<Resource> {
        catalog.resources().to_vec()
    }
}

impl Default for ResourceSelector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TAINT_CATEGORY)
    }
}
