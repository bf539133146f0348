//! Labels that tie a dependent to its primary.

use crate::constants::{LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME, OPERATOR_NAME};
use crate::store::LabelSelector;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Full label set written onto every dependent of `primary`
pub fn resource_labels<P: ResourceExt>(app: &str, primary: &P) -> BTreeMap<String, String> {
    let mut labels = selector_labels(app, primary);
    labels.insert(LABEL_MANAGED_BY.to_string(), OPERATOR_NAME.to_string());
    labels
}

/// Subset of [`resource_labels`] used to select pods and discover dependents
pub fn selector_labels<P: ResourceExt>(app: &str, primary: &P) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), app.to_string()),
        (LABEL_INSTANCE.to_string(), primary.name_any()),
    ])
}

/// Selector matching every dependent of `primary`
pub fn selector<P: ResourceExt>(app: &str, primary: &P) -> LabelSelector {
    LabelSelector::from_labels(&selector_labels(app, primary))
}
