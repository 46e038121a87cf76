//! Descriptor reducer: what changed between the last observed descriptor
//! and the current one.

use crate::descriptor::ViewDescriptor;

/// One change the session has to apply. Patches come out in the order the
/// session must apply them: dataset first, then filter, summary, selection,
/// sub-views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatePatch {
    SwitchDataset(Option<String>),
    SetSearch(Option<String>),
    SetSummarize(bool),
    SelectRecord(Option<String>),
    SetSubViews(Vec<String>),
}

/// Patches that turn `prior` into `next`. Identical descriptors give none.
#[must_use]
pub fn reduce(prior: &ViewDescriptor, next: &ViewDescriptor) -> Vec<StatePatch> {
    let mut patches = Vec::new();
    if prior.map() != next.map() {
        patches.push(StatePatch::SwitchDataset(next.map().map(str::to_owned)));
    }
    if prior.search() != next.search() {
        patches.push(StatePatch::SetSearch(next.search().map(str::to_owned)));
    }
    if prior.summarize() != next.summarize() {
        patches.push(StatePatch::SetSummarize(next.summarize()));
    }
    if prior.id() != next.id() {
        patches.push(StatePatch::SelectRecord(next.id().map(str::to_owned)));
    }
    if prior.details() != next.details() {
        patches.push(StatePatch::SetSubViews(next.details()));
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_descriptors_produce_no_patches() {
        let d = ViewDescriptor::parse_fragment("map=cities&id=4&details=map");
        assert!(reduce(&d, &d.clone()).is_empty());
    }

    #[test]
    fn one_patch_per_changed_key_in_apply_order() {
        let prior = ViewDescriptor::parse_fragment("map=cities&id=4");
        let next = ViewDescriptor::parse_fragment("id=9&map=visits&summarize=true");
        assert_eq!(
            reduce(&prior, &next),
            vec![
                StatePatch::SwitchDataset(Some("visits".to_owned())),
                StatePatch::SetSummarize(true),
                StatePatch::SelectRecord(Some("9".to_owned())),
            ]
        );
    }

    #[test]
    fn removed_keys_become_clearing_patches() {
        let prior = ViewDescriptor::parse_fragment("search=ath&details=list,map");
        let next = ViewDescriptor::new();
        assert_eq!(
            reduce(&prior, &next),
            vec![StatePatch::SetSearch(None), StatePatch::SetSubViews(Vec::new())]
        );
    }

    #[test]
    fn reordered_keys_are_not_a_change() {
        let prior = ViewDescriptor::parse_fragment("map=a&id=1");
        let next = ViewDescriptor::parse_fragment("id=1&map=a");
        assert!(reduce(&prior, &next).is_empty());
    }
}
