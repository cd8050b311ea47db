//! FILENAME: selection-engine/src/others.rs
//! The top-N Others bucket.
//!
//! Others stands for every value not shown next to it, so its filter is
//! NOT ONE-OF the concrete siblings displayed in the same group context.
//! "Same group context" is the full chain of ancestor values on both the
//! calc-grid and the crosstab path.

use rustc_hash::FxHashSet;

use condition_list::{ConditionField, ConditionItem, ConditionNode, DataValue};
use drill_engine::{log_debug, DrillConfig, NamedGroupDef};

/// Builds the Others filter from the sibling values seen next to it.
///
/// Other Others cells, collapsed placeholders and named-group labels are not
/// concrete values and are skipped. A null sibling keeps nulls out of the
/// bucket. With no usable sibling at all the filter degrades to NOT-NULL.
pub fn others_condition<I>(
    field: &ConditionField,
    siblings: I,
    config: &DrillConfig,
    groups: Option<&NamedGroupDef>,
) -> ConditionNode
where
    I: IntoIterator<Item = DataValue>,
{
    let mut seen: FxHashSet<DataValue> = FxHashSet::default();
    let mut values: Vec<DataValue> = Vec::new();
    let mut null_seen = false;

    for value in siblings {
        if value.is_null() {
            null_seen = true;
            continue;
        }
        if let Some(text) = value.as_text() {
            if text == config.others_label
                || text == config.collapsed_placeholder
                || groups.map_or(false, |g| g.is_group_label(text))
            {
                continue;
            }
        }
        if seen.insert(value.clone()) {
            values.push(value);
        }
    }

    let not_null = ConditionNode::Leaf(ConditionItem::not_null(field.clone()));
    if values.is_empty() {
        log_debug!("SELECT", "Others on {} has no comparable siblings, using NOT NULL", field);
        return not_null;
    }

    let not_in = ConditionNode::Leaf(ConditionItem::not_one_of(field.clone(), values));
    if null_seen {
        ConditionNode::And(vec![not_in, not_null])
    } else {
        not_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_engine::NamedGroup;
    use std::collections::HashMap;

    fn state() -> ConditionField {
        ConditionField::column("State")
    }

    #[test]
    fn test_siblings_are_deduplicated_and_filtered() {
        let config = DrillConfig::default();
        let siblings: Vec<DataValue> =
            vec!["NJ".into(), "CA".into(), "NJ".into(), "Others".into(), "\u{2026}".into()];
        let node = others_condition(&state(), siblings, &config, None);
        assert_eq!(node.to_string(), "State NOT ONE-OF {NJ,CA}");
    }

    #[test]
    fn test_single_sibling_stays_not_one_of() {
        let node = others_condition(&state(), vec!["NJ".into()], &DrillConfig::default(), None);
        assert_eq!(node.to_string(), "State NOT ONE-OF {NJ}");
    }

    #[test]
    fn test_null_rows_stay_in_bucket_for_any_sibling_count() {
        let config = DrillConfig::default();
        let null_row: HashMap<String, DataValue> = [("State".to_string(), DataValue::Null)].into_iter().collect();
        let nj_row: HashMap<String, DataValue> = [("State".to_string(), DataValue::from("NJ"))].into_iter().collect();

        let one = others_condition(&state(), vec!["NJ".into()], &config, None);
        let two = others_condition(&state(), vec!["NJ".into(), "NY".into()], &config, None);
        assert!(one.matches(&null_row));
        assert!(two.matches(&null_row));
        assert!(!one.matches(&nj_row));
        assert!(!two.matches(&nj_row));
    }

    #[test]
    fn test_null_sibling_excludes_nulls() {
        let siblings = vec!["NJ".into(), "CA".into(), DataValue::Null];
        let node = others_condition(&state(), siblings, &DrillConfig::default(), None);
        assert_eq!(node.to_string(), "State NOT ONE-OF {NJ,CA} AND State IS NOT NULL");
    }

    #[test]
    fn test_degenerate_bucket_falls_back_to_not_null() {
        let groups = NamedGroupDef::new(vec![NamedGroup::from_members("East", state(), vec!["NJ".into()])]);
        let siblings = vec!["East".into(), "Other".into(), "Others".into()];
        let node = others_condition(&state(), siblings, &DrillConfig::default(), Some(&groups));
        assert_eq!(node.to_string(), "State IS NOT NULL");
    }
}
