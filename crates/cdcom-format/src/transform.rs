// crates/cdcom-format/src/transform.rs
use cdcom_core::{
    ComponentDescription, ConditionComparison, ConditionLeaf, ConditionTree, FlagOptions,
    PropertyType, PropertyValue, VariableSource,
};

/// Upgrades older authoring shortcuts into their canonical form.
///
/// Two rewrites are applied, both idempotent, so re-running the
/// transformer on its own output is a no-op:
///
/// - `Truthy`/`Falsy` comparisons against variables that are known to
///   be boolean become `Equal true`/`Equal false`.
/// - A `FLIP_PRIMARY` carried by a conditional group is also set in
///   the unconditional defaults. Conditional groups keep their stored
///   value, so evaluated flag unions are unchanged.
pub fn transform(description: &ComponentDescription) -> ComponentDescription {
    let mut result = description.clone();
    let mut rewritten_leaves = 0usize;

    for group in &mut result.flags {
        group.conditions = rewrite_tree(group.conditions.clone(), description, &mut rewritten_leaves);
    }
    for group in &mut result.connections {
        group.conditions = rewrite_tree(group.conditions.clone(), description, &mut rewritten_leaves);
    }
    for group in &mut result.render_descriptions {
        group.conditions = rewrite_tree(group.conditions.clone(), description, &mut rewritten_leaves);
    }
    if rewritten_leaves > 0 {
        tracing::info!(
            "normalized {} truthiness comparisons in '{}'",
            rewritten_leaves,
            description.component_name
        );
    }

    let conditional_flip = result
        .flags
        .iter()
        .any(|group| !group.conditions.is_empty() && group.value.contains(FlagOptions::FLIP_PRIMARY));
    if conditional_flip && !result.default_flags().contains(FlagOptions::FLIP_PRIMARY) {
        result.set_default_flag(FlagOptions::FLIP_PRIMARY, true);
        tracing::info!(
            "promoted conditional flip flag to default in '{}'",
            description.component_name
        );
    }

    result
}

fn rewrite_tree(
    tree: ConditionTree,
    description: &ComponentDescription,
    rewritten: &mut usize,
) -> ConditionTree {
    match tree {
        ConditionTree::Empty => ConditionTree::Empty,
        ConditionTree::Leaf(leaf) => ConditionTree::Leaf(rewrite_leaf(leaf, description, rewritten)),
        ConditionTree::Binary { op, left, right } => ConditionTree::Binary {
            op,
            left: Box::new(rewrite_tree(*left, description, rewritten)),
            right: Box::new(rewrite_tree(*right, description, rewritten)),
        },
    }
}

fn rewrite_leaf(
    leaf: ConditionLeaf,
    description: &ComponentDescription,
    rewritten: &mut usize,
) -> ConditionLeaf {
    let target = match leaf.comparison {
        ConditionComparison::Truthy => true,
        ConditionComparison::Falsy => false,
        _ => return leaf,
    };
    if !is_statically_boolean(&leaf, description) {
        return leaf;
    }
    *rewritten += 1;
    ConditionLeaf {
        comparison: ConditionComparison::Equal,
        operand: PropertyValue::Boolean(target),
        ..leaf
    }
}

fn is_statically_boolean(leaf: &ConditionLeaf, description: &ComponentDescription) -> bool {
    match leaf.source {
        VariableSource::State => leaf.variable == "horizontal",
        VariableSource::Property => description
            .property(&leaf.variable)
            .map(|property| property.kind == PropertyType::Boolean)
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdcom_core::{ComponentFlagGroup, ComponentProperty, RenderGroup};

    fn description_with_boolean_property() -> ComponentDescription {
        let mut description = ComponentDescription::new(0, "Switch");
        description.properties.push(ComponentProperty::new(
            "Closed",
            "closed",
            "Closed",
            PropertyType::Boolean,
            PropertyValue::Boolean(false),
        ));
        description.properties.push(ComponentProperty::new(
            "Label",
            "label",
            "Label",
            PropertyType::Text,
            PropertyValue::Text(String::new()),
        ));
        description
    }

    fn truthy_leaf(source: VariableSource, variable: &str) -> ConditionTree {
        ConditionTree::leaf(
            source,
            variable,
            ConditionComparison::Truthy,
            PropertyValue::default(),
        )
    }

    #[test]
    fn test_truthy_on_boolean_property_becomes_equal() {
        let mut description = description_with_boolean_property();
        description.render_descriptions.push(RenderGroup::new(
            truthy_leaf(VariableSource::Property, "Closed"),
            Vec::new(),
        ));

        let transformed = transform(&description);
        match &transformed.render_descriptions[0].conditions {
            ConditionTree::Leaf(leaf) => {
                assert_eq!(leaf.comparison, ConditionComparison::Equal);
                assert_eq!(leaf.operand, PropertyValue::Boolean(true));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_truthy_on_text_property_is_untouched() {
        let mut description = description_with_boolean_property();
        description.render_descriptions.push(RenderGroup::new(
            truthy_leaf(VariableSource::Property, "Label"),
            Vec::new(),
        ));

        let transformed = transform(&description);
        match &transformed.render_descriptions[0].conditions {
            ConditionTree::Leaf(leaf) => {
                assert_eq!(leaf.comparison, ConditionComparison::Truthy);
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_horizontal_state_is_normalized() {
        let mut description = description_with_boolean_property();
        description.render_descriptions.push(RenderGroup::new(
            truthy_leaf(VariableSource::State, "horizontal"),
            Vec::new(),
        ));

        let transformed = transform(&description);
        match &transformed.render_descriptions[0].conditions {
            ConditionTree::Leaf(leaf) => {
                assert_eq!(leaf.comparison, ConditionComparison::Equal);
                assert_eq!(leaf.operand, PropertyValue::Boolean(true));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_flip_sets_default() {
        let mut description = description_with_boolean_property();
        description.flags.push(ComponentFlagGroup::new(
            truthy_leaf(VariableSource::Property, "Closed"),
            FlagOptions::FLIP_PRIMARY | FlagOptions::NO_RESIZE,
        ));

        let transformed = transform(&description);
        assert!(transformed
            .default_flags()
            .contains(FlagOptions::FLIP_PRIMARY));
        // The conditional group is stored untouched.
        let conditional = transformed
            .flags
            .iter()
            .find(|group| !group.conditions.is_empty())
            .unwrap();
        assert!(conditional.value.contains(FlagOptions::FLIP_PRIMARY));
        assert!(conditional.value.contains(FlagOptions::NO_RESIZE));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let mut description = description_with_boolean_property();
        description.flags.push(ComponentFlagGroup::new(
            truthy_leaf(VariableSource::Property, "Closed"),
            FlagOptions::FLIP_PRIMARY,
        ));
        description.render_descriptions.push(RenderGroup::new(
            truthy_leaf(VariableSource::State, "horizontal"),
            Vec::new(),
        ));

        let once = transform(&description);
        let twice = transform(&once);
        assert_eq!(once, twice);
    }
}
