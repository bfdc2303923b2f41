//! Persisted shape of a design and conversion to and from the live model.
//!
//! Runs of empty rows are stored as a `topSpace` count on the next populated
//! row and expanded back into empty rows on import. The trailing
//! placeholder row is never stored.

use crate::error::{CanvasError, CanvasResult};
use crate::grid::ColumnSpan;
use crate::model::{
    Component, Design, DesignSettings, ElementId, Fragment, FragmentInstance, FragmentMode, Group,
    Item, LayoutMode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn default_min_space() -> usize {
    1
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// A stored design document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_cols: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_number_of_rows: Option<usize>,
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    /// Empty rows preceding this one.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub top_space: usize,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    #[serde(default)]
    pub left_space: usize,
    pub space: usize,
    #[serde(default = "default_min_space")]
    pub min_space: usize,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub props: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fragments: BTreeMap<String, FragmentDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentDefinition {
    #[serde(rename = "type")]
    pub fragment_type: String,
    #[serde(default)]
    pub mode: FragmentMode,
    #[serde(default)]
    pub instances: Vec<FragmentInstanceDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentInstanceDefinition {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sketch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

impl DesignDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `settings` with every value present in this definition applied on top.
    pub fn apply_to(&self, settings: DesignSettings) -> DesignSettings {
        DesignSettings {
            base_width: self.base_width.unwrap_or(settings.base_width),
            number_of_cols: self.number_of_cols.unwrap_or(settings.number_of_cols),
            row_height: self.row_height.unwrap_or(settings.row_height),
            default_number_of_rows: self
                .default_number_of_rows
                .unwrap_or(settings.default_number_of_rows),
        }
    }
}

impl Design {
    /// Build a design from a stored definition.
    ///
    /// Rows expanded from `topSpace` and padding rows are grid rows. The
    /// design is padded to `default_number_of_rows - 1` rows and closed with
    /// a placeholder. A grid row whose items run past the last column is
    /// rejected with [`CanvasError::Conflict`].
    pub fn from_definition(
        settings: DesignSettings,
        definition: &DesignDefinition,
    ) -> CanvasResult<Self> {
        let mut design = Design::new(definition.apply_to(settings));

        for group_def in &definition.groups {
            for _ in 0..group_def.top_space {
                design.push_group(Group::new(LayoutMode::Grid));
            }
            let group_id = design.push_group(Group::new(group_def.layout_mode));

            let mut previous_end: Option<usize> = None;
            for item_def in &group_def.items {
                let item = match group_def.layout_mode {
                    LayoutMode::Grid => {
                        let start = previous_end.map_or(item_def.left_space, |end| {
                            end + 1 + item_def.left_space
                        });
                        let end = start + item_def.space.max(1) - 1;
                        if end > design.last_col() {
                            return Err(CanvasError::Conflict {
                                group: group_id,
                                start,
                                end,
                            });
                        }
                        previous_end = Some(end);
                        Item::new(group_id, ColumnSpan::new(start, end), item_def.min_space)
                    }
                    LayoutMode::Fixed => Item::fixed(
                        group_id,
                        item_def.left_space,
                        item_def.space,
                        item_def.min_space,
                    ),
                };
                let item_id = design.insert_item(item)?;
                for component_def in &item_def.components {
                    design.build_component(item_id, component_def, None)?;
                }
            }
        }

        let padded_rows = design.default_number_of_rows.saturating_sub(1);
        while design.groups.len() < padded_rows {
            design.push_group(Group::new(LayoutMode::Grid));
        }
        design.push_group(Group::placeholder(LayoutMode::Grid));
        design.reindex(None);

        log::debug!(
            "Imported design {} with {} rows and {} components",
            design.id,
            design.groups.len(),
            design.components.len()
        );
        Ok(design)
    }

    /// Export the design, compacting empty rows into `topSpace`.
    ///
    /// Trailing empty rows and the placeholder are dropped.
    pub fn to_definition(&self) -> DesignDefinition {
        let mut groups = Vec::new();
        let mut pending_space = 0;

        for group in self.groups() {
            if group.placeholder {
                continue;
            }
            if group.is_empty() {
                pending_space += 1;
                continue;
            }
            groups.push(GroupDefinition {
                top_space: pending_space,
                layout_mode: group.layout_mode,
                items: self
                    .items_in(group.id())
                    .map(|item| ItemDefinition {
                        left_space: item.left_space,
                        space: item.space,
                        min_space: item.min_space,
                        components: self.component_definitions(item.components()),
                    })
                    .collect(),
            });
            pending_space = 0;
        }

        DesignDefinition {
            base_width: Some(self.base_width),
            number_of_cols: Some(self.number_of_cols),
            row_height: Some(self.row_height),
            default_number_of_rows: Some(self.default_number_of_rows),
            groups,
        }
    }

    fn component_definitions(&self, ids: &[ElementId]) -> Vec<ComponentDefinition> {
        ids.iter()
            .filter_map(|id| self.component_definition(*id))
            .collect()
    }

    /// Definition of a single component and everything nested in it.
    pub fn component_definition(&self, id: ElementId) -> Option<ComponentDefinition> {
        let component = self.components.get(&id)?;
        let fragments = component
            .fragments
            .iter()
            .filter_map(|(name, fragment_id)| {
                let fragment = self.fragments.get(fragment_id)?;
                let instances = fragment
                    .instances
                    .iter()
                    .filter_map(|instance_id| self.instances.get(instance_id))
                    .map(|instance| FragmentInstanceDefinition {
                        tag: instance.tag.clone(),
                        sketch: instance.sketch.clone(),
                        style: instance.style.clone(),
                        template: instance.template.clone(),
                        components: self.component_definitions(&instance.components),
                    })
                    .collect();
                Some((
                    name.clone(),
                    FragmentDefinition {
                        fragment_type: fragment.fragment_type.clone(),
                        mode: fragment.mode,
                        instances,
                    },
                ))
            })
            .collect();

        Some(ComponentDefinition {
            component_type: component.component_type.clone(),
            props: component.props.clone(),
            bindings: component.bindings.clone(),
            expressions: component.expressions.clone(),
            template: component.template.clone(),
            fragments,
        })
    }

    /// Create a component (and its fragments) under `parent`.
    pub(crate) fn build_component(
        &mut self,
        parent: ElementId,
        definition: &ComponentDefinition,
        position: Option<usize>,
    ) -> CanvasResult<ElementId> {
        let mut component = Component::new(
            parent,
            definition.component_type.clone(),
            definition.props.clone(),
        );
        component.bindings = definition.bindings.clone();
        component.expressions = definition.expressions.clone();
        component.template = definition.template.clone();
        let component_id = self.insert_component(component, position)?;

        for (name, fragment_def) in &definition.fragments {
            let fragment_id = self.add_fragment(Fragment::new(
                component_id,
                name.clone(),
                fragment_def.fragment_type.clone(),
                fragment_def.mode,
            ))?;
            for instance_def in &fragment_def.instances {
                let mut instance = FragmentInstance::new(fragment_id, instance_def.tag.clone());
                instance.sketch = instance_def.sketch.clone();
                instance.style = instance_def.style.clone();
                instance.template = instance_def.template.clone();
                self.build_instance(instance, &instance_def.components)?;
            }
        }
        Ok(component_id)
    }

    /// Add an instance to its fragment and build its nested components.
    pub(crate) fn build_instance(
        &mut self,
        instance: FragmentInstance,
        components: &[ComponentDefinition],
    ) -> CanvasResult<ElementId> {
        let instance_id = self.add_instance(instance)?;
        for component_def in components {
            self.build_component(instance_id, component_def, None)?;
        }
        Ok(instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;
    use serde_json::json;

    fn settings() -> DesignSettings {
        DesignSettings {
            base_width: 600.0,
            number_of_cols: 12,
            row_height: 78.0,
            default_number_of_rows: 5,
        }
    }

    fn text(value: &str) -> ComponentDefinition {
        ComponentDefinition {
            component_type: "text".to_string(),
            props: json!({ "text": value }),
            ..ComponentDefinition::default()
        }
    }

    fn sample() -> DesignDefinition {
        let list = ComponentDefinition {
            component_type: "list".to_string(),
            fragments: BTreeMap::from([(
                "rows".to_string(),
                FragmentDefinition {
                    fragment_type: "row".to_string(),
                    mode: FragmentMode::Block,
                    instances: vec![FragmentInstanceDefinition {
                        tag: "div".to_string(),
                        components: vec![text("nested")],
                        ..FragmentInstanceDefinition::default()
                    }],
                },
            )]),
            ..ComponentDefinition::default()
        };

        DesignDefinition {
            groups: vec![
                GroupDefinition {
                    top_space: 0,
                    layout_mode: LayoutMode::Grid,
                    items: vec![
                        ItemDefinition {
                            left_space: 1,
                            space: 3,
                            min_space: 1,
                            components: vec![text("a")],
                        },
                        ItemDefinition {
                            left_space: 2,
                            space: 2,
                            min_space: 1,
                            components: vec![list],
                        },
                    ],
                },
                GroupDefinition {
                    top_space: 2,
                    layout_mode: LayoutMode::Grid,
                    items: vec![ItemDefinition {
                        left_space: 0,
                        space: 12,
                        min_space: 1,
                        components: vec![text("b")],
                    }],
                },
            ],
            ..DesignDefinition::default()
        }
    }

    #[test]
    fn test_import_places_items_after_previous_end() {
        let design = Design::from_definition(settings(), &sample()).unwrap();
        let first_row = design.group_ids()[0];
        let spans: Vec<_> = design.items_in(first_row).map(|item| item.span()).collect();
        assert_eq!(spans, vec![ColumnSpan::new(1, 3), ColumnSpan::new(6, 7)]);
        assert!(design.is_consistent());
    }

    #[test]
    fn test_import_rejects_overflowing_row() {
        let item = |space| ItemDefinition {
            left_space: 0,
            space,
            min_space: 1,
            components: vec![text("x")],
        };
        let definition = DesignDefinition {
            groups: vec![GroupDefinition {
                top_space: 0,
                layout_mode: LayoutMode::Grid,
                items: vec![item(12), item(2)],
            }],
            ..DesignDefinition::default()
        };

        let result = Design::from_definition(settings(), &definition);
        assert!(matches!(
            result,
            Err(CanvasError::Conflict { start: 12, end: 13, .. })
        ));
    }

    #[test]
    fn test_import_expands_top_space_and_pads() {
        let design = Design::from_definition(settings(), &sample()).unwrap();
        // row, 2 empty rows, row, then the placeholder (already past padding)
        assert_eq!(design.group_ids().len(), 5);
        let groups: Vec<_> = design.groups().collect();
        assert!(groups[1].is_empty() && groups[2].is_empty());
        assert!(!groups[3].is_empty());
        assert!(groups[4].placeholder);

        let empty = Design::from_definition(settings(), &DesignDefinition::default()).unwrap();
        assert_eq!(empty.group_ids().len(), 5);
        assert!(empty.is_consistent());
    }

    #[test]
    fn test_import_registers_contexts() {
        let design = Design::from_definition(settings(), &sample()).unwrap();
        let row = design.group_ids()[3];
        let item = design.group(row).unwrap().items()[0];
        let component = design.item(item).unwrap().components()[0];

        let context = design.registry().get(component).unwrap().context.unwrap();
        assert_eq!(context.group_id, row);
        assert_eq!(context.group_index, 3);
        assert_eq!(context.item_index, 0);
        assert_eq!(design.registry().ids_of_kind(ElementKind::FragmentInstance).len(), 1);
        assert_eq!(design.registry().ids_of_kind(ElementKind::Component).len(), 4);
    }

    #[test]
    fn test_definition_overrides_settings() {
        let definition = DesignDefinition {
            number_of_cols: Some(24),
            default_number_of_rows: Some(2),
            ..DesignDefinition::default()
        };
        let design = Design::from_definition(settings(), &definition).unwrap();
        assert_eq!(design.number_of_cols, 24);
        assert_eq!(design.base_width, 600.0);
        assert_eq!(design.group_ids().len(), 2);
    }

    #[test]
    fn test_export_round_trip() {
        let definition = sample();
        let design = Design::from_definition(settings(), &definition).unwrap();
        let exported = design.to_definition();

        assert_eq!(exported.groups, definition.groups);
        assert_eq!(exported.number_of_cols, Some(12));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = r#"{
            "numberOfCols": 6,
            "groups": [
                { "topSpace": 1, "items": [ { "space": 2, "components": [ { "type": "text" } ] } ] }
            ]
        }"#;
        let definition = DesignDefinition::from_json(json).unwrap();
        assert_eq!(definition.number_of_cols, Some(6));
        assert_eq!(definition.groups[0].top_space, 1);
        assert_eq!(definition.groups[0].items[0].min_space, 1);
        assert_eq!(definition.groups[0].layout_mode, LayoutMode::Grid);

        let out = definition.to_json().unwrap();
        assert!(out.contains("\"topSpace\":1"));
        assert!(out.contains("\"minSpace\":1"));
    }
}
