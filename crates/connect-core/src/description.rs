// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Adapter descriptions and their static properties.
//!
//! An [`AdapterDescription`] is the static model an adapter declares
//! (`declare_model`) and, once filled in by a user, the configuration it is
//! instantiated with. Properties are addressed by internal name.
//!
//! ```text
//! AdapterDescription
//! └── static_properties
//!     ├── FreeText / Secret            single values
//!     ├── Group                        nested properties
//!     ├── Alternatives                 exactly one branch selected
//!     │   └── Alternative { property } branch content
//!     └── MultiValueSelection          options, some selected
//! ```
//!
//! [`StaticPropertyExtractor`] reads values back out. Lookups descend into
//! groups and into the content of *selected* alternatives only, so values of
//! an unselected branch are invisible.

use serde::{Deserialize, Serialize};

use crate::types::SelectOption;

// =============================================================================
// StaticProperty
// =============================================================================

/// A configurable property of an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StaticProperty {
    /// A single free text value.
    FreeText {
        /// Internal name.
        internal_name: String,
        /// Current value, if filled in.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// A secret value such as a password.
    Secret {
        /// Internal name.
        internal_name: String,
        /// Current value, if filled in.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// A named group of properties.
    Group {
        /// Internal name.
        internal_name: String,
        /// Grouped properties.
        properties: Vec<StaticProperty>,
    },

    /// Mutually exclusive alternatives.
    Alternatives {
        /// Internal name.
        internal_name: String,
        /// The branches.
        alternatives: Vec<StaticPropertyAlternative>,
    },

    /// A selection from a list of options.
    MultiValueSelection {
        /// Internal name.
        internal_name: String,
        /// Internal names of properties the options depend on.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        depends_on: Vec<String>,
        /// Available options.
        #[serde(default)]
        options: Vec<SelectOption>,
    },
}

impl StaticProperty {
    /// Creates an empty free text property.
    pub fn free_text(internal_name: impl Into<String>) -> Self {
        Self::FreeText {
            internal_name: internal_name.into(),
            value: None,
        }
    }

    /// Creates an empty secret property.
    pub fn secret(internal_name: impl Into<String>) -> Self {
        Self::Secret {
            internal_name: internal_name.into(),
            value: None,
        }
    }

    /// Creates a group.
    pub fn group(internal_name: impl Into<String>, properties: Vec<StaticProperty>) -> Self {
        Self::Group {
            internal_name: internal_name.into(),
            properties,
        }
    }

    /// Creates an alternatives property with nothing selected.
    pub fn alternatives(
        internal_name: impl Into<String>,
        alternatives: Vec<StaticPropertyAlternative>,
    ) -> Self {
        Self::Alternatives {
            internal_name: internal_name.into(),
            alternatives,
        }
    }

    /// Creates a multi value selection without options.
    pub fn multi_value_selection(internal_name: impl Into<String>, depends_on: &[&str]) -> Self {
        Self::MultiValueSelection {
            internal_name: internal_name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            options: Vec::new(),
        }
    }

    /// Returns the internal name.
    pub fn internal_name(&self) -> &str {
        match self {
            Self::FreeText { internal_name, .. }
            | Self::Secret { internal_name, .. }
            | Self::Group { internal_name, .. }
            | Self::Alternatives { internal_name, .. }
            | Self::MultiValueSelection { internal_name, .. } => internal_name,
        }
    }
}

/// One branch of an [`StaticProperty::Alternatives`] property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPropertyAlternative {
    /// Internal name of the branch.
    pub internal_name: String,
    /// Whether this branch is the chosen one.
    #[serde(default)]
    pub selected: bool,
    /// Content of the branch, if it has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Box<StaticProperty>>,
}

impl StaticPropertyAlternative {
    /// Creates an unselected branch without content.
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            selected: false,
            property: None,
        }
    }

    /// Creates an unselected branch with content.
    pub fn with_property(internal_name: impl Into<String>, property: StaticProperty) -> Self {
        Self {
            internal_name: internal_name.into(),
            selected: false,
            property: Some(Box::new(property)),
        }
    }
}

// =============================================================================
// AdapterDescription
// =============================================================================

/// Static description of an adapter, optionally filled in with values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterDescription {
    /// Stable adapter id.
    pub app_id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Categories for grouping in a catalogue.
    #[serde(default)]
    pub category: Vec<String>,
    /// Configurable properties.
    #[serde(default)]
    pub static_properties: Vec<StaticProperty>,
}

impl AdapterDescription {
    /// Starts building a description.
    pub fn builder(app_id: impl Into<String>) -> AdapterDescriptionBuilder {
        AdapterDescriptionBuilder {
            description: AdapterDescription {
                name: String::new(),
                app_id: app_id.into(),
                description: String::new(),
                category: Vec::new(),
                static_properties: Vec::new(),
            },
        }
    }

    /// Returns an extractor over this description's properties.
    pub fn extractor(&self) -> StaticPropertyExtractor<'_> {
        StaticPropertyExtractor::new(&self.static_properties)
    }

    /// Sets the value of a free text or secret property.
    ///
    /// Returns `false` if no such property exists.
    pub fn set_value(&mut self, internal_name: &str, value: impl Into<String>) -> bool {
        match find_mut(&mut self.static_properties, internal_name) {
            Some(StaticProperty::FreeText { value: slot, .. })
            | Some(StaticProperty::Secret { value: slot, .. }) => {
                *slot = Some(value.into());
                true
            }
            _ => false,
        }
    }

    /// Selects one branch of an alternatives property, deselecting the others.
    ///
    /// Returns `false` if the property or branch does not exist.
    pub fn select_alternative(&mut self, internal_name: &str, branch: &str) -> bool {
        match find_mut(&mut self.static_properties, internal_name) {
            Some(StaticProperty::Alternatives { alternatives, .. }) => {
                if !alternatives.iter().any(|a| a.internal_name == branch) {
                    return false;
                }
                for alt in alternatives.iter_mut() {
                    alt.selected = alt.internal_name == branch;
                }
                true
            }
            _ => false,
        }
    }

    /// Replaces the options of a selection property.
    ///
    /// Returns `false` if the property does not exist.
    pub fn set_options(&mut self, internal_name: &str, new_options: Vec<SelectOption>) -> bool {
        match find_mut(&mut self.static_properties, internal_name) {
            Some(StaticProperty::MultiValueSelection { options, .. }) => {
                *options = new_options;
                true
            }
            _ => false,
        }
    }
}

fn find_mut<'a>(properties: &'a mut [StaticProperty], name: &str) -> Option<&'a mut StaticProperty> {
    for property in properties.iter_mut() {
        if property.internal_name() == name {
            return Some(property);
        }
        let nested = match property {
            StaticProperty::Group { properties, .. } => find_mut(properties, name),
            StaticProperty::Alternatives { alternatives, .. } => alternatives
                .iter_mut()
                .filter_map(|a| a.property.as_deref_mut())
                .find_map(|p| find_mut(std::slice::from_mut(p), name)),
            _ => None,
        };
        if nested.is_some() {
            return nested;
        }
    }
    None
}

/// Builder for [`AdapterDescription`].
#[derive(Debug)]
pub struct AdapterDescriptionBuilder {
    description: AdapterDescription,
}

impl AdapterDescriptionBuilder {
    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.description.name = name.into();
        self
    }

    /// Sets the short description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description.description = text.into();
        self
    }

    /// Adds a category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.description.category.push(category.into());
        self
    }

    /// Adds a static property.
    pub fn property(mut self, property: StaticProperty) -> Self {
        self.description.static_properties.push(property);
        self
    }

    /// Finishes the description.
    pub fn build(self) -> AdapterDescription {
        self.description
    }
}

// =============================================================================
// StaticPropertyExtractor
// =============================================================================

/// Read access to filled-in static properties.
#[derive(Debug, Clone, Copy)]
pub struct StaticPropertyExtractor<'a> {
    properties: &'a [StaticProperty],
}

impl<'a> StaticPropertyExtractor<'a> {
    /// Creates an extractor over a property list.
    pub fn new(properties: &'a [StaticProperty]) -> Self {
        Self { properties }
    }

    /// Returns the internal name of the selected branch of an alternatives
    /// property, or `None` if the property is missing or nothing is selected.
    pub fn selected_alternative(&self, internal_name: &str) -> Option<&'a str> {
        match self.find(internal_name)? {
            StaticProperty::Alternatives { alternatives, .. } => alternatives
                .iter()
                .find(|a| a.selected)
                .map(|a| a.internal_name.as_str()),
            _ => None,
        }
    }

    /// Returns the non-empty value of a free text property.
    pub fn text(&self, internal_name: &str) -> Option<&'a str> {
        match self.find(internal_name)? {
            StaticProperty::FreeText { value, .. } => non_empty(value.as_deref()),
            _ => None,
        }
    }

    /// Returns the non-empty value of a secret property.
    pub fn secret(&self, internal_name: &str) -> Option<&'a str> {
        match self.find(internal_name)? {
            StaticProperty::Secret { value, .. } => non_empty(value.as_deref()),
            _ => None,
        }
    }

    /// Returns the selected options of a selection property.
    pub fn selected_options(&self, internal_name: &str) -> Vec<&'a SelectOption> {
        match self.find(internal_name) {
            Some(StaticProperty::MultiValueSelection { options, .. }) => {
                options.iter().filter(|o| o.selected).collect()
            }
            _ => Vec::new(),
        }
    }

    fn find(&self, internal_name: &str) -> Option<&'a StaticProperty> {
        find_visible(self.properties, internal_name)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn find_visible<'a>(properties: &'a [StaticProperty], name: &str) -> Option<&'a StaticProperty> {
    for property in properties {
        if property.internal_name() == name {
            return Some(property);
        }
        let nested = match property {
            StaticProperty::Group { properties, .. } => find_visible(properties, name),
            StaticProperty::Alternatives { alternatives, .. } => alternatives
                .iter()
                .filter(|a| a.selected)
                .filter_map(|a| a.property.as_deref())
                .find_map(|p| find_visible(std::slice::from_ref(p), name)),
            _ => None,
        };
        if nested.is_some() {
            return nested;
        }
    }
    None
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> AdapterDescription {
        AdapterDescription::builder("test.adapter")
            .name("Test")
            .property(StaticProperty::alternatives(
                "MODE",
                vec![
                    StaticPropertyAlternative::new("NONE"),
                    StaticPropertyAlternative::with_property(
                        "LOGIN",
                        StaticProperty::group(
                            "LOGIN_GROUP",
                            vec![StaticProperty::free_text("USER"), StaticProperty::secret("PASS")],
                        ),
                    ),
                ],
            ))
            .property(StaticProperty::free_text("ROOT"))
            .property(StaticProperty::multi_value_selection("ITEMS", &["ROOT"]))
            .build()
    }

    #[test]
    fn test_unselected_alternative() {
        let desc = description();
        assert_eq!(desc.extractor().selected_alternative("MODE"), None);
    }

    #[test]
    fn test_values_inside_unselected_branch_are_hidden() {
        let mut desc = description();
        assert!(desc.set_value("USER", "alice"));
        assert_eq!(desc.extractor().text("USER"), None);

        assert!(desc.select_alternative("MODE", "LOGIN"));
        assert_eq!(desc.extractor().selected_alternative("MODE"), Some("LOGIN"));
        assert_eq!(desc.extractor().text("USER"), Some("alice"));
    }

    #[test]
    fn test_select_alternative_is_exclusive() {
        let mut desc = description();
        assert!(desc.select_alternative("MODE", "LOGIN"));
        assert!(desc.select_alternative("MODE", "NONE"));
        assert_eq!(desc.extractor().selected_alternative("MODE"), Some("NONE"));
        assert!(!desc.select_alternative("MODE", "MISSING"));
    }

    #[test]
    fn test_blank_text_is_absent() {
        let mut desc = description();
        desc.set_value("ROOT", "   ");
        assert_eq!(desc.extractor().text("ROOT"), None);
    }

    #[test]
    fn test_selected_options() {
        let mut desc = description();
        assert!(desc.set_options(
            "ITEMS",
            vec![SelectOption::new("a", "x.a").selected(), SelectOption::new("b", "x.b")],
        ));
        let selected = desc.extractor().selected_options("ITEMS");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].internal_name, "x.a");
    }

    #[test]
    fn test_description_serde_roundtrip() {
        let desc = description();
        let json = serde_json::to_string(&desc).unwrap();
        let back: AdapterDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }
}
