//! Classification backed by the `[classification]` and `[pinned]` config
//! sections.

use crate::domain::error::RiskfuseError;
use crate::domain::fundamentals::{Classification, InstrumentClass};
use crate::domain::universe::parse_codes;
use crate::ports::classification_port::ClassificationPort;
use crate::ports::config_port::ConfigPort;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct StaticClassifier {
    classes: BTreeMap<String, InstrumentClass>,
    pinned: BTreeSet<String>,
}

impl StaticClassifier {
    pub fn new(classes: BTreeMap<String, InstrumentClass>, pinned: BTreeSet<String>) -> Self {
        Self { classes, pinned }
    }

    /// `CODE = tag` lines under `[classification]`, `codes = A,B` under `[pinned]`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RiskfuseError> {
        let mut classes = BTreeMap::new();
        for key in config.section_keys("classification") {
            let tag = config.get_string("classification", &key).unwrap_or_default();
            let class = InstrumentClass::from_tag(&tag).ok_or_else(|| {
                RiskfuseError::invalid(
                    "classification",
                    &key,
                    format!("unknown classification tag '{}'", tag),
                )
            })?;
            classes.insert(key.to_uppercase(), class);
        }

        let pinned = match config.get_string("pinned", "codes") {
            Some(list) if !list.trim().is_empty() => parse_codes(&list)
                .map_err(|e| RiskfuseError::invalid("pinned", "codes", e.to_string()))?
                .into_iter()
                .collect(),
            _ => BTreeSet::new(),
        };

        tracing::debug!(
            classified = classes.len(),
            pinned = pinned.len(),
            "classification loaded"
        );
        Ok(Self { classes, pinned })
    }
}

impl ClassificationPort for StaticClassifier {
    fn classify(&self, code: &str) -> Classification {
        let code = code.trim().to_uppercase();
        Classification {
            class: self
                .classes
                .get(&code)
                .copied()
                .unwrap_or(InstrumentClass::Unclassified),
            pinned: self.pinned.contains(&code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn classifies_from_config_sections() {
        let config = FileConfigAdapter::from_string(
            "[classification]\nASELS = defense\nkchol = Holding\nLOGO = tech\n\n[pinned]\ncodes = asels, KCHOL\n",
        )
        .unwrap();
        let c = StaticClassifier::from_config(&config).unwrap();

        assert_eq!(
            c.classify("ASELS"),
            Classification {
                class: InstrumentClass::Defense,
                pinned: true
            }
        );
        assert_eq!(c.classify("kchol").class, InstrumentClass::Holding);
        assert_eq!(c.classify("LOGO").class, InstrumentClass::Technology);
        assert!(!c.classify("LOGO").pinned);
        assert_eq!(c.classify("NOPE"), Classification::default());
    }

    #[test]
    fn unknown_tag_is_invalid() {
        let config = FileConfigAdapter::from_string("[classification]\nXYZ = crypto\n").unwrap();
        let err = StaticClassifier::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            RiskfuseError::ConfigInvalid { section, key, .. }
                if section == "classification" && key == "xyz"
        ));
    }

    #[test]
    fn empty_config_classifies_nothing() {
        let config = FileConfigAdapter::from_string("").unwrap();
        let c = StaticClassifier::from_config(&config).unwrap();
        assert_eq!(c.classify("ANY"), Classification::default());
    }
}
