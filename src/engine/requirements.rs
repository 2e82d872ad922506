use crate::definition::reference::Reference;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Requirement {
    pub reference: Reference,
    /// Needed to build this package only, never handed on to its consumers.
    pub private: bool,
    pub options: BTreeMap<String, String>,
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)?;

        if self.private {
            write!(f, " (private)")?;
        }

        for (key, value) in &self.options {
            write!(f, " {}:{}={}", self.reference.name, key, value)?;
        }

        Ok(())
    }
}

/// What the recipe asks the dependency manager for. Nothing here is resolved.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Requirements(Vec<Requirement>);

impl Requirements {
    pub fn requires(
        &mut self,
        reference: Reference,
        private: bool,
        options: BTreeMap<String, String>,
    ) -> &mut Self {
        self.0.push(Requirement {
            reference,
            private,
            options,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.0.iter()
    }

    /// The requirements consumers of this package inherit.
    pub fn public(&self) -> impl Iterator<Item = &Requirement> {
        self.0.iter().filter(|x| !x.private)
    }
}
