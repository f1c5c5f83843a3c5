//! Registry of known form types.
//!
//! Each supported form is a static `FormDescriptor`: the identifier stored as
//! a document's type, the text that recognizes the form in a scanned
//! document, and the ordered field queries that drive extraction.
//!
//! Adding a form type requires:
//! 1. A descriptor constant in its own module
//! 2. An entry in `DESCRIPTORS`

mod dd214;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

/// Static definition of a known form type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormDescriptor {
    /// Document type recorded for matching documents
    pub identifier: &'static str,

    /// Text that appears on every instance of the form
    pub matcher: &'static str,

    /// Field queries in the order they appear on the form
    pub queries: &'static [&'static str],
}

/// All supported forms, in matching priority order.
const DESCRIPTORS: &[FormDescriptor] = &[dd214::DD214];

/// Lookup over the supported form descriptors.
pub struct FormRegistry {
    forms: Vec<&'static FormDescriptor>,
    by_identifier: HashMap<&'static str, &'static FormDescriptor>,
}

impl FormRegistry {
    /// Build the registry from the static descriptor table
    pub fn new() -> Self {
        Self::from_descriptors(DESCRIPTORS)
    }

    fn from_descriptors(descriptors: &'static [FormDescriptor]) -> Self {
        let forms: Vec<_> = descriptors.iter().collect();
        let by_identifier = forms.iter().map(|form| (form.identifier, *form)).collect();

        Self {
            forms,
            by_identifier,
        }
    }

    /// Get a descriptor by its identifier
    pub fn get(&self, identifier: &str) -> Option<&'static FormDescriptor> {
        self.by_identifier.get(identifier).copied()
    }

    /// Find the first form whose matcher occurs in the document text.
    ///
    /// Matching ignores ASCII case and runs of whitespace, since OCR output
    /// rarely preserves either.
    #[allow(dead_code)]
    pub fn identify(&self, text: &str) -> Option<&'static FormDescriptor> {
        let haystack = normalize(text);
        self.forms
            .iter()
            .find(|form| haystack.contains(&normalize(form.matcher)))
            .copied()
    }

    /// Iterator over all descriptors in priority order
    pub fn iter(&self) -> impl Iterator<Item = &'static FormDescriptor> + '_ {
        self.forms.iter().copied()
    }

    /// Number of registered forms
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Check if registry is empty
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global form registry instance
pub static FORMS: LazyLock<FormRegistry> = LazyLock::new(FormRegistry::new);

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
