//! Classification of "member does not exist" failures.
//!
//! Dropping or decommissioning a node that the cluster no longer knows is
//! an acceptable terminal state. The backend only signals it through error
//! text, and that text differs between operations and versions
//! ("frontend does not exist", "backend does not exists",
//! "Backend does not exist"), so the match is a loose case-insensitive
//! substring test kept behind [`NotFoundClassifier`].

use std::collections::HashMap;

/// Operations whose not-found failure counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    DropCoordinator,
    DropWorker,
    DecommissionWorker,
}

pub trait NotFoundClassifier: Send + Sync {
    /// Whether `error_text` means the target member is already gone.
    fn is_idempotent_not_found(&self, error_text: &str, kind: OperationKind) -> bool;
}

impl<F> NotFoundClassifier for F
where
    F: Fn(&str, OperationKind) -> bool + Send + Sync,
{
    fn is_idempotent_not_found(&self, error_text: &str, kind: OperationKind) -> bool {
        self(error_text, kind)
    }
}

/// Case-insensitive substring matcher with per-operation needles.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    needles: HashMap<OperationKind, Vec<String>>,
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        Self::empty()
            .with_needle(OperationKind::DropCoordinator, "frontend does not exist")
            .with_needle(OperationKind::DropWorker, "backend does not exist")
            .with_needle(OperationKind::DecommissionWorker, "backend does not exist")
    }
}

impl SubstringClassifier {
    /// A classifier that matches nothing.
    pub fn empty() -> Self {
        Self {
            needles: HashMap::new(),
        }
    }

    pub fn with_needle(mut self, kind: OperationKind, needle: &str) -> Self {
        self.needles
            .entry(kind)
            .or_default()
            .push(needle.to_ascii_lowercase());
        self
    }
}

impl NotFoundClassifier for SubstringClassifier {
    fn is_idempotent_not_found(&self, error_text: &str, kind: OperationKind) -> bool {
        let Some(needles) = self.needles.get(&kind) else {
            return false;
        };
        let text = error_text.to_ascii_lowercase();
        needles.iter().any(|n| text.contains(n.as_str()))
    }
}
