//! Selection descriptor: the set of objects a bulk action targets

use crate::error::{GroupOpError, Result};
use crate::object_range::ObjectRange;
use serde::{Deserialize, Serialize};

/// Target objects of a bulk action, either named explicitly or generated
/// from a range pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit, non-empty object names in caller order
    List(Vec<String>),
    /// Names generated from a range; may legitimately be empty here and
    /// is rejected at dispatch if so
    Range(ObjectRange),
}

impl Selection {
    /// Selection of explicitly named objects; fails on an empty list
    pub fn list<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(GroupOpError::EmptySelection);
        }
        Ok(Selection::List(names))
    }

    pub fn range(range: ObjectRange) -> Self {
        Selection::Range(range)
    }

    /// Number of objects the selection names
    pub fn len(&self) -> usize {
        match self {
            Selection::List(names) => names.len(),
            Selection::Range(range) => range.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every object name the selection covers, in order
    pub fn names(&self) -> Vec<String> {
        match self {
            Selection::List(names) => names.clone(),
            Selection::Range(range) => range.names(),
        }
    }

    /// Whether `name` is covered by the selection
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Selection::List(names) => names.iter().any(|n| n == name),
            Selection::Range(range) => range.contains(name),
        }
    }

    /// Wire representation handed to the cluster
    pub fn to_payload(&self) -> SelectionPayload {
        match self {
            Selection::List(names) => SelectionPayload::List {
                names: names.clone(),
            },
            Selection::Range(range) => SelectionPayload::Range {
                prefix: range.prefix().to_string(),
                start: range.start(),
                stop: range.stop(),
                step: range.step(),
                suffix: range.suffix().to_string(),
                template: range.template(),
            },
        }
    }
}

/// Build a selection from exactly one of an explicit list or a range
///
/// Supplying both is `AmbiguousSelection`; supplying neither, or an empty
/// list, is `EmptySelection`.
pub fn build_selection(
    names: Option<Vec<String>>,
    range: Option<ObjectRange>,
) -> Result<Selection> {
    match (names, range) {
        (Some(_), Some(_)) => Err(GroupOpError::AmbiguousSelection),
        (Some(names), None) => Selection::list(names),
        (None, Some(range)) => Ok(Selection::Range(range)),
        (None, None) => Err(GroupOpError::EmptySelection),
    }
}

/// Selection as serialized into a bulk action request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SelectionPayload {
    List {
        names: Vec<String>,
    },
    Range {
        prefix: String,
        start: i64,
        stop: i64,
        step: i64,
        suffix: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
}
