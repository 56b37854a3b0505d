//! # Service Categories and Routing
//!
//! Maps the service category a submitter picked to a forum topic in the
//! destination chat. Matching is exact: `"alumni relations"` is not
//! `"Alumni Relations"`. A miss is a normal outcome and means the message
//! goes to the chat's general thread.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Service categories offered by the request form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "Academic Relations")]
    AcademicRelations,
    #[serde(rename = "Alumni Relations")]
    AlumniRelations,
    #[serde(rename = "Document Checking")]
    DocumentChecking,
    #[serde(rename = "Partnerships IC")]
    PartnershipsIc,
    #[serde(rename = "Partnerships Request")]
    PartnershipsRequest,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        Self::AcademicRelations,
        Self::AlumniRelations,
        Self::DocumentChecking,
        Self::PartnershipsIc,
        Self::PartnershipsRequest,
    ];

    /// Name exactly as the form submits it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AcademicRelations => "Academic Relations",
            Self::AlumniRelations => "Alumni Relations",
            Self::DocumentChecking => "Document Checking",
            Self::PartnershipsIc => "Partnerships IC",
            Self::PartnershipsRequest => "Partnerships Request",
        }
    }

    /// Exact, case-sensitive lookup by submitted name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.name() == name)
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceCategory {
    type Err = RoutingTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RoutingTableError::UnknownCategory {
            name: s.to_string(),
        })
    }
}

/// Forum topic (message thread) identifier in the destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(i64);

impl TopicId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors building a [`RoutingTable`] from configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingTableError {
    #[error("Unknown service category: '{name}'")]
    UnknownCategory { name: String },
}

/// Result of resolving a submitted category string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryMatch {
    /// Recognized category, if the string named one
    pub category: Option<ServiceCategory>,

    /// Topic to post into, if the category has one configured
    pub topic_id: Option<TopicId>,
}

/// Immutable category → topic mapping, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    topics: HashMap<ServiceCategory, TopicId>,
}

impl RoutingTable {
    /// Create an empty table; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the topic for `category`.
    pub fn with_topic(mut self, category: ServiceCategory, topic_id: TopicId) -> Self {
        self.topics.insert(category, topic_id);
        self
    }

    /// Build a table from configured category names.
    ///
    /// Entries with no topic are accepted and leave the category unrouted.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingTableError::UnknownCategory`] for a name that is not
    /// one of [`ServiceCategory::ALL`], so typos surface at startup.
    pub fn from_names<'a, I>(entries: I) -> Result<Self, RoutingTableError>
    where
        I: IntoIterator<Item = (&'a str, Option<i64>)>,
    {
        let mut table = Self::new();
        for (name, topic) in entries {
            let category = name.parse::<ServiceCategory>()?;
            if let Some(id) = topic {
                table.topics.insert(category, TopicId::new(id));
            }
        }
        Ok(table)
    }

    /// Topic configured for `category`.
    pub fn topic_for(&self, category: ServiceCategory) -> Option<TopicId> {
        self.topics.get(&category).copied()
    }

    /// Resolve a submitted category string.
    pub fn resolve(&self, submitted: &str) -> CategoryMatch {
        let category = ServiceCategory::from_name(submitted);
        CategoryMatch {
            category,
            topic_id: category.and_then(|c| self.topic_for(c)),
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
#[path = "category_tests.rs"]
mod tests;
