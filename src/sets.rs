// Set resolution and concurrent member pagination
use crate::client::{AlmaClient, ApiRequest};
use crate::dispatch;
use crate::error::{ApiError, BulkOutcome, Result};
use crate::model::{Member, Members, Set, SetContent, SetKind, Sets};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

const SETS_PATH: &str = "/almaws/v1/conf/sets";

/// How the user identified a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetRef {
    Name(String),
    Id(String),
}

impl SetRef {
    /// Build from the mutually exclusive name and ID options.
    pub fn from_options(name: Option<String>, id: Option<String>) -> anyhow::Result<Self> {
        match (name.filter(|n| !n.is_empty()), id.filter(|i| !i.is_empty())) {
            (Some(name), None) => Ok(SetRef::Name(name)),
            (None, Some(id)) => Ok(SetRef::Id(id)),
            (None, None) => anyhow::bail!("a set name or a set ID are required"),
            (Some(_), Some(_)) => anyhow::bail!("a set name OR a set ID can be provided, not both"),
        }
    }
}

/// Shape of set an operation works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRequirement {
    pub kind: SetKind,
    pub content: SetContent,
    pub label: &'static str,
}

/// Item commands need a logical set of items
pub const LOGICAL_ITEMS: SetRequirement = SetRequirement {
    kind: SetKind::Logical,
    content: SetContent::Item,
    label: "logical set of items",
};

/// Holdings cleanup needs a logical set of bibs
pub const LOGICAL_BIBS: SetRequirement = SetRequirement {
    kind: SetKind::Logical,
    content: SetContent::BibMms,
    label: "logical set of bibs",
};

impl SetRequirement {
    pub fn check(&self, set: &Set) -> Result<()> {
        if set.kind() == self.kind && set.content() == self.content {
            return Ok(());
        }
        Err(ApiError::WrongSetKind {
            set: set.name.clone(),
            kind: set.set_type.value.clone(),
            content: set.content.value.clone(),
            expected: self.label,
        })
    }
}

/// Number of `page_size` pages needed for `count` members.
pub fn page_count(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

impl AlmaClient {
    /// Resolve a set reference to the full set record.
    pub async fn resolve_set(&self, cancel: &CancellationToken, set: &SetRef) -> Result<Set> {
        let id = match set {
            SetRef::Id(id) => id.clone(),
            SetRef::Name(name) => {
                let id = self.set_id_from_name(cancel, name).await?;
                log::info!("ID {} found for set name {}.", id, name);
                id
            }
        };
        self.set_from_id(cancel, &id).await
    }

    /// Search sets by name and return the ID of the one whose trimmed name matches exactly.
    pub async fn set_id_from_name(&self, cancel: &CancellationToken, name: &str) -> Result<String> {
        let request = ApiRequest::get(SETS_PATH).query("q", format!("name~{}", name));
        let sets: Sets = self.fetch(cancel, "sets", request).await?;
        let wanted = name.trim();
        sets.sets
            .into_iter()
            .find(|set| set.name.trim() == wanted)
            .map(|set| set.id)
            .ok_or_else(|| ApiError::SetNotFound {
                name: name.to_string(),
            })
    }

    pub async fn set_from_id(&self, cancel: &CancellationToken, id: &str) -> Result<Set> {
        self.fetch(cancel, "set", ApiRequest::get(format!("{}/{}", SETS_PATH, id)))
            .await
    }

    /// One page of members starting at `offset`.
    pub async fn set_members_page(
        &self,
        cancel: &CancellationToken,
        set: &Set,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Member>> {
        let base = if set.link.is_empty() {
            format!("{}/{}", SETS_PATH, set.id)
        } else {
            set.link.clone()
        };
        let request = ApiRequest::get(format!("{}/members", base))
            .query("limit", limit.to_string())
            .query("offset", offset.to_string());
        let page: Members = self.fetch(cancel, "members", request).await?;
        Ok(page.members)
    }

    /// Fetch every member of a set, one concurrent job per page.
    ///
    /// Members are deduplicated by ID. If the deduplicated count differs from
    /// the set's declared size, no members are returned and a
    /// [`ApiError::CountMismatch`] is appended to the failures.
    pub async fn fetch_all_members(&self, cancel: &CancellationToken, set: &Set) -> BulkOutcome<Member> {
        let page_size = self.config().page_size;
        let pages = page_count(set.declared_count(), page_size);

        let outcome = dispatch::for_each(
            cancel,
            self.config().workers,
            "Getting set members",
            self.progress(),
            0..pages,
            |page, token| {
                let client = self.clone();
                let set = set.clone();
                async move {
                    client
                        .set_members_page(&token, &set, page_size, page * page_size)
                        .await
                }
            },
        )
        .await;

        let mut unique: HashMap<String, Member> = HashMap::with_capacity(set.declared_count());
        for member in outcome.succeeded.into_iter().flatten() {
            unique.insert(member.id.clone(), member);
        }
        let mut failures = outcome.failures;

        if unique.len() != set.declared_count() {
            failures.push(ApiError::CountMismatch {
                set: set.name.clone(),
                found: unique.len(),
                expected: set.declared_count(),
            });
            return BulkOutcome::new(Vec::new(), failures);
        }
        BulkOutcome::new(unique.into_values().collect(), failures)
    }
}
