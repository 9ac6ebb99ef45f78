//! Holdings of bib members and the call number cleanup built on them.
//!
//! Cleanup reads every bib member's holding list, then every full holding
//! record, rewrites the 852 call number subfields and, unless dry-running,
//! writes changed records back. Every changed subfield is reported as a
//! before/after pair whether or not it was written.

use crate::callnumber::{self, CALL_NUMBER_SUBFIELDS, CALL_NUMBER_TAG};
use crate::client::{AlmaClient, ApiRequest};
use crate::dispatch;
use crate::error::{ApiError, BulkOutcome, Result};
use crate::model::{self, Holding, HoldingListMember, Holdings, Member};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// One subfield value changed by cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub holding_link: String,
    pub tag: String,
    pub code: String,
    pub before: String,
    pub after: String,
    /// Whether the change was written back
    pub applied: bool,
}

/// Outcome of a cleanup run
#[derive(Debug)]
pub struct CleanupReport {
    /// Number of holding records examined
    pub examined: usize,
    pub changes: Vec<FieldChange>,
    pub updated: usize,
    pub failures: Vec<ApiError>,
}

/// Clean the call number subfields of a holding in place.
///
/// Returns one change per subfield whose value changed, with `applied` unset.
pub fn clean_holding(holding: &mut Holding) -> Vec<FieldChange> {
    let link = holding.link().to_string();
    let mut changes = Vec::new();
    for field in holding
        .record
        .data_fields
        .iter_mut()
        .filter(|f| f.tag == CALL_NUMBER_TAG)
    {
        for subfield in field
            .subfields
            .iter_mut()
            .filter(|s| CALL_NUMBER_SUBFIELDS.contains(&s.code.as_str()))
        {
            let cleaned = callnumber::clean_call_number(&subfield.value);
            if cleaned != subfield.value {
                changes.push(FieldChange {
                    holding_link: link.clone(),
                    tag: field.tag.clone(),
                    code: subfield.code.clone(),
                    before: std::mem::replace(&mut subfield.value, cleaned.clone()),
                    after: cleaned,
                    applied: false,
                });
            }
        }
    }
    changes
}

impl AlmaClient {
    /// Holding summaries listed under one bib member.
    pub async fn bib_holding_list(
        &self,
        cancel: &CancellationToken,
        member: &Member,
    ) -> Result<Vec<HoldingListMember>> {
        let request = ApiRequest::get(format!("{}/holdings", member.link));
        let holdings: Holdings = self.fetch(cancel, "holdings", request).await?;
        Ok(holdings.holdings)
    }

    pub async fn bibs_holding_lists(
        &self,
        cancel: &CancellationToken,
        members: &[Member],
    ) -> BulkOutcome<HoldingListMember> {
        let outcome = dispatch::for_each(
            cancel,
            self.config().workers,
            "Getting holding list members",
            self.progress(),
            members.iter().cloned(),
            |member, token| {
                let client = self.clone();
                async move { client.bib_holding_list(&token, &member).await }
            },
        )
        .await;
        BulkOutcome::new(
            outcome.succeeded.into_iter().flatten().collect(),
            outcome.failures,
        )
    }

    /// Full record behind a holding summary.
    pub async fn holding(
        &self,
        cancel: &CancellationToken,
        summary: &HoldingListMember,
    ) -> Result<Holding> {
        if summary.link.is_empty() {
            return Err(ApiError::MissingLink {
                what: "holding list member",
            });
        }
        let body = self
            .send(cancel, ApiRequest::get(summary.link.as_str()))
            .await?;
        let mut holding = model::decode_holding(&body)?;
        holding.origin = summary.clone();
        Ok(holding)
    }

    pub async fn holdings(
        &self,
        cancel: &CancellationToken,
        summaries: Vec<HoldingListMember>,
    ) -> BulkOutcome<Holding> {
        dispatch::for_each(
            cancel,
            self.config().workers,
            "Getting holdings records",
            self.progress(),
            summaries,
            |summary, token| {
                let client = self.clone();
                async move { client.holding(&token, &summary).await }
            },
        )
        .await
    }

    /// Write a holding record back to the link it was read from.
    pub async fn update_holding(&self, cancel: &CancellationToken, holding: &Holding) -> Result<Holding> {
        if holding.link().is_empty() {
            return Err(ApiError::MissingLink { what: "holding" });
        }
        let body = model::encode("holding", holding)?;
        let request = ApiRequest::put(holding.link()).xml_body(body);
        let response = self.send(cancel, request).await?;
        let mut updated = model::decode_holding(&response)?;
        updated.origin = holding.origin.clone();
        Ok(updated)
    }

    pub async fn update_holdings(
        &self,
        cancel: &CancellationToken,
        holdings: Vec<Holding>,
    ) -> BulkOutcome<Holding> {
        dispatch::for_each(
            cancel,
            self.config().workers,
            "Updating holdings records",
            self.progress(),
            holdings,
            |holding, token| {
                let client = self.clone();
                async move { client.update_holding(&token, &holding).await }
            },
        )
        .await
    }

    /// Clean up the call numbers of every holding of every bib member.
    ///
    /// Stops before writing anything if reading failed; a partial read never
    /// leads to a partial update.
    pub async fn clean_up_call_numbers(
        &self,
        cancel: &CancellationToken,
        members: &[Member],
        dry_run: bool,
    ) -> CleanupReport {
        let lists = self.bibs_holding_lists(cancel, members).await;
        if !lists.is_clean() {
            return CleanupReport {
                examined: 0,
                changes: Vec::new(),
                updated: 0,
                failures: lists.failures,
            };
        }

        let records = self.holdings(cancel, lists.succeeded).await;
        let examined = records.succeeded.len();
        if !records.is_clean() {
            return CleanupReport {
                examined,
                changes: Vec::new(),
                updated: 0,
                failures: records.failures,
            };
        }

        let mut changes = Vec::new();
        let mut changed = Vec::new();
        for mut holding in records.succeeded {
            let holding_changes = clean_holding(&mut holding);
            if !holding_changes.is_empty() {
                changes.extend(holding_changes);
                changed.push(holding);
            }
        }
        log::info!(
            "{} of {} holdings records have call numbers to clean.",
            changed.len(),
            examined
        );

        if dry_run || changed.is_empty() {
            return CleanupReport {
                examined,
                changes,
                updated: 0,
                failures: Vec::new(),
            };
        }

        let written = self.update_holdings(cancel, changed).await;
        let applied: HashSet<&str> = written.succeeded.iter().map(|h| h.link()).collect();
        for change in &mut changes {
            change.applied = applied.contains(change.holding_link.as_str());
        }
        CleanupReport {
            examined,
            updated: written.succeeded.len(),
            changes,
            failures: written.failures,
        }
    }
}
