//! Viewing and cancelling open requests on item members.
//!
//! Cancellation runs in two phases: every member's requests are read first,
//! then one DELETE is issued per request matching the filter. The report keeps
//! one row per request, keyed by request ID.

use crate::client::{AlmaClient, ApiRequest};
use crate::dispatch;
use crate::error::{ApiError, BulkOutcome, Result};
use crate::model::{Member, UserRequest, UserRequests};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Exact-match filter on request type and sub-type. An empty field matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub request_type: String,
    pub sub_type: String,
}

impl RequestFilter {
    pub fn new(request_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            sub_type: sub_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.request_type.is_empty() && self.sub_type.is_empty()
    }

    pub fn matches(&self, request: &UserRequest) -> bool {
        (self.request_type.is_empty() || self.request_type == request.request_type)
            && (self.sub_type.is_empty() || self.sub_type == request.sub_type())
    }
}

/// What happened to one request during a cancel run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub request: UserRequest,
    pub matched: bool,
    pub cancelled: bool,
}

/// Per-request rows plus the errors of both phases.
#[derive(Debug)]
pub struct CancelReport {
    pub rows: Vec<RequestOutcome>,
    pub failures: Vec<ApiError>,
}

impl CancelReport {
    pub fn cancelled_count(&self) -> usize {
        self.rows.iter().filter(|row| row.cancelled).count()
    }

    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|row| row.matched).count()
    }
}

impl AlmaClient {
    /// Open requests on one item member, each tagged with the member.
    pub async fn member_requests(
        &self,
        cancel: &CancellationToken,
        member: &Member,
    ) -> Result<Vec<UserRequest>> {
        let request = ApiRequest::get(format!("{}/requests", member.link));
        let found: UserRequests = self.fetch(cancel, "user requests", request).await?;
        Ok(found
            .requests
            .into_iter()
            .map(|mut request| {
                request.member = member.clone();
                request
            })
            .collect())
    }

    /// Open requests on every member. Read-only.
    pub async fn members_requests(
        &self,
        cancel: &CancellationToken,
        members: &[Member],
    ) -> BulkOutcome<UserRequest> {
        let outcome = dispatch::for_each(
            cancel,
            self.config().workers,
            "Getting user requests",
            self.progress(),
            members.iter().cloned(),
            |member, token| {
                let client = self.clone();
                async move { client.member_requests(&token, &member).await }
            },
        )
        .await;
        BulkOutcome::new(
            outcome.succeeded.into_iter().flatten().collect(),
            outcome.failures,
        )
    }

    /// Cancel one request through its item member.
    pub async fn cancel_request(&self, cancel: &CancellationToken, request: &UserRequest) -> Result<()> {
        if request.member.link.is_empty() {
            return Err(ApiError::MissingLink {
                what: "user request",
            });
        }
        let target = format!("{}/requests/{}", request.member.link, request.id);
        self.send(cancel, ApiRequest::delete(target)).await?;
        Ok(())
    }

    /// Cancel every request in `requests`, returning the ones that were cancelled.
    pub async fn cancel_requests(
        &self,
        cancel: &CancellationToken,
        requests: Vec<UserRequest>,
    ) -> BulkOutcome<UserRequest> {
        dispatch::for_each(
            cancel,
            self.config().workers,
            "Cancelling user requests",
            self.progress(),
            requests,
            |request, token| {
                let client = self.clone();
                async move {
                    client.cancel_request(&token, &request).await?;
                    Ok(request)
                }
            },
        )
        .await
    }

    /// Read every member's requests, then cancel those matching `filter`.
    ///
    /// With `dry_run` nothing is deleted; rows still show what matched.
    pub async fn cancel_matching_requests(
        &self,
        cancel: &CancellationToken,
        members: &[Member],
        filter: &RequestFilter,
        dry_run: bool,
    ) -> CancelReport {
        let found = self.members_requests(cancel, members).await;
        let mut failures = found.failures;

        let matching: Vec<UserRequest> = found
            .succeeded
            .iter()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        let matched: HashSet<String> = matching.iter().map(|r| r.id.clone()).collect();

        let stopped = failures.iter().any(ApiError::is_fatal);
        let cancelled: HashSet<String> = if dry_run || stopped || matching.is_empty() {
            HashSet::new()
        } else {
            let outcome = self.cancel_requests(cancel, matching).await;
            failures.extend(outcome.failures);
            outcome.succeeded.into_iter().map(|r| r.id).collect()
        };

        let rows = found
            .succeeded
            .into_iter()
            .map(|request| RequestOutcome {
                matched: matched.contains(&request.id),
                cancelled: cancelled.contains(&request.id),
                request,
            })
            .collect();

        CancelReport { rows, failures }
    }
}
