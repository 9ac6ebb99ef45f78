// Item scan-in
use crate::client::{AlmaClient, ApiRequest};
use crate::dispatch;
use crate::error::{BulkOutcome, Result};
use crate::model::{Item, Member};
use tokio_util::sync::CancellationToken;

/// Where an item is being scanned in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLocation {
    pub circ_desk: String,
    pub library: String,
}

/// An item member and the item record returned when it was scanned in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedItem {
    pub member: Member,
    pub item: Item,
}

impl AlmaClient {
    /// Scan one item member in and return the item the API sends back.
    pub async fn scan_in_member(
        &self,
        cancel: &CancellationToken,
        member: &Member,
        location: &ScanLocation,
    ) -> Result<Item> {
        let request = ApiRequest::post(member.link.as_str())
            .query("op", "scan")
            .query("register_in_house_use", "false")
            .query("circ_desk", location.circ_desk.as_str())
            .query("library", location.library.as_str());
        self.fetch(cancel, "item", request).await
    }

    /// Scan every member in, one job per member.
    pub async fn scan_in_members(
        &self,
        cancel: &CancellationToken,
        members: &[Member],
        location: &ScanLocation,
    ) -> BulkOutcome<ScannedItem> {
        dispatch::for_each(
            cancel,
            self.config().workers,
            "Scanning items in",
            self.progress(),
            members.iter().cloned(),
            |member, token| {
                let client = self.clone();
                let location = location.clone();
                async move {
                    let item = client.scan_in_member(&token, &member, &location).await?;
                    Ok(ScannedItem { member, item })
                }
            },
        )
        .await
    }
}
