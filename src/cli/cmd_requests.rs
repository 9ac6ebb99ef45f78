use super::utils::{self, BIBS_ENDPOINT, CONF_ENDPOINT, GlobalOptions, Session};
use almatoolkit::{SetRef, UserRequest, sets};
use anyhow::Result;
use clap::Args;
use std::collections::BTreeMap;

#[derive(Args)]
#[command(about = "List the open requests on the members of a logical set of items")]
pub struct RequestsCommand {
    /// Name of the set whose members' requests are listed
    #[arg(long = "setname", env = "ALMATOOLKIT_ITEMSREQUESTS_SETNAME", conflicts_with = "set_id")]
    pub set_name: Option<String>,

    /// ID of the set whose members' requests are listed
    #[arg(long = "setid", env = "ALMATOOLKIT_ITEMSREQUESTS_SETID")]
    pub set_id: Option<String>,
}

/// Number of requests per (type, sub type), sorted
pub fn summarize(requests: &[UserRequest]) -> BTreeMap<(&str, &str), usize> {
    let mut counts = BTreeMap::new();
    for request in requests {
        *counts
            .entry((request.request_type.as_str(), request.sub_type()))
            .or_insert(0) += 1;
    }
    counts
}

pub fn run(cmd: RequestsCommand, globals: GlobalOptions) -> Result<()> {
    let set_ref = SetRef::from_options(cmd.set_name, cmd.set_id)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&globals, &[CONF_ENDPOINT], &[BIBS_ENDPOINT]).await?;
        let (session, _, members) = session.members(&set_ref, &sets::LOGICAL_ITEMS).await?;

        let outcome = session
            .client
            .members_requests(&session.cancel, &members)
            .await;

        for ((request_type, sub_type), count) in summarize(&outcome.succeeded) {
            log::info!(
                "Type: {} Subtype: {} Count: {}",
                request_type,
                sub_type,
                count
            );
        }

        let mut wtr = utils::csv_writer();
        wtr.write_record(["Item Link", "Request ID", "Request Type", "Request Subtype"])?;
        for request in &outcome.succeeded {
            wtr.write_record([
                request.member.link.as_str(),
                request.id.as_str(),
                request.request_type.as_str(),
                request.sub_type(),
            ])?;
        }
        wtr.flush()?;

        log::info!("{} requests found.", outcome.succeeded.len());
        session
            .close(&outcome.failures, "retrieving user requests")
            .await
    })
}
