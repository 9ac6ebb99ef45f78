use super::utils::{self, BIBS_ENDPOINT, CONF_ENDPOINT, GlobalOptions, Session};
use almatoolkit::{RequestFilter, SetRef, sets};
use anyhow::Result;
use clap::Args;

#[derive(Args)]
#[command(
    about = "Cancel the requests on the members of a logical set of items",
    long_about = "Cancel every open request of the given type and/or sub type on the\n\
                  members of a logical set of items. An omitted type or sub type\n\
                  matches any value, but at least one of them is required."
)]
pub struct CancelRequestsCommand {
    /// Name of the set whose members' requests are cancelled
    #[arg(long = "setname", env = "ALMATOOLKIT_ITEMSCANCELREQUESTS_SETNAME", conflicts_with = "set_id")]
    pub set_name: Option<String>,

    /// ID of the set whose members' requests are cancelled
    #[arg(long = "setid", env = "ALMATOOLKIT_ITEMSCANCELREQUESTS_SETID")]
    pub set_id: Option<String>,

    /// Request type to cancel, e.g. WORK_ORDER
    #[arg(long = "type", env = "ALMATOOLKIT_ITEMSCANCELREQUESTS_TYPE", default_value = "")]
    pub request_type: String,

    /// Request sub type to cancel, e.g. AcqWorkOrder
    #[arg(long = "subtype", env = "ALMATOOLKIT_ITEMSCANCELREQUESTS_SUBTYPE", default_value = "")]
    pub sub_type: String,

    /// Do not cancel anything, only report what matches
    #[arg(long = "dryrun", env = "ALMATOOLKIT_ITEMSCANCELREQUESTS_DRYRUN")]
    pub dry_run: bool,
}

impl CancelRequestsCommand {
    fn filter(&self) -> Result<RequestFilter> {
        let filter = RequestFilter::new(self.request_type.trim(), self.sub_type.trim());
        if filter.is_empty() {
            anyhow::bail!("a request type or a request sub type are required");
        }
        Ok(filter)
    }
}

pub fn run(cmd: CancelRequestsCommand, globals: GlobalOptions) -> Result<()> {
    let filter = cmd.filter()?;
    let dry_run = cmd.dry_run;
    let set_ref = SetRef::from_options(cmd.set_name, cmd.set_id)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&globals, &[CONF_ENDPOINT], &[BIBS_ENDPOINT]).await?;
        utils::announce_mode(dry_run);

        let (session, _, members) = session.members(&set_ref, &sets::LOGICAL_ITEMS).await?;
        let report = session
            .client
            .cancel_matching_requests(&session.cancel, &members, &filter, dry_run)
            .await;
        log::info!(
            "{} of {} requests match the type and sub type.",
            report.matched_count(),
            report.rows.len()
        );

        let mut wtr = utils::csv_writer();
        wtr.write_record([
            "Item Link",
            "Request ID",
            "Request Type",
            "Request Subtype",
            "Matched type and subtype",
            "Cancelled in Alma",
        ])?;
        for row in &report.rows {
            wtr.write_record([
                row.request.member.link.as_str(),
                row.request.id.as_str(),
                row.request.request_type.as_str(),
                row.request.sub_type(),
                utils::yes_no(row.matched),
                utils::yes_no(row.cancelled),
            ])?;
        }
        wtr.flush()?;

        log::info!("{} requests cancelled.", report.cancelled_count());
        session
            .close(&report.failures, "cancelling user requests")
            .await
    })
}
