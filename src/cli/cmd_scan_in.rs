use super::utils::{self, BIBS_ENDPOINT, CONF_ENDPOINT, GlobalOptions, Session};
use almatoolkit::constants::DEFAULT_CIRC_DESK;
use almatoolkit::{ScanLocation, ScannedItem, SetRef, sets};
use anyhow::Result;
use clap::Args;
use std::collections::HashMap;

#[derive(Args)]
#[command(
    about = "Scan in the members of a logical set of items",
    long_about = "Scan in every item of a logical set at a circulation desk.\n\n\
                  Scanning an item in completes any work order or transit it is in,\n\
                  the same as scanning it at the desk. One CSV row is printed per\n\
                  member of the set."
)]
pub struct ScanInCommand {
    /// Name of the set whose members are scanned in
    #[arg(long = "setname", env = "ALMATOOLKIT_ITEMSSCANIN_SETNAME", conflicts_with = "set_id")]
    pub set_name: Option<String>,

    /// ID of the set whose members are scanned in
    #[arg(long = "setid", env = "ALMATOOLKIT_ITEMSSCANIN_SETID")]
    pub set_id: Option<String>,

    /// Circulation desk code
    #[arg(long = "circdesk", env = "ALMATOOLKIT_ITEMSSCANIN_CIRCDESK", default_value = DEFAULT_CIRC_DESK)]
    pub circ_desk: String,

    /// Library code of the circulation desk
    #[arg(long, env = "ALMATOOLKIT_ITEMSSCANIN_LIBRARY")]
    pub library: String,

    /// Do not scan anything in, only list the members
    #[arg(long = "dryrun", env = "ALMATOOLKIT_ITEMSSCANIN_DRYRUN")]
    pub dry_run: bool,
}

impl ScanInCommand {
    fn location(&self) -> Result<ScanLocation> {
        if self.circ_desk.trim().is_empty() {
            anyhow::bail!("a circulation desk is required");
        }
        if self.library.trim().is_empty() {
            anyhow::bail!("a library is required");
        }
        Ok(ScanLocation {
            circ_desk: self.circ_desk.trim().to_string(),
            library: self.library.trim().to_string(),
        })
    }
}

pub fn run(cmd: ScanInCommand, globals: GlobalOptions) -> Result<()> {
    let location = cmd.location()?;
    let dry_run = cmd.dry_run;
    let set_ref = SetRef::from_options(cmd.set_name, cmd.set_id)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&globals, &[CONF_ENDPOINT], &[BIBS_ENDPOINT]).await?;
        utils::announce_mode(dry_run);

        let (session, set, members) = session.members(&set_ref, &sets::LOGICAL_ITEMS).await?;

        let outcome = if dry_run {
            Default::default()
        } else {
            let outcome = session
                .client
                .scan_in_members(&session.cancel, &members, &location)
                .await;
            log::info!("Scanned in members of set {} ({}).", set.name, set.id);
            outcome
        };

        let scanned: HashMap<&str, &ScannedItem> = outcome
            .succeeded
            .iter()
            .map(|scanned| (scanned.member.id.as_str(), scanned))
            .collect();

        let mut wtr = utils::csv_writer();
        wtr.write_record([
            "Item Link",
            "MMS ID",
            "Title",
            "Author",
            "Call Number",
            "Barcode",
            "Scanned in in Alma",
        ])?;
        for member in &members {
            match scanned.get(member.id.as_str()) {
                Some(ScannedItem { item, .. }) => wtr.write_record([
                    member.link.as_str(),
                    item.mms_id(),
                    item.title(),
                    item.author(),
                    item.call_number(),
                    item.barcode(),
                    utils::yes_no(true),
                ])?,
                None => wtr.write_record([
                    member.link.as_str(),
                    "",
                    member.description.as_str(),
                    "",
                    "",
                    "",
                    utils::yes_no(false),
                ])?,
            }
        }
        wtr.flush()?;

        log::info!("{} successful scan in operations.", outcome.succeeded.len());
        session
            .close(&outcome.failures, "scanning in items")
            .await
    })
}
