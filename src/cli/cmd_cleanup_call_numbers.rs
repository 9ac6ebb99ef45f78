use super::utils::{self, BIBS_ENDPOINT, CONF_ENDPOINT, GlobalOptions, Session};
use almatoolkit::callnumber::RULES;
use almatoolkit::{SetRef, sets};
use anyhow::Result;
use clap::Args;

fn rules_help() -> String {
    let mut help = String::from(
        "Clean up the 852 $h and $i call number subfields of every holding of\n\
         every bib in a logical set of bibs. The rules, in order:\n",
    );
    for (i, rule) in RULES.iter().enumerate() {
        help.push_str(&format!("\n  {}. {}", i + 1, rule));
    }
    help
}

#[derive(Args)]
#[command(
    about = "Clean up the call numbers of the holdings of a logical set of bibs",
    long_about = rules_help()
)]
pub struct CleanupCallNumbersCommand {
    /// Name of the set whose members' holdings are cleaned
    #[arg(long = "setname", env = "ALMATOOLKIT_BIBSCLEANUPCALLNUMBERS_SETNAME", conflicts_with = "set_id")]
    pub set_name: Option<String>,

    /// ID of the set whose members' holdings are cleaned
    #[arg(long = "setid", env = "ALMATOOLKIT_BIBSCLEANUPCALLNUMBERS_SETID")]
    pub set_id: Option<String>,

    /// Do not update any holding, only report what would change
    #[arg(long = "dryrun", env = "ALMATOOLKIT_BIBSCLEANUPCALLNUMBERS_DRYRUN")]
    pub dry_run: bool,
}

pub fn run(cmd: CleanupCallNumbersCommand, globals: GlobalOptions) -> Result<()> {
    let dry_run = cmd.dry_run;
    let set_ref = SetRef::from_options(cmd.set_name, cmd.set_id)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&globals, &[CONF_ENDPOINT], &[BIBS_ENDPOINT]).await?;
        utils::announce_mode(dry_run);

        let (session, set, members) = session.members(&set_ref, &sets::LOGICAL_BIBS).await?;
        log::info!(
            "Cleaning call numbers of members of set {} ({}).",
            set.name,
            set.id
        );

        let report = session
            .client
            .clean_up_call_numbers(&session.cancel, &members, dry_run)
            .await;

        let mut wtr = utils::csv_writer();
        wtr.write_record([
            "Holding Link",
            "Field",
            "Subfield",
            "Original Call Number",
            "Updated Call Number",
            "Changed in Alma",
        ])?;
        for change in &report.changes {
            wtr.write_record([
                change.holding_link.as_str(),
                change.tag.as_str(),
                change.code.as_str(),
                change.before.as_str(),
                change.after.as_str(),
                utils::yes_no(change.applied),
            ])?;
        }
        wtr.flush()?;

        log::info!(
            "{} holdings examined, {} successful updates to call numbers.",
            report.examined,
            report.updated
        );
        session
            .close(&report.failures, "cleaning up call numbers")
            .await
    })
}
