use super::utils::{CONF_ENDPOINT, GlobalOptions, Session};
use almatoolkit::{CodeTable, Department, Library};
use anyhow::Result;
use clap::Args;
use std::fmt::Write;

#[derive(Args)]
#[command(about = "Print the libraries, departments and code tables of the institution")]
pub struct ConfDumpCommand {
    /// Only dump these code tables (comma separated) instead of every known one
    #[arg(long = "codetables", env = "ALMATOOLKIT_CONFDUMP_CODETABLES", value_delimiter = ',')]
    pub code_tables: Vec<String>,
}

fn format_library(out: &mut String, library: &Library) -> std::fmt::Result {
    writeln!(out, "  {} ({})", library.code, library.name)?;
    writeln!(out, "    Description: {}", library.description)?;
    writeln!(out, "    Resource Sharing: {}", library.resource_sharing)?;
    writeln!(out, "    Campus: {}", library.campus)?;
    writeln!(out, "    Proxy: {}", library.proxy)?;
    writeln!(out, "    Default Location: {}", library.default_location)
}

fn format_department(out: &mut String, department: &Department) -> std::fmt::Result {
    writeln!(out, "  {} ({})", department.code, department.name)?;
    writeln!(out, "    Type: {}", department.department_type)?;
    writeln!(out, "    Work Days: {}", department.work_days)?;
    writeln!(out, "    Printer: {}", department.printer)?;
    writeln!(out, "    Owner: {}", department.owner)?;
    let served: Vec<String> = department
        .served_libraries
        .libraries
        .iter()
        .map(ToString::to_string)
        .collect();
    writeln!(out, "    Served Libraries: {}", served.join(", "))?;
    let operators: Vec<String> = department
        .operators
        .operators
        .iter()
        .map(|op| format!("{} ({})", op.full_name, op.primary_id))
        .collect();
    writeln!(out, "    Operators: {}", operators.join(", "))
}

fn format_code_table(out: &mut String, table: &CodeTable) -> std::fmt::Result {
    writeln!(out, "  {} ({})", table.name, table.description)?;
    writeln!(out, "    Subsystem: {}", table.sub_system)?;
    writeln!(out, "    Patron Facing: {}", table.patron_facing)?;
    writeln!(out, "    Language: {}", table.language)?;
    writeln!(
        out,
        "    Scope: Institution {} Library {}",
        table.scope.institution_id, table.scope.library_id
    )?;
    writeln!(out, "    Rows:")?;
    for row in &table.rows.rows {
        writeln!(
            out,
            "      {} ({}) Default: {} Enabled: {}",
            row.code, row.description, row.default, row.enabled
        )?;
    }
    Ok(())
}

pub fn run(cmd: ConfDumpCommand, globals: GlobalOptions) -> Result<()> {
    tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&globals, &[CONF_ENDPOINT], &[]).await?;
        let mut failures = Vec::new();
        let mut out = String::new();

        match session.client.libraries(&session.cancel).await {
            Ok(libraries) => {
                writeln!(out, "Libraries:")?;
                for library in &libraries.libraries {
                    format_library(&mut out, library)?;
                }
            }
            Err(e) => failures.push(e),
        }

        match session.client.departments(&session.cancel).await {
            Ok(departments) => {
                writeln!(out, "Departments:")?;
                for department in &departments.departments {
                    format_department(&mut out, department)?;
                }
            }
            Err(e) => failures.push(e),
        }

        let mut tables = if cmd.code_tables.is_empty() {
            session.client.code_tables(&session.cancel).await
        } else {
            let names: Vec<&str> = cmd.code_tables.iter().map(|n| n.trim()).collect();
            session
                .client
                .code_tables_named(&session.cancel, &names)
                .await
        };
        tables.succeeded.sort_by(|a, b| a.name.cmp(&b.name));
        writeln!(out, "Code Tables:")?;
        for table in &tables.succeeded {
            format_code_table(&mut out, table)?;
        }
        failures.extend(tables.failures);

        print!("{}", out);
        session
            .close(&failures, "dumping config")
            .await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use almatoolkit::model::{CodeTableRow, CodeTableRows, ValueDesc};

    fn value(value: &str, desc: &str) -> ValueDesc {
        ValueDesc {
            desc: desc.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_format_library() {
        let library = Library {
            code: "MAIN".into(),
            name: "Main Library".into(),
            campus: value("DOWNTOWN", "Downtown campus"),
            ..Default::default()
        };
        let mut out = String::new();
        format_library(&mut out, &library).unwrap();
        assert!(out.starts_with("  MAIN (Main Library)\n"));
        assert!(out.contains("    Campus: DOWNTOWN (Downtown campus)\n"));
    }

    #[test]
    fn test_format_code_table_rows() {
        let table = CodeTable {
            name: "UserGroups".into(),
            description: "User groups".into(),
            rows: CodeTableRows {
                rows: vec![CodeTableRow {
                    code: "STAFF".into(),
                    description: "Staff".into(),
                    default: "false".into(),
                    enabled: "true".into(),
                }],
            },
            ..Default::default()
        };
        let mut out = String::new();
        format_code_table(&mut out, &table).unwrap();
        assert!(out.starts_with("  UserGroups (User groups)\n"));
        assert!(out.contains("      STAFF (Staff) Default: false Enabled: true\n"));
    }
}
