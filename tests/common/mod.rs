#![allow(dead_code)]

use almatoolkit::{AlmaClient, CallBudget, ClientConfig};
use std::sync::Arc;
use std::time::Duration;

/// Host used in record links. Requests are forced onto the mock server anyway.
pub const LINK_HOST: &str = "https://api-ca.hosted.exlibrisgroup.com";

pub fn client_for(server: &str, threshold: u64, workers: usize, page_size: usize) -> (AlmaClient, Arc<CallBudget>) {
    let budget = Arc::new(CallBudget::new(threshold));
    let config = ClientConfig::new("test-key")
        .with_server(server)
        .expect("mock server URI")
        .with_threshold(threshold)
        .with_workers(workers)
        .with_page_size(page_size)
        .with_timing(Duration::from_secs(5), Duration::from_millis(20));
    let client = AlmaClient::new(config, Arc::clone(&budget)).expect("client");
    (client, budget)
}

pub fn set_path(id: &str) -> String {
    format!("/almaws/v1/conf/sets/{}", id)
}

pub fn set_xml(id: &str, name: &str, members: usize, kind: &str, content: &str) -> String {
    format!(
        r#"<set link="{host}{path}">
  <id>{id}</id>
  <name>{name}</name>
  <type desc="{kind}">{kind}</type>
  <content desc="{content}">{content}</content>
  <number_of_members link="{host}{path}/members">{members}</number_of_members>
</set>"#,
        host = LINK_HOST,
        path = set_path(id),
    )
}

pub fn sets_xml(sets: &[(&str, &str)]) -> String {
    let mut xml = format!(r#"<sets total_record_count="{}">"#, sets.len());
    for (id, name) in sets {
        xml.push_str(&format!(
            r#"<set link="{}{}"><id>{}</id><name>{}</name></set>"#,
            LINK_HOST,
            set_path(id),
            id,
            name
        ));
    }
    xml.push_str("</sets>");
    xml
}

pub fn item_path(id: &str) -> String {
    format!("/almaws/v1/bibs/99{0}/holdings/22{0}/items/23{0}", id)
}

pub fn bib_path(id: &str) -> String {
    format!("/almaws/v1/bibs/99{}", id)
}

/// Members page; `paths` maps each member ID to its link path.
pub fn members_xml(total: usize, members: &[(&str, String)]) -> String {
    let mut xml = format!(r#"<members total_record_count="{}">"#, total);
    for (id, path) in members {
        xml.push_str(&format!(
            r#"<member link="{}{}"><id>{}</id><description>Member {}</description></member>"#,
            LINK_HOST, path, id, id
        ));
    }
    xml.push_str("</members>");
    xml
}

pub fn item_members_xml(total: usize, ids: &[&str]) -> String {
    let members: Vec<(&str, String)> = ids.iter().map(|id| (*id, item_path(id))).collect();
    members_xml(total, &members)
}

pub fn item_xml(id: &str, title: &str, barcode: &str) -> String {
    format!(
        r#"<item link="{host}{path}">
  <bib_data><mms_id>99{id}</mms_id><title>{title}</title><author>Author {id}</author></bib_data>
  <holding_data><holding_id>22{id}</holding_id><call_number>QA76 .A{id}</call_number></holding_data>
  <item_data><pid>23{id}</pid><barcode>{barcode}</barcode></item_data>
</item>"#,
        host = LINK_HOST,
        path = item_path(id),
    )
}

pub fn requests_xml(requests: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(r#"<user_requests total_record_count="{}">"#, requests.len());
    for (id, request_type, sub_type) in requests {
        xml.push_str(&format!(
            r#"<user_request><request_id>{}</request_id><request_type>{}</request_type><request_sub_type desc="{}">{}</request_sub_type></user_request>"#,
            id, request_type, sub_type, sub_type
        ));
    }
    xml.push_str("</user_requests>");
    xml
}

pub fn holding_path(bib: &str, holding: &str) -> String {
    format!("{}/holdings/{}", bib_path(bib), holding)
}

pub fn holdings_xml(bib: &str, holdings: &[&str]) -> String {
    let mut xml = format!(r#"<holdings total_record_count="{}">"#, holdings.len());
    for holding in holdings {
        xml.push_str(&format!(
            r#"<holding link="{}{}"><holding_id>{}</holding_id><library desc="Main">MAIN</library><location desc="Stacks">STACKS</location></holding>"#,
            LINK_HOST,
            holding_path(bib, holding),
            holding
        ));
    }
    xml.push_str("</holdings>");
    xml
}

pub fn holding_xml(holding: &str, h: &str, i: &str) -> String {
    format!(
        r#"<holding>
  <holding_id>{holding}</holding_id>
  <record>
    <leader>00180nx  a22000851  4500</leader>
    <controlfield tag="001">{holding}</controlfield>
    <datafield tag="852" ind1="0" ind2=" ">
      <subfield code="b">MAIN</subfield>
      <subfield code="h">{h}</subfield>
      <subfield code="i">{i}</subfield>
    </datafield>
  </record>
</holding>"#
    )
}

pub fn code_table_xml(name: &str, rows: &[(&str, &str)]) -> String {
    let mut xml = format!(
        r#"<code_table><name>{name}</name><description>{name} table</description><sub_system desc="User Management">USERS</sub_system><patron_facing>true</patron_facing><rows>"#
    );
    for (code, description) in rows {
        xml.push_str(&format!(
            "<row><code>{}</code><description>{}</description><default>false</default><enabled>true</enabled></row>",
            code, description
        ));
    }
    xml.push_str("</rows></code_table>");
    xml
}
