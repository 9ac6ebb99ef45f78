mod common;

use almatoolkit::{ApiError, RequestFilter, ScanLocation, SetKind, SetRef, constants, sets};
use common::*;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(constants::REMAINING_CALLS_HEADER, "900000")
        .set_body_string(body)
}

async fn mount_set(server: &MockServer, id: &str, name: &str, members: usize, content: &str) {
    Mock::given(method("GET"))
        .and(path(set_path(id)))
        .respond_with(xml(set_xml(id, name, members, "LOGICAL", content)))
        .mount(server)
        .await;
}

async fn mount_members_page(server: &MockServer, set: &str, offset: usize, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("{}/members", set_path(set))))
        .and(query_param("offset", offset.to_string()))
        .respond_with(xml(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_set_by_exact_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/almaws/v1/conf/sets"))
        .and(query_param("q", "name~Weeding"))
        .respond_with(xml(sets_xml(&[("1", "Weeding 2020"), ("2", " Weeding ")])))
        .mount(&server)
        .await;
    mount_set(&server, "2", "Weeding", 3, "ITEM").await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let cancel = budget.token().clone();

    let set = client
        .resolve_set(&cancel, &SetRef::Name("Weeding".into()))
        .await
        .unwrap();
    assert_eq!(set.id, "2");
    assert_eq!(set.declared_count(), 3);
    assert_eq!(set.kind(), SetKind::Logical);
    assert!(sets::LOGICAL_ITEMS.check(&set).is_ok());
    assert!(sets::LOGICAL_BIBS.check(&set).is_err());

    let again = client
        .resolve_set(&cancel, &SetRef::Id("2".into()))
        .await
        .unwrap();
    assert_eq!(again, set);
}

#[tokio::test]
async fn test_unknown_set_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/almaws/v1/conf/sets"))
        .respond_with(xml(sets_xml(&[("1", "Weeding 2020")])))
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let err = client
        .resolve_set(budget.token(), &SetRef::Name("Weeding".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SetNotFound { ref name } if name == "Weeding"));
}

#[tokio::test]
async fn test_fetch_all_members_over_pages() {
    let server = MockServer::start().await;
    mount_set(&server, "123", "Weeding", 5, "ITEM").await;
    mount_members_page(&server, "123", 0, item_members_xml(5, &["1", "2"])).await;
    mount_members_page(&server, "123", 2, item_members_xml(5, &["3", "4"])).await;
    mount_members_page(&server, "123", 4, item_members_xml(5, &["5"])).await;

    let (client, budget) = client_for(&server.uri(), 10, 3, 2);
    let cancel = budget.token().clone();
    let set = client.set_from_id(&cancel, "123").await.unwrap();

    let outcome = client.fetch_all_members(&cancel, &set).await;
    assert!(outcome.is_clean());
    let mut ids: Vec<_> = outcome.succeeded.iter().map(|m| m.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_duplicate_members_cause_count_mismatch() {
    let server = MockServer::start().await;
    mount_set(&server, "123", "Weeding", 4, "ITEM").await;
    mount_members_page(&server, "123", 0, item_members_xml(4, &["1", "2"])).await;
    mount_members_page(&server, "123", 2, item_members_xml(4, &["2", "3"])).await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 2);
    let cancel = budget.token().clone();
    let set = client.set_from_id(&cancel, "123").await.unwrap();

    let outcome = client.fetch_all_members(&cancel, &set).await;
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failure_count(), 1);
    assert!(matches!(
        outcome.failures[0],
        ApiError::CountMismatch {
            found: 3,
            expected: 4,
            ..
        }
    ));
}

#[tokio::test]
async fn test_scan_in_keeps_going_past_item_errors() {
    let server = MockServer::start().await;
    for id in ["1", "3"] {
        Mock::given(method("POST"))
            .and(path(item_path(id)))
            .and(query_param("op", "scan"))
            .and(query_param("register_in_house_use", "false"))
            .and(query_param("circ_desk", "DEFAULT_CIRC_DESK"))
            .and(query_param("library", "MAIN"))
            .respond_with(xml(item_xml(id, &format!("Title {}", id), &format!("B{}", id))))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(item_path("2")))
        .respond_with(ResponseTemplate::new(400).set_body_string("<web_service_result/>"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let members: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|id| almatoolkit::Member {
            link: format!("{}{}", LINK_HOST, item_path(id)),
            id: format!("23{}", id),
            description: String::new(),
        })
        .collect();
    let location = ScanLocation {
        circ_desk: constants::DEFAULT_CIRC_DESK.into(),
        library: "MAIN".into(),
    };

    let outcome = client
        .scan_in_members(budget.token(), &members, &location)
        .await;
    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failure_count(), 1);
    assert!(matches!(outcome.failures[0], ApiError::Status { .. }));
    assert!(outcome.fatal().is_none());
    for scanned in &outcome.succeeded {
        assert_eq!(scanned.member.id, format!("23{}", &scanned.item.mms_id()[2..]));
        assert!(scanned.item.barcode().starts_with('B'));
    }
    assert!(!budget.is_cancelled());
}

#[tokio::test]
async fn test_threshold_stops_a_bulk_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(constants::REMAINING_CALLS_HEADER, "10")
                .set_body_string(item_xml("1", "Title", "B1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 50, 1, 100);
    let members: Vec<_> = ["1", "2", "3", "4"]
        .iter()
        .map(|id| almatoolkit::Member {
            link: format!("{}{}", LINK_HOST, item_path(id)),
            id: id.to_string(),
            description: String::new(),
        })
        .collect();
    let location = ScanLocation {
        circ_desk: "DESK".into(),
        library: "MAIN".into(),
    };

    let outcome = client
        .scan_in_members(budget.token(), &members, &location)
        .await;
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.failure_count(), 3);
    assert!(outcome.failures.iter().all(ApiError::is_threshold));
    assert!(outcome.fatal().is_some_and(ApiError::is_threshold));
    assert_eq!(budget.remaining(), Some(10));
}

#[tokio::test]
async fn test_cancel_only_matching_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/requests", item_path("1"))))
        .respond_with(xml(requests_xml(&[
            ("r1", "WORK_ORDER", "AcqWorkOrder"),
            ("r2", "HOLD", "PATRON_PHYSICAL"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/requests", item_path("2"))))
        .respond_with(xml(requests_xml(&[("r3", "WORK_ORDER", "Binding")])))
        .mount(&server)
        .await;
    for (item, request) in [("1", "r1"), ("2", "r3")] {
        Mock::given(method("DELETE"))
            .and(path(format!("{}/requests/{}", item_path(item), request)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path(format!("{}/requests/r2", item_path("1"))))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let members: Vec<_> = ["1", "2"]
        .iter()
        .map(|id| almatoolkit::Member {
            link: format!("{}{}", LINK_HOST, item_path(id)),
            id: id.to_string(),
            description: String::new(),
        })
        .collect();

    let report = client
        .cancel_matching_requests(
            budget.token(),
            &members,
            &RequestFilter::new("WORK_ORDER", ""),
            false,
        )
        .await;
    assert!(report.failures.is_empty());
    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.matched_count(), 2);
    assert_eq!(report.cancelled_count(), 2);
    let hold = report.rows.iter().find(|row| row.request.id == "r2").unwrap();
    assert!(!hold.matched);
    assert!(!hold.cancelled);
}

#[tokio::test]
async fn test_cancel_dry_run_deletes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/requests", item_path("1"))))
        .respond_with(xml(requests_xml(&[("r1", "WORK_ORDER", "AcqWorkOrder")])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let members = vec![almatoolkit::Member {
        link: format!("{}{}", LINK_HOST, item_path("1")),
        id: "1".into(),
        description: String::new(),
    }];

    let report = client
        .cancel_matching_requests(
            budget.token(),
            &members,
            &RequestFilter::new("", "AcqWorkOrder"),
            true,
        )
        .await;
    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.cancelled_count(), 0);
}

async fn mount_holding(server: &MockServer, h: &str, i: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{}/holdings", bib_path("1"))))
        .respond_with(xml(holdings_xml("1", &["221"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(holding_path("1", "221")))
        .respond_with(xml(holding_xml("221", h, i)))
        .mount(server)
        .await;
}

fn bib_members() -> Vec<almatoolkit::Member> {
    vec![almatoolkit::Member {
        link: format!("{}{}", LINK_HOST, bib_path("1")),
        id: "991".into(),
        description: String::new(),
    }]
}

#[tokio::test]
async fn test_cleanup_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    mount_holding(&server, "BR115.C5", "L43").await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let report = client
        .clean_up_call_numbers(budget.token(), &bib_members(), true)
        .await;

    assert!(report.failures.is_empty());
    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.holding_link, format!("{}{}", LINK_HOST, holding_path("1", "221")));
    assert_eq!(change.tag, "852");
    assert_eq!(change.code, "h");
    assert_eq!(change.before, "BR115.C5");
    assert_eq!(change.after, "BR115 .C5");
    assert!(!change.applied);
}

#[tokio::test]
async fn test_cleanup_writes_changed_holdings_back() {
    let server = MockServer::start().await;
    mount_holding(&server, "BR115.C5", "L43").await;
    Mock::given(method("PUT"))
        .and(path(holding_path("1", "221")))
        .and(body_string_contains("BR115 .C5"))
        .respond_with(xml(holding_xml("221", "BR115 .C5", "L43")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let report = client
        .clean_up_call_numbers(budget.token(), &bib_members(), false)
        .await;

    assert!(report.failures.is_empty());
    assert_eq!(report.updated, 1);
    assert_eq!(report.changes.len(), 1);
    assert!(report.changes[0].applied);
}

#[tokio::test]
async fn test_cleanup_trims_call_number_and_keeps_other_subfields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/holdings", bib_path("1"))))
        .respond_with(xml(holdings_xml("1", &["221"])))
        .mount(&server)
        .await;
    let record = r#"<holding>
  <holding_id>221</holding_id>
  <record>
    <leader>00180nx  a22000851  4500</leader>
    <controlfield tag="001">221</controlfield>
    <datafield tag="852" ind1="0" ind2=" ">
      <subfield code="b">MAIN</subfield>
      <subfield code="h">BR115 .C5 </subfield>
      <subfield code="z"> note with lead</subfield>
    </datafield>
  </record>
</holding>"#;
    Mock::given(method("GET"))
        .and(path(holding_path("1", "221")))
        .respond_with(xml(record.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(holding_path("1", "221")))
        .and(body_string_contains(r#"<subfield code="h">BR115 .C5</subfield>"#))
        .and(body_string_contains(r#"<subfield code="z"> note with lead</subfield>"#))
        .respond_with(xml(record.replace("BR115 .C5 ", "BR115 .C5")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let report = client
        .clean_up_call_numbers(budget.token(), &bib_members(), false)
        .await;

    assert!(report.failures.is_empty());
    assert_eq!(report.updated, 1);
    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.code, "h");
    assert_eq!(change.before, "BR115 .C5 ");
    assert_eq!(change.after, "BR115 .C5");
    assert!(change.applied);
}

#[tokio::test]
async fn test_cleanup_skips_clean_holdings() {
    let server = MockServer::start().await;
    mount_holding(&server, "BR115 .C5", "L43").await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let report = client
        .clean_up_call_numbers(budget.token(), &bib_members(), false)
        .await;
    assert!(report.failures.is_empty());
    assert_eq!(report.examined, 1);
    assert!(report.changes.is_empty());
}

#[tokio::test]
async fn test_cleanup_stops_when_reads_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/holdings", bib_path("1"))))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let report = client
        .clean_up_call_numbers(budget.token(), &bib_members(), false)
        .await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.examined, 0);
    assert!(report.changes.is_empty());
}

#[tokio::test]
async fn test_code_tables_report_missing_tables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/almaws/v1/conf/code-tables/UserGroups"))
        .respond_with(xml(code_table_xml("UserGroups", &[("STAFF", "Staff"), ("UG", "Undergraduate")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/almaws/v1/conf/code-tables/NoSuchTable"))
        .respond_with(ResponseTemplate::new(400).set_body_string("<web_service_result/>"))
        .mount(&server)
        .await;

    let (client, budget) = client_for(&server.uri(), 10, 2, 100);
    let outcome = client
        .code_tables_named(budget.token(), &["UserGroups", "NoSuchTable"])
        .await;
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.failure_count(), 1);
    let table = &outcome.succeeded[0];
    assert_eq!(table.name, "UserGroups");
    assert_eq!(table.sub_system.value, "USERS");
    assert_eq!(table.rows.rows.len(), 2);
    assert_eq!(table.rows.rows[1].code, "UG");
}
