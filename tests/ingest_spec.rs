use std::sync::Arc;

use contact_dispatch::db::Database;
use contact_dispatch::error::{DispatchError, ParseError};
use contact_dispatch::ingest::{Dispatcher, IngestRequest, SourceFormat};
use contact_dispatch::models::*;
use speculate2::speculate;

const CONTACTS_XLSX: &[u8] = include_bytes!("fixtures/contacts.xlsx");

fn register_agents(db: &Database, count: usize) -> Vec<Agent> {
    (0..count)
        .map(|i| {
            db.create_agent(CreateAgentInput {
                name: format!("Agent {i}"),
                email: format!("agent{i}@example.com"),
                mobile: Mobile {
                    country_code: "+1".to_string(),
                    number: format!("555010{i}"),
                },
            })
            .expect("Failed to create agent")
        })
        .collect()
}

fn csv_request(payload: &[u8]) -> IngestRequest<'_> {
    IngestRequest {
        payload,
        format: SourceFormat::Csv,
        file_name: "contacts.csv",
        uploaded_by: "operator@example.com",
    }
}

fn contacts_csv(count: usize) -> String {
    let mut csv = String::from("FirstName,Phone,Notes\n");
    for i in 0..count {
        csv.push_str(&format!("Contact{i},555{i:04},\n"));
    }
    csv
}

fn counts(detail: &ListDetail) -> Vec<usize> {
    detail.distributions.iter().map(|d| d.item_count).collect()
}

fn names(items: &[ValidRecord]) -> Vec<&str> {
    items.iter().map(ValidRecord::first_name).collect()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let dispatcher = Dispatcher::new(Arc::new(db.clone()), 5);
    }

    describe "ingest" {
        it "splits seven contacts across three agents as 3/2/2" {
            let agents = register_agents(&db, 3);
            let detail = dispatcher
                .ingest(csv_request(contacts_csv(7).as_bytes()))
                .expect("ingest");

            assert_eq!(counts(&detail), vec![3, 2, 2]);
            assert_eq!(detail.total_items, 7);
            assert_eq!(detail.file_name, "contacts.csv");
            assert_eq!(detail.uploaded_by, "operator@example.com");

            let agent_ids: Vec<_> = detail.distributions.iter().map(|d| d.agent_id).collect();
            let expected: Vec<_> = agents.iter().map(|a| a.id).collect();
            assert_eq!(agent_ids, expected);

            assert_eq!(names(&detail.distributions[0].items), vec!["Contact0", "Contact1", "Contact2"]);
            assert_eq!(names(&detail.distributions[1].items), vec!["Contact3", "Contact4"]);
            assert_eq!(names(&detail.distributions[2].items), vec!["Contact5", "Contact6"]);
        }

        it "uses at most the configured number of agents" {
            register_agents(&db, 7);
            let detail = dispatcher
                .ingest(csv_request(contacts_csv(13).as_bytes()))
                .expect("ingest");

            assert_eq!(counts(&detail), vec![3, 3, 3, 2, 2]);
        }

        it "honours a smaller roster limit" {
            register_agents(&db, 4);
            let narrow = Dispatcher::new(Arc::new(db.clone()), 2);
            let detail = narrow
                .ingest(csv_request(contacts_csv(5).as_bytes()))
                .expect("ingest");

            assert_eq!(counts(&detail), vec![3, 2]);
        }

        it "ignores inactive agents" {
            let agents = register_agents(&db, 3);
            db.update_agent(agents[0].id, UpdateAgentInput {
                is_active: Some(false),
                ..Default::default()
            }).expect("Update failed");

            let detail = dispatcher
                .ingest(csv_request(contacts_csv(3).as_bytes()))
                .expect("ingest");

            assert_eq!(counts(&detail), vec![2, 1]);
            assert!(detail.distributions.iter().all(|d| d.agent_id != agents[0].id));
        }

        it "drops rows without a first name or phone" {
            register_agents(&db, 1);
            let detail = dispatcher
                .ingest(csv_request(b"FirstName,Phone,Notes\nA,1,\n,2,\nB,,\n"))
                .expect("ingest");

            assert_eq!(detail.total_items, 1);
            assert_eq!(names(&detail.distributions[0].items), vec!["A"]);
            assert_eq!(detail.distributions[0].items[0].phone(), "1");
        }

        it "gives every agent a distribution when there are fewer contacts than agents" {
            register_agents(&db, 5);
            let detail = dispatcher
                .ingest(csv_request(contacts_csv(2).as_bytes()))
                .expect("ingest");

            assert_eq!(counts(&detail), vec![1, 1, 0, 0, 0]);
            assert_eq!(detail.total_items, 2);
        }

        it "returns the same list that a later lookup returns" {
            register_agents(&db, 2);
            let detail = dispatcher
                .ingest(csv_request(contacts_csv(5).as_bytes()))
                .expect("ingest");

            let reread = dispatcher.get_detail(detail.id).expect("lookup");
            assert_eq!(reread, detail);
            let sum: usize = reread.distributions.iter().map(|d| d.item_count).sum();
            assert_eq!(reread.total_items, sum);
        }

        it "parses the first sheet of an xlsx workbook" {
            register_agents(&db, 2);
            let detail = dispatcher
                .ingest(IngestRequest {
                    payload: CONTACTS_XLSX,
                    format: SourceFormat::Xlsx,
                    file_name: "contacts.xlsx",
                    uploaded_by: "operator@example.com",
                })
                .expect("ingest");

            assert_eq!(detail.total_items, 4);
            assert_eq!(counts(&detail), vec![2, 2]);

            let first = &detail.distributions[0].items;
            assert_eq!(names(first), vec!["Ada", "Grace"]);
            assert_eq!(first[0].phone(), "5550001111");
            assert_eq!(first[0].notes(), "VIP");
            assert_eq!(first[1].notes(), "");

            let second = &detail.distributions[1].items;
            assert_eq!(names(second), vec!["Margaret", "Barbara"]);
            assert_eq!(second[1].phone(), "5550005555");
        }
    }

    describe "rejected uploads" {
        it "fails without agents and stores nothing" {
            let error = dispatcher
                .ingest(csv_request(contacts_csv(3).as_bytes()))
                .expect_err("no agents");

            assert!(matches!(error, DispatchError::NoAgents));
            assert!(dispatcher.list_summaries().expect("summaries").is_empty());
        }

        it "fails when no row is valid and stores nothing" {
            register_agents(&db, 2);
            let error = dispatcher
                .ingest(csv_request(b"Name,Mobile\nAda,555\n"))
                .expect_err("no valid rows");

            assert!(matches!(error, DispatchError::NoValidRecords));
            assert!(dispatcher.list_summaries().expect("summaries").is_empty());
        }

        it "fails on a header-only file" {
            register_agents(&db, 2);
            let error = dispatcher
                .ingest(csv_request(b"FirstName,Phone,Notes\n"))
                .expect_err("no rows");

            assert!(matches!(error, DispatchError::NoValidRecords));
        }

        it "fails on a payload that does not match its declared format" {
            register_agents(&db, 2);
            let error = dispatcher
                .ingest(IngestRequest {
                    format: SourceFormat::Xlsx,
                    file_name: "contacts.xlsx",
                    ..csv_request(contacts_csv(3).as_bytes())
                })
                .expect_err("not a workbook");

            assert!(matches!(error, DispatchError::Parse(ParseError::Workbook(_))));
            assert!(dispatcher.list_summaries().expect("summaries").is_empty());
        }
    }

    describe "reads" {
        it "lists uploads newest first" {
            register_agents(&db, 2);
            let older = dispatcher
                .ingest(csv_request(contacts_csv(2).as_bytes()))
                .expect("ingest");
            let newer = dispatcher
                .ingest(csv_request(contacts_csv(3).as_bytes()))
                .expect("ingest");

            let summaries = dispatcher.list_summaries().expect("summaries");
            let ids: Vec<_> = summaries.iter().map(|s| s.id).collect();
            assert_eq!(ids, vec![newer.id, older.id]);
            assert_eq!(summaries[0].total_items, 3);
        }

        it "reports an unknown list as not found" {
            let id = uuid::Uuid::new_v4();
            match dispatcher.get_detail(id) {
                Err(DispatchError::NotFound(missing)) => assert_eq!(missing, id),
                other => panic!("expected not found, got {other:?}"),
            }
        }
    }
}
