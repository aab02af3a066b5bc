use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use contract_lifecycle::workflows::post_sales::{
    status, ContractDetail, ContractKey, ContractStatusRecord, ContractType, FileAuditLog,
    InMemoryAuditLog, InMemoryContractStore, ObjectionRecord, PostSalesService, RuleCatalog,
    RuleKind, SeedData, SupplierPolicy,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "contract-lifecycle-{label}-{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_objection_rules_do_not_clobber_other_fields() {
    let store = Arc::new(InMemoryContractStore::default());
    let created = Local::now() - Duration::days(365);
    let keys: Vec<ContractKey> = (0..40)
        .map(|index| ContractKey::new(format!("E{index:03}"), ContractType::Electric))
        .collect();

    for key in &keys {
        store
            .put_status(ContractStatusRecord {
                key: key.clone(),
                status: status::OBJECTION.to_string(),
                last_modified: created,
                creation_date: Some(created),
            })
            .await;
        store
            .put_objection(ObjectionRecord {
                key: key.clone(),
                objection_date: Some("2024-03-01".to_string()),
                objection_count: 4,
                query_type: None,
            })
            .await;
        store
            .put_detail(ContractDetail {
                key: key.clone(),
                initial_start_date: None,
                business_name: None,
                meter_identifier: None,
                supplier_id: Some(99_999),
            })
            .await;
    }

    let service = PostSalesService::new(
        store.clone(),
        Arc::new(InMemoryAuditLog::default()),
        Arc::new(SupplierPolicy::standard()),
        RuleCatalog::default(),
    );
    let by_date = service.clone();
    let by_count = service.clone();

    let (date_run, count_run) = tokio::join!(
        tokio::spawn(async move { by_date.trigger(RuleKind::ObjectionDate, Some(day(2024, 3, 2))).await }),
        tokio::spawn(async move { by_count.trigger(RuleKind::ObjectionCount, Some(day(2024, 3, 2))).await }),
    );
    let date_run = date_run.expect("task joins").expect("date rule succeeds");
    let count_run = count_run.expect("task joins").expect("count rule succeeds");

    // Each row is written by exactly one of the two runs.
    assert_eq!(
        date_run.result.updated_count + count_run.result.updated_count,
        keys.len()
    );

    for key in &keys {
        let record = store.status_record(key).await.expect("row present");
        assert_eq!(record.status, status::OBJECTION_CLOSED);
        assert_eq!(record.creation_date, Some(created));
        assert!(record.last_modified > created);
    }
}

#[tokio::test]
async fn seeded_store_runs_every_rule_and_writes_audit_files() {
    let seed_dir = scratch_dir("seed");
    let audit_dir = scratch_dir("audit");

    fs::write(
        seed_dir.join("statuses.csv"),
        "EId,Type,Status,LastModified,CreationDate\n\
         F1,Electric,Processing_Future Months,2024-04-01,2024-01-10\n\
         L1,Electric,Live,2024-04-01,\n\
         L2,Gas,Live,2024-04-01,\n\
         R1,Electric,Renewed,2024-04-01,\n\
         O1,Gas,Objection,2024-04-01,\n\
         P1,Electric,Processing_Present Month,2024-04-01,\n",
    )
    .expect("write statuses");
    fs::write(
        seed_dir.join("commission.csv"),
        "EId,Type,StartDate,CED,CED_COT\n\
         F1,Electric,2024-05-20,,\n\
         L1,Electric,2024-01-01,2024-06-01,\n\
         L2,Gas,2023-01-01,2025-06-01,\n\
         R1,Electric,2022-05-15,15/05/2024,\n\
         P1,Electric,2024-05-02,,\n",
    )
    .expect("write commission");
    fs::write(
        seed_dir.join("gas.csv"),
        "EId,InitialStartDate,BusinessName,MPRN,SupplierId\nO1,,Mill Lane Garage,7501234,10064\n",
    )
    .expect("write gas");
    fs::write(
        seed_dir.join("objections.csv"),
        "EId,Type,ObjectionDate,ObjectionCount,QueryType\nO1,Gas,2024-05-01,2,Objection\n",
    )
    .expect("write objections");

    let seed = SeedData::from_dir(&seed_dir).expect("seed loads");
    let store = Arc::new(InMemoryContractStore::from_seed(seed));
    let audit = Arc::new(FileAuditLog::new(&audit_dir));
    let service = PostSalesService::new(
        store.clone(),
        audit,
        Arc::new(SupplierPolicy::standard()),
        RuleCatalog::default(),
    );

    let today = day(2024, 5, 15);
    let mut updated = 0;
    for kind in RuleKind::ALL {
        let outcome = service
            .trigger(kind, Some(today))
            .await
            .unwrap_or_else(|err| panic!("{kind} failed: {err}"));
        updated += outcome.result.updated_count;
    }

    // F1 enters the present month, L1 enters its renewal window, R1 ends today,
    // O1 hits SSE's ceiling of 2 and P1 lands in the overdue ledger.
    assert_eq!(updated, 5);
    let status_of = |id: &str, contract_type| {
        let store = store.clone();
        let key = ContractKey::new(id, contract_type);
        async move { store.status_of(&key).await }
    };
    assert_eq!(
        status_of("F1", ContractType::Electric).await.as_deref(),
        Some(status::PROCESSING_PRESENT_MONTH)
    );
    assert_eq!(
        status_of("L1", ContractType::Electric).await.as_deref(),
        Some(status::RENEWAL_WINDOW)
    );
    assert_eq!(
        status_of("L2", ContractType::Gas).await.as_deref(),
        Some(status::LIVE)
    );
    assert_eq!(
        status_of("R1", ContractType::Electric).await.as_deref(),
        Some(status::CONTRACT_ENDED_RENEWED)
    );
    assert_eq!(
        status_of("O1", ContractType::Gas).await.as_deref(),
        Some(status::OBJECTION_CLOSED)
    );
    assert_eq!(store.overdue_entries().await.len(), 1);

    let audit_files = fs::read_dir(&audit_dir)
        .expect("audit dir readable")
        .filter_map(Result::ok)
        .count();
    assert_eq!(audit_files, RuleKind::ALL.len());

    fs::remove_dir_all(&seed_dir).ok();
    fs::remove_dir_all(&audit_dir).ok();
}
