//! End-to-end quota behavior through the registry, gate and meter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use sx_accounts::{
    AccountError, AccountStore, FileAccountStore, KeyRegistry, MemoryAccountStore, MeterError,
    QuotaGate, UsageMeter,
};
use sx_domain::config::{AccountsConfig, Limit, PlansConfig, ReissuePolicy};

fn meter_over(store: Arc<dyn AccountStore>, accounts: &AccountsConfig) -> UsageMeter {
    let registry = KeyRegistry::from_config(store, &PlansConfig::default(), accounts).unwrap();
    UsageMeter::new(Arc::new(registry), QuotaGate::from_config(accounts))
}

fn memory_meter() -> UsageMeter {
    meter_over(Arc::new(MemoryAccountStore::new()), &AccountsConfig::default())
}

async fn ok_call(meter: &UsageMeter, key: &str) -> Result<u64, MeterError<String>> {
    meter
        .metered(key, |_, _| async { Ok::<_, String>(()) })
        .await
        .map(|(_, acct)| acct.used)
}

#[tokio::test]
async fn basic_plan_admits_exactly_its_limit() {
    let meter = memory_meter();
    let acct = meter.registry().issue("basic").unwrap();
    assert_eq!(acct.limit, Limit::Finite(1000));

    for expected in 1..=1000 {
        assert_eq!(ok_call(&meter, &acct.key).await.unwrap(), expected);
    }

    let err = ok_call(&meter, &acct.key).await.unwrap_err();
    assert!(matches!(
        err,
        MeterError::Account(AccountError::QuotaExceeded { used: 1000, .. })
    ));
    assert_eq!(meter.registry().find(&acct.key).unwrap().used, 1000);
}

#[tokio::test]
async fn agency_plan_is_never_exhausted() {
    let meter = memory_meter();
    let acct = meter.registry().issue("agency").unwrap();
    for _ in 0..10_000 {
        ok_call(&meter, &acct.key).await.unwrap();
    }
    assert_eq!(meter.registry().find(&acct.key).unwrap().used, 10_000);
}

#[tokio::test]
async fn upstream_failure_is_uncharged() {
    let meter = memory_meter();
    let acct = meter.registry().issue("pro").unwrap();
    ok_call(&meter, &acct.key).await.unwrap();

    let err = meter
        .metered(&acct.key, |_, _| async {
            Err::<(), _>("HTTP 500 - upstream exploded".to_string())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::Work(ref m) if m.contains("upstream")));
    assert_eq!(meter.registry().find(&acct.key).unwrap().used, 1);
}

#[tokio::test]
async fn closed_accounts_are_rejected_with_quota_left() {
    let meter = memory_meter();
    let acct = meter.registry().issue("basic").unwrap();
    meter.registry().disable(&acct.key).unwrap();

    let err = ok_call(&meter, &acct.key).await.unwrap_err();
    assert!(matches!(err, MeterError::Account(AccountError::AccountClosed)));
}

#[tokio::test]
async fn reissue_with_quota_left_is_a_no_op() {
    let meter = memory_meter();
    let acct = meter.registry().issue("basic").unwrap();
    ok_call(&meter, &acct.key).await.unwrap();

    assert!(matches!(
        meter.registry().reissue(&acct.key, "pro"),
        Err(AccountError::QuotaRemaining { .. })
    ));
    let after = meter.registry().find(&acct.key).unwrap();
    assert_eq!(after.used, 1);
    assert_eq!(after.plan, "basic");
    assert_eq!(after.key, acct.key);
}

#[tokio::test]
async fn anytime_reissue_moves_usage_to_new_key() {
    let accounts = AccountsConfig {
        reissue_policy: ReissuePolicy::Anytime,
        ..AccountsConfig::default()
    };
    let meter = meter_over(Arc::new(MemoryAccountStore::new()), &accounts);
    let acct = meter.registry().issue("basic").unwrap();
    ok_call(&meter, &acct.key).await.unwrap();

    let fresh = meter.registry().reissue(&acct.key, "pro").unwrap();
    assert!(matches!(
        ok_call(&meter, &acct.key).await,
        Err(MeterError::Account(AccountError::NotFound))
    ));
    assert_eq!(ok_call(&meter, &fresh.key).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_overshoot() {
    let mut plans = PlansConfig::default();
    plans.plans.insert("tiny".into(), Limit::Finite(5));
    let registry = KeyRegistry::from_config(
        Arc::new(MemoryAccountStore::new()),
        &plans,
        &AccountsConfig::default(),
    )
    .unwrap();
    let meter = Arc::new(UsageMeter::new(Arc::new(registry), QuotaGate::default()));
    let acct = meter.registry().issue("tiny").unwrap();

    let ran = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();
    for _ in 0..20 {
        let meter = meter.clone();
        let ran = ran.clone();
        let key = acct.key.clone();
        handles.push(tokio::spawn(async move {
            meter
                .metered(&key, |_, _| async move {
                    tokio::task::yield_now().await;
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                })
                .await
                .is_ok()
        }));
    }

    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(ran.load(Ordering::SeqCst), 5);
    assert_eq!(meter.registry().find(&acct.key).unwrap().used, 5);
}

#[tokio::test]
async fn file_store_keeps_usage_across_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let key = {
        let store = Arc::new(FileAccountStore::open(tmp.path()).unwrap());
        let meter = meter_over(store, &AccountsConfig::default());
        let acct = meter.registry().issue("basic").unwrap();
        for _ in 0..3 {
            ok_call(&meter, &acct.key).await.unwrap();
        }
        acct.key
    };

    let store = Arc::new(FileAccountStore::open(tmp.path()).unwrap());
    let meter = meter_over(store, &AccountsConfig::default());
    assert_eq!(meter.registry().find(&key).unwrap().used, 3);
    assert_eq!(ok_call(&meter, &key).await.unwrap(), 4);
}

#[tokio::test]
async fn failed_usage_write_is_not_charged() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(FileAccountStore::open(tmp.path()).unwrap());
    let meter = meter_over(store.clone(), &AccountsConfig::default());
    let acct = meter.registry().issue("basic").unwrap();
    ok_call(&meter, &acct.key).await.unwrap();

    // A non-empty directory at the file path makes every rewrite fail.
    std::fs::remove_file(store.path()).unwrap();
    std::fs::create_dir(store.path()).unwrap();
    std::fs::write(store.path().join("occupied"), "x").unwrap();

    let err = ok_call(&meter, &acct.key).await.unwrap_err();
    assert!(matches!(err, MeterError::Account(AccountError::Storage(_))));
    assert_eq!(meter.registry().find(&acct.key).unwrap().used, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_issuance_yields_one_key_per_owner() {
    let registry = Arc::new(
        KeyRegistry::from_config(
            Arc::new(MemoryAccountStore::new()),
            &PlansConfig::default(),
            &AccountsConfig::default(),
        )
        .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move { registry.issue_for(1, "basic") }));
    }

    let mut issued = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => issued += 1,
            Err(e) => assert!(matches!(e, AccountError::DuplicateAccount(_))),
        }
    }
    assert_eq!(issued, 1);

    let owned: Vec<_> = registry
        .list()
        .unwrap()
        .into_iter()
        .filter(|a| a.owner == Some(1))
        .collect();
    assert_eq!(owned.len(), 1);

    registry.disable_owner(1).unwrap();
    assert!(registry.list().unwrap().iter().all(|a| a.disabled));
}
