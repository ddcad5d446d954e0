use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use super::*;
use crate::models::{Complaint, Participant, Quote};
use crate::remote::{MemoryRemote, RemoteError, RemoteStore};

async fn connected(remote: &Arc<MemoryRemote>) -> SyncCoordinator {
    let store: Arc<dyn RemoteStore> = Arc::clone(remote) as Arc<dyn RemoteStore>;
    let context = RemoteContext::initialize(store).await;
    assert_eq!(context.state(), ConnectionState::Connected);
    SyncCoordinator::new(LocalStore::open_in_memory().unwrap(), context).unwrap()
}

fn offline() -> SyncCoordinator {
    SyncCoordinator::new(
        LocalStore::open_in_memory().unwrap(),
        RemoteContext::offline(),
    )
    .unwrap()
}

fn watch<T: SyncRecord>(coordinator: &SyncCoordinator) -> (Subscription, UnboundedReceiver<Vec<T>>) {
    let (sender, receiver) = unbounded_channel();
    let subscription = coordinator.subscribe::<T, _>(move |records| {
        let _ = sender.send(records);
    });
    (subscription, receiver)
}

async fn next_matching<T>(
    receiver: &mut UnboundedReceiver<Vec<T>>,
    predicate: impl Fn(&[T]) -> bool,
) -> Vec<T> {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let records = receiver.recv().await.expect("subscription channel closed");
            if predicate(&records) {
                return records;
            }
        }
    })
    .await
    .expect("no matching delivery")
}

fn quote(id: &str, text: &str, timestamp: i64) -> Quote {
    let mut quote = Quote::new(text, "Ion", "Ana");
    quote.id = id.to_string();
    quote.timestamp = timestamp;
    quote
}

fn sorted_keys(value: &Value) -> Vec<String> {
    let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn repeated_votes_leave_one_record_per_voter_and_category() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;

    for candidate in ["Ion", "Radu", "Maria"] {
        coordinator
            .write(Vote::new("Ana", candidate, Category::Mfp))
            .await;
    }

    let expected = vec![Vote::new("Ana", "Maria", Category::Mfp)];
    assert_eq!(coordinator.snapshot::<Vote>(), expected);
    assert_eq!(remote.rows(Collection::Votes).len(), 1);
    assert_eq!(coordinator.refresh::<Vote>().await, expected);
}

#[tokio::test]
async fn refreshing_twice_changes_nothing() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Quotes,
        [json!({"id": "r1", "text": "remote", "author": "Ion", "added_by": "Ana", "timestamp": 5})],
    );
    let coordinator = connected(&remote).await;
    coordinator.inner.local.put(&[quote("l1", "local", 7)]);

    let first = coordinator.refresh::<Quote>().await;
    let second = coordinator.refresh::<Quote>().await;
    assert_eq!(first, second);
    assert_eq!(coordinator.snapshot::<Quote>(), first);
}

#[tokio::test]
async fn writes_are_visible_before_any_network_round_trip() {
    let remote = Arc::new(MemoryRemote::new());
    remote.set_pending(true);
    let coordinator = connected(&remote).await;

    let (_subscription, mut updates) = watch::<Quote>(&coordinator);
    assert!(updates.try_recv().unwrap().is_empty());

    let posted = Quote::new("Ha ha cee?", "Ion", "Ana");
    let mirror = coordinator.write(posted.clone());
    assert!(!mirror.is_local_only());

    assert_eq!(updates.try_recv().unwrap(), vec![posted.clone()]);
    assert_eq!(coordinator.snapshot::<Quote>(), vec![posted.clone()]);

    let (_fresh, mut fresh_updates) = watch::<Quote>(&coordinator);
    assert_eq!(fresh_updates.try_recv().unwrap(), vec![posted]);
    drop(mirror);
}

#[tokio::test]
async fn offline_collections_survive_a_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cabana.db");

    let participant = Participant::new("Ana");
    let vote = Vote::new("Ana", "Ion", Category::Dj);
    let posted = Quote::new("Nu mai beau", "Ion", "Ana");
    let complaint = Complaint::new("Muzica prea tare", "Am dat mai incet.");

    {
        let coordinator =
            SyncCoordinator::new(LocalStore::open(&path).unwrap(), RemoteContext::offline())
                .unwrap();
        assert!(coordinator.write(participant.clone()).is_local_only());
        coordinator.write(vote.clone()).await;
        coordinator.write(posted.clone()).await;
        coordinator.write(complaint.clone()).await;
    }

    let reloaded =
        SyncCoordinator::new(LocalStore::open(&path).unwrap(), RemoteContext::offline()).unwrap();
    assert_eq!(reloaded.snapshot::<Participant>(), vec![participant]);
    assert_eq!(reloaded.snapshot::<Vote>(), vec![vote]);
    assert_eq!(reloaded.snapshot::<Quote>(), vec![posted]);
    assert_eq!(reloaded.snapshot::<Complaint>(), vec![complaint]);
}

#[tokio::test]
async fn complaints_never_carry_the_submitter() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;
    coordinator.set_active_user("Ana");

    coordinator
        .write(Complaint::new("Apa e rece", "Am notat."))
        .await;

    let anonymous = vec!["ai_reply", "id", "text", "timestamp"];
    let rows = remote.rows(Collection::Complaints);
    assert_eq!(rows.len(), 1);
    assert_eq!(sorted_keys(&rows[0]), anonymous);
    assert!(!rows[0].to_string().contains("Ana"));

    for complaint in coordinator.refresh::<Complaint>().await {
        let value = serde_json::to_value(&complaint).unwrap();
        assert_eq!(sorted_keys(&value), anonymous);
    }
}

#[tokio::test]
async fn remote_copy_wins_a_vote_conflict() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Votes,
        [json!({"voter": "Ana", "candidate": "Radu", "category": "MFP"})],
    );
    let coordinator = connected(&remote).await;
    coordinator
        .inner
        .local
        .put(&[Vote::new("Ana", "Ion", Category::Mfp)]);

    let merged = coordinator.refresh::<Vote>().await;
    assert_eq!(merged, vec![Vote::new("Ana", "Radu", Category::Mfp)]);
    assert_eq!(coordinator.snapshot::<Vote>(), merged);
}

#[tokio::test]
async fn vote_then_retract_is_seen_by_subscriber() {
    let coordinator = offline();
    let (_subscription, mut updates) = watch::<Vote>(&coordinator);
    assert!(updates.try_recv().unwrap().is_empty());

    coordinator.write(Vote::new("A", "B", Category::Mfp)).await;
    let seen = updates.try_recv().unwrap();
    let mfp: Vec<&Vote> = seen
        .iter()
        .filter(|vote| vote.category == Category::Mfp)
        .collect();
    assert_eq!(mfp.len(), 1);
    assert_eq!(mfp[0].candidate, "B");

    coordinator.retract_vote("A", Category::Mfp).await;
    let seen = updates.try_recv().unwrap();
    assert!(!seen
        .iter()
        .any(|vote| vote.voter == "A" && vote.category == Category::Mfp));
}

#[tokio::test]
async fn retract_removes_the_remote_row() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;

    coordinator.write(Vote::new("A", "B", Category::Mfp)).await;
    coordinator.write(Vote::new("A", "C", Category::Dj)).await;
    coordinator.retract_vote("A", Category::Mfp).await;

    let rows = remote.rows(Collection::Votes);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["category"], "DJ");
}

#[tokio::test]
async fn quotes_dedup_across_sources_with_remote_version() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Quotes,
        [
            json!({"id": "1", "text": "remote text", "author": "Ion", "added_by": "Ana", "timestamp": 100}),
            json!({"id": 2, "text": "second", "author": "Radu", "added_by": "Ion", "timestamp": 200}),
        ],
    );
    let coordinator = connected(&remote).await;
    coordinator.inner.local.put(&[quote("1", "local text", 100)]);

    let merged = coordinator.refresh::<Quote>().await;
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, "2");
    let first = merged.iter().find(|quote| quote.id == "1").unwrap();
    assert_eq!(first.text, "remote text");
}

#[tokio::test]
async fn failed_remote_write_keeps_the_local_record() {
    let remote = Arc::new(MemoryRemote::new());
    remote.set_fail_writes(true);
    let coordinator = connected(&remote).await;

    let posted = Quote::new("Cine a luat berea?", "Maria", "Ana");
    coordinator.write(posted.clone()).await;

    assert_eq!(coordinator.snapshot::<Quote>(), vec![posted.clone()]);
    assert!(remote.rows(Collection::Quotes).is_empty());

    remote.set_fail_reads(true);
    assert_eq!(coordinator.refresh::<Quote>().await, vec![posted]);
}

#[tokio::test]
async fn remote_change_feed_triggers_redelivery() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;
    let (_subscription, mut updates) = watch::<Vote>(&coordinator);

    remote.seed(
        Collection::Votes,
        [json!({"voter": "Radu", "candidate": "Ana", "category": "RIZZ"})],
    );
    remote.notify_change(Collection::Votes);

    let seen = next_matching(&mut updates, |votes| !votes.is_empty()).await;
    assert_eq!(seen, vec![Vote::new("Radu", "Ana", Category::Rizz)]);
    assert_eq!(coordinator.snapshot::<Vote>(), seen);
}

#[tokio::test]
async fn cancelled_subscription_deregisters_both_listeners() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;
    let (subscription, mut updates) = watch::<Vote>(&coordinator);

    assert_eq!(remote.listener_count(Collection::Votes), 1);
    assert_eq!(coordinator.inner.signals.listener_count(Collection::Votes), 1);

    subscription.cancel();
    subscription.cancel();
    assert_eq!(remote.listener_count(Collection::Votes), 0);
    assert_eq!(coordinator.inner.signals.listener_count(Collection::Votes), 0);

    while updates.try_recv().is_ok() {}
    coordinator.write(Vote::new("Ana", "Ion", Category::Mfp)).await;
    remote.notify_change(Collection::Votes);
    tokio::task::yield_now().await;
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn refresh_persists_without_broadcasting() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Votes,
        [json!({"voter": "Ion", "candidate": "Ana", "category": "SIGMA"})],
    );
    let coordinator = connected(&remote).await;

    let broadcasts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&broadcasts);
    coordinator.inner.signals.listen(
        Collection::Votes,
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    coordinator.refresh::<Vote>().await;
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.snapshot::<Vote>().len(), 1);

    coordinator.write(Vote::new("Ana", "Ion", Category::Sigma)).await;
    assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_bootstrap_keeps_everything_local() {
    let remote = Arc::new(MemoryRemote::new());
    remote.set_probe_error(|| RemoteError::Api("Invalid API key (401)".to_string()));
    let store: Arc<dyn RemoteStore> = Arc::clone(&remote) as Arc<dyn RemoteStore>;
    let context = RemoteContext::initialize(store).await;
    let coordinator =
        SyncCoordinator::new(LocalStore::open_in_memory().unwrap(), context).unwrap();
    assert_eq!(coordinator.connection_state(), ConnectionState::Error);

    let (_subscription, _updates) = watch::<Vote>(&coordinator);
    assert_eq!(remote.listener_count(Collection::Votes), 0);

    let mirror = coordinator.write(Vote::new("Ana", "Ion", Category::Mfp));
    assert!(mirror.is_local_only());
    mirror.await;
    assert!(remote.rows(Collection::Votes).is_empty());
    assert_eq!(coordinator.snapshot::<Vote>().len(), 1);
}

#[tokio::test]
async fn malformed_remote_rows_are_skipped() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Votes,
        [
            json!({"voter": "Ana", "candidate": "Ion", "category": "MFP"}),
            json!({"voter": "Ion", "category": "NOT_A_CATEGORY"}),
        ],
    );
    let coordinator = connected(&remote).await;

    assert_eq!(
        coordinator.refresh::<Vote>().await,
        vec![Vote::new("Ana", "Ion", Category::Mfp)]
    );
}

#[tokio::test]
async fn rejoining_keeps_the_first_join_time() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;

    let first = Participant::new("Ana");
    coordinator.write(first.clone()).await;
    let mut later = Participant::new("Ana");
    later.joined_at = first.joined_at + chrono::Duration::hours(1);
    coordinator.write(later).await;

    assert_eq!(coordinator.snapshot::<Participant>(), vec![first.clone()]);
    assert_eq!(coordinator.refresh::<Participant>().await, vec![first]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_writes_from_many_tasks_are_all_kept() {
    let coordinator = offline();

    let tasks: Vec<_> = (0..200_i64)
        .map(|index| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .write(quote(&format!("q{index}"), "concurrent", index))
                    .await;
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(coordinator.snapshot::<Quote>().len(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn refresh_racing_writes_never_drops_a_local_record() {
    let remote = Arc::new(MemoryRemote::new());
    let coordinator = connected(&remote).await;
    remote.set_fail_writes(true);

    let mut tasks = Vec::new();
    for index in 0..200_i64 {
        let refresher = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            refresher.refresh::<Quote>().await;
        }));
        let writer = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            writer
                .write(quote(&format!("q{index}"), "racing", index))
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(remote.rows(Collection::Quotes).is_empty());
    assert_eq!(coordinator.snapshot::<Quote>().len(), 200);
    assert_eq!(coordinator.refresh::<Quote>().await.len(), 200);
}

#[tokio::test]
async fn fetch_finishing_after_cancel_is_not_delivered() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Quotes,
        [json!({"id": "r1", "text": "late", "author": "Ion", "added_by": "Ana", "timestamp": 5})],
    );
    let coordinator = connected(&remote).await;
    remote.set_pending(true);

    let (subscription, mut updates) = watch::<Quote>(&coordinator);
    assert!(updates.try_recv().unwrap().is_empty());
    tokio::task::yield_now().await;
    subscription.cancel();

    remote.set_pending(false);
    tokio::time::timeout(Duration::from_secs(2), async {
        while coordinator.snapshot::<Quote>().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("in-flight fetch never finished");
    remote.notify_change(Collection::Quotes);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn subscribe_delivers_local_snapshot_then_merged_view() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        Collection::Quotes,
        [
            json!({"id": "1", "text": "remote text", "author": "Ion", "added_by": "Ana", "timestamp": 100}),
            json!({"id": "2", "text": "remote only", "author": "Ion", "added_by": "Ana", "timestamp": 200}),
        ],
    );
    let coordinator = connected(&remote).await;
    let local = vec![quote("1", "local text", 100), quote("3", "local only", 300)];
    coordinator.inner.local.put(&local);
    let expected = merge(decode_rows::<Quote>(remote.rows(Collection::Quotes)), &local);

    let (_subscription, mut updates) = watch::<Quote>(&coordinator);
    let mut local_view = local.clone();
    Quote::sort_for_display(&mut local_view);
    assert_eq!(updates.try_recv().unwrap(), local_view);

    let merged = next_matching(&mut updates, |records| records.len() == 3).await;
    assert_eq!(merged, expected);
    assert_eq!(coordinator.snapshot::<Quote>(), expected);
    assert_eq!(
        merged.iter().map(|quote| quote.text.as_str()).collect::<Vec<_>>(),
        vec!["local only", "remote only", "remote text"]
    );
}
