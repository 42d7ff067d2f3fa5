use synced_rust::{InMemoryDatabase, ModelStore};

use crate::support::Order;

fn store() -> ModelStore<InMemoryDatabase> {
    ModelStore::new(InMemoryDatabase::new())
}

#[test]
fn add_range_inserts_new_keys() {
    let store = store();
    let updated = store
        .add_range(vec![Order::stored("1", 1, 10), Order::stored("2", 2, 10)])
        .unwrap();

    assert_eq!(updated, 2);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn newer_update_timestamp_wins() {
    let store = store();
    let updated = store
        .add_range(vec![Order::stored("A", 1, 10), Order::stored("A", 2, 20)])
        .unwrap();

    assert_eq!(updated, 2);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 2);
}

#[test]
fn older_update_timestamp_is_ignored() {
    let store = store();
    let updated = store
        .add_range(vec![Order::stored("A", 1, 20), Order::stored("A", 2, 10)])
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 1);
}

#[test]
fn equal_timestamp_keeps_the_cached_record() {
    let store = store();
    store.add(Order::stored("A", 1, 10)).unwrap();

    let updated = store.add_range(vec![Order::stored("A", 2, 10)]).unwrap();

    assert_eq!(updated, 0);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 1);
}

#[test]
fn merge_compares_against_cached_records() {
    let store = store();
    store.add(Order::stored("A", 1, 50)).unwrap();
    store.add(Order::stored("B", 1, 50)).unwrap();

    let updated = store
        .add_range(vec![
            Order::stored("A", 2, 40),
            Order::stored("B", 2, 60),
            Order::stored("C", 2, 1),
        ])
        .unwrap();

    assert_eq!(updated, 2);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 1);
    assert_eq!(store.fetch_by_id::<Order>("B").unwrap().unwrap().total, 2);
    assert_eq!(store.fetch_by_id::<Order>("C").unwrap().unwrap().total, 2);
}

#[test]
fn empty_range_updates_nothing() {
    let store = store();
    assert_eq!(store.add_range(Vec::<Order>::new()).unwrap(), 0);
}

#[test]
fn tie_within_one_batch_keeps_the_first_applied() {
    let store = store();
    let updated = store
        .add_range(vec![Order::stored("A", 1, 10), Order::stored("A", 2, 10)])
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 1);
}
