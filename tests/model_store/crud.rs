use synced_rust::{AnyRecord, InMemoryDatabase, ModelStore, Record};

use crate::support::{Customer, Order};

fn store() -> ModelStore<InMemoryDatabase> {
    ModelStore::new(InMemoryDatabase::new())
}

#[test]
fn add_then_fetch_by_id_returns_equal_record() {
    let store = store();
    let order = Order::stored("A", 120, 10);

    store.add(order.clone()).unwrap();

    assert_eq!(store.fetch_by_id::<Order>("A").unwrap(), Some(order));
}

#[test]
fn add_replaces_same_key() {
    let store = store();
    store.add(Order::stored("A", 1, 10)).unwrap();
    store.add(Order::stored("A", 2, 5)).unwrap();

    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 2);
}

#[test]
fn same_id_in_different_types_does_not_collide() {
    let store = store();
    store.add(Order::stored("1", 5, 10)).unwrap();
    store.add(Customer::new("1", "Ada")).unwrap();

    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(store.fetch_by_id::<Order>("1").unwrap().unwrap().total, 5);
    assert_eq!(
        store.fetch_by_id::<Customer>("1").unwrap().unwrap().name,
        "Ada"
    );
}

#[test]
fn delete_then_fetch_by_id_is_absent() {
    let store = store();
    let order = Order::stored("A", 1, 10);
    store.add(order.clone()).unwrap();

    assert!(store.delete(&order).unwrap());
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap(), None);
}

#[test]
fn delete_missing_is_not_an_error() {
    let store = store();
    assert!(!store.delete(&Order::stored("nope", 1, 1)).unwrap());
    assert!(!store.delete_by_id::<Order>("nope").unwrap());
}

#[test]
fn fetch_by_id_miss_is_none() {
    let store = store();
    assert!(store.fetch_by_id::<Order>("missing").unwrap().is_none());
    assert!(store.fetch_by_key("Order", "missing").unwrap().is_none());
}

#[test]
fn fetch_typed_filters_by_type_and_predicate() {
    let store = store();
    store.add(Order::stored("1", 10, 1)).unwrap();
    store.add(Order::stored("2", 20, 1)).unwrap();
    store.add(Order::stored("3", 5, 1)).unwrap();
    store.add(Customer::new("4", "Bob")).unwrap();

    let mut big = store.fetch_typed::<Order, _>(|o| o.total > 8).unwrap();
    big.sort_by(|a, b| a.id.cmp(&b.id));

    let ids: Vec<&str> = big.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn fetch_untyped_sees_every_type() {
    let store = store();
    store.add(Order::stored("1", 10, 1)).unwrap();
    store.add(Customer::new("2", "Cy")).unwrap();

    let all = store.fetch(|_| true).unwrap();
    assert_eq!(all.len(), 2);

    let customers = store.fetch(|r| r.type_tag() == Customer::TYPE_TAG).unwrap();
    assert_eq!(customers.len(), 1);
    assert!(customers[0].is::<Customer>());
    assert_eq!(customers[0].record_id(), "2");
}

#[test]
fn transforms_run_on_the_snapshot() {
    let store = store();
    for (id, total) in [("1", 30), ("2", 10), ("3", 20)] {
        store.add(Order::stored(id, total, 1)).unwrap();
    }

    let top_two = store
        .fetch_typed_with::<Order, _, _, _>(
            |_| true,
            |mut orders| {
                orders.sort_by(|a, b| b.total.cmp(&a.total));
                orders.truncate(2);
                orders
            },
        )
        .unwrap();
    assert_eq!(
        top_two.iter().map(|o| o.total).collect::<Vec<_>>(),
        vec![30, 20]
    );

    // The transform may call back into the store: the lock is released.
    let count = store
        .fetch_with(|_| true, |records| {
            store.add(Order::stored("4", 1, 1)).unwrap();
            records.len()
        })
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(store.len().unwrap(), 4);
}

#[test]
fn fetch_first_returns_a_match() {
    let store = store();
    store.add(Order::stored("1", 10, 1)).unwrap();
    store.add(Order::stored("2", 99, 1)).unwrap();

    let found = store.fetch_first::<Order, _>(|o| o.total == 99).unwrap();
    assert_eq!(found.map(|o| o.id), Some("2".to_string()));
    assert!(store
        .fetch_first::<Order, _>(|o| o.total == 0)
        .unwrap()
        .is_none());
}

#[test]
fn fetch_all_copies_the_map() {
    let store = store();
    store.add(Order::stored("1", 10, 1)).unwrap();

    let snapshot = store.fetch_all().unwrap();
    store.add(Order::stored("2", 10, 1)).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn snapshots_are_not_affected_by_later_writes() {
    let store = store();
    store.add(Order::stored("A", 1, 1)).unwrap();

    let before = store.fetch_by_id::<Order>("A").unwrap().unwrap();
    store
        .modify::<Order, _>("A", |o| o.total = 2)
        .unwrap()
        .unwrap();

    assert_eq!(before.total, 1);
    assert_eq!(store.fetch_by_id::<Order>("A").unwrap().unwrap().total, 2);
}
