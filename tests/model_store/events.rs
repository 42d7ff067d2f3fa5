use std::sync::mpsc;
use std::time::Duration;

use synced_rust::{InMemoryDatabase, ModelStore, ModelsChanged};

use crate::support::{Customer, Order};

fn subscribed() -> (ModelStore<InMemoryDatabase>, mpsc::Receiver<ModelsChanged>) {
    let store = ModelStore::new(InMemoryDatabase::new());
    let (tx, rx) = mpsc::channel();
    let tx = std::sync::Mutex::new(tx);
    store
        .on_models_changed(move |event| {
            let _ = tx.lock().unwrap().send(event);
        })
        .unwrap();
    (store, rx)
}

fn next(rx: &mpsc::Receiver<ModelsChanged>) -> ModelsChanged {
    rx.recv_timeout(Duration::from_secs(2)).unwrap()
}

#[test]
fn add_emits_models_changed() {
    let (store, rx) = subscribed();
    store.add(Order::stored("A", 1, 1)).unwrap();

    assert_eq!(
        next(&rx),
        ModelsChanged {
            type_tag: "Order".into(),
            count: 1
        }
    );
}

#[test]
fn merge_reports_the_number_of_stored_records() {
    let (store, rx) = subscribed();
    store
        .add_range(vec![
            Customer::new("1", "Ada"),
            Customer::new("2", "Bob"),
        ])
        .unwrap();

    let event = next(&rx);
    assert_eq!(event.type_tag, "Customer");
    assert_eq!(event.count, 2);
}

#[test]
fn no_op_changes_emit_nothing() {
    let (store, rx) = subscribed();
    assert!(!store.delete_by_id::<Order>("missing").unwrap());
    store.add_range(Vec::<Order>::new()).unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn delete_emits_models_changed() {
    let (store, rx) = subscribed();
    store.add(Order::stored("A", 1, 1)).unwrap();
    next(&rx);

    store.delete_by_id::<Order>("A").unwrap();
    assert_eq!(next(&rx).count, 1);
}
