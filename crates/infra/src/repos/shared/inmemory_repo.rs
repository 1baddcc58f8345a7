use silent_guard_domain::{Entity, ID};
use std::sync::Mutex;

/// Useful functions for creating inmemory repositories.
/// Every helper holds the collection lock for its whole duration which
/// makes each of them atomic with respect to the others.

pub fn insert<T: Clone>(val: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.push(val.clone());
}

pub fn find<T: Clone + Entity<ID>>(val_id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let collection = collection.lock().unwrap();
    collection.iter().find(|item| item.id() == *val_id).cloned()
}

pub fn find_by<T: Clone, F: FnMut(&T) -> bool>(collection: &Mutex<Vec<T>>, mut compare: F) -> Vec<T> {
    let collection = collection.lock().unwrap();
    collection.iter().filter(|item| compare(item)).cloned().collect()
}

/// Replaces the stored item with the same id as `val` if `precondition`
/// holds for the stored item. Returns whether the item was replaced.
pub fn save_if<T, F>(val: &T, collection: &Mutex<Vec<T>>, precondition: F) -> bool
where
    T: Clone + Entity<ID>,
    F: Fn(&T) -> bool,
{
    let mut collection = collection.lock().unwrap();
    match collection.iter_mut().find(|item| item.id() == val.id()) {
        Some(item) if precondition(item) => {
            *item = val.clone();
            true
        }
        _ => false,
    }
}

/// Removes the item with the given id if `precondition` holds for it
pub fn delete_if<T, F>(val_id: &ID, collection: &Mutex<Vec<T>>, precondition: F) -> Option<T>
where
    T: Clone + Entity<ID>,
    F: Fn(&T) -> bool,
{
    let mut collection = collection.lock().unwrap();
    let index = collection
        .iter()
        .position(|item| item.id() == *val_id && precondition(item))?;
    Some(collection.remove(index))
}

/// Applies `update` to every item matching `compare` and returns the updated items
pub fn update_many<T: Clone, F: Fn(&T) -> bool, U: Fn(&mut T)>(
    collection: &Mutex<Vec<T>>,
    compare: F,
    update: U,
) -> Vec<T> {
    let mut collection = collection.lock().unwrap();
    let mut updated = Vec::new();
    for item in collection.iter_mut() {
        if compare(item) {
            update(item);
            updated.push(item.clone());
        }
    }
    updated
}
