//! Fixtures shared by unit tests.

use crate::{
    models::{Category, EntryKey, OwnerId, Snapshot},
    store::{CollectionStore, MemoryStore},
};

pub fn owner(token: &str) -> OwnerId {
    OwnerId::parse(token).unwrap()
}

/// Adds entries in the given order, so the last one is the newest
pub async fn seed(store: &MemoryStore, owner: &OwnerId, items: &[(Category, i64, &str)]) {
    for (category, external_id, title) in items {
        let added = store
            .toggle(
                owner,
                EntryKey::new(*category, *external_id),
                &Snapshot::titled(*title),
            )
            .await
            .unwrap();
        assert!(added, "fixture item {} seeded twice", external_id);
    }
}

/// 15 movies (ids 1..=15) and 10 shows (ids 101..=110); three titles contain "Bat"
pub async fn seed_mixed_collection(store: &MemoryStore, owner: &OwnerId) {
    let mut items: Vec<(Category, i64, String)> = Vec::new();
    for id in 1..=15 {
        let title = match id {
            3 => "Batman Begins".to_string(),
            9 => "The Batman".to_string(),
            _ => format!("Movie {}", id),
        };
        items.push((Category::Movie, id, title));
    }
    for id in 101..=110 {
        let title = match id {
            104 => "Batwoman".to_string(),
            _ => format!("Show {}", id),
        };
        items.push((Category::Tv, id, title));
    }

    let borrowed: Vec<(Category, i64, &str)> = items
        .iter()
        .map(|(c, id, t)| (*c, *id, t.as_str()))
        .collect();
    seed(store, owner, &borrowed).await;
}
