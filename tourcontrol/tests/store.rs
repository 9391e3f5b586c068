use tourcontrol::{PoiId, StoreEvent, TourStore};

#[test]
fn test_toggle_membership_follows_call_parity() {
    let id = PoiId::new("cn-tower");

    for initially_favorite in [false, true] {
        for calls in 0..6 {
            let store = TourStore::new();
            if initially_favorite {
                store.toggle_favorite(id.clone());
            }
            for _ in 0..calls {
                store.toggle_favorite(id.clone());
            }

            let expected = initially_favorite ^ (calls % 2 == 1);
            assert_eq!(store.is_favorite(&id), expected, "calls={}", calls);
            assert!(store.favorites().len() <= 1);
        }
    }
}

#[test]
fn test_selection_reads_back_last_write() {
    let store = TourStore::new();
    assert_eq!(store.selected_poi_id(), None);

    for id in ["cn-tower", "casa-loma", "cn-tower", "not-in-any-catalog"] {
        store.set_selected_poi_id(id);
        assert_eq!(store.selected_poi_id(), Some(PoiId::new(id)));
    }
}

#[test]
fn test_subscribers_are_notified_in_order() {
    let store = TourStore::new();
    let events = store.subscribe();

    store.set_selected_poi_id("rogers-centre");
    assert!(store.toggle_favorite("rogers-centre"));
    assert!(!store.toggle_favorite("rogers-centre"));

    let received: Vec<StoreEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            StoreEvent::SelectionChanged {
                poi_id: PoiId::new("rogers-centre")
            },
            StoreEvent::FavoritesChanged {
                poi_id: PoiId::new("rogers-centre"),
                is_favorite: true
            },
            StoreEvent::FavoritesChanged {
                poi_id: PoiId::new("rogers-centre"),
                is_favorite: false
            },
        ]
    );
}

#[test]
fn test_concurrent_readers_see_consistent_snapshots() {
    let store = TourStore::new();
    let writer = store.clone();

    let handle = std::thread::spawn(move || {
        for i in 0..100 {
            writer.toggle_favorite(format!("poi-{}", i % 5));
        }
    });
    for _ in 0..100 {
        let snapshot = store.snapshot();
        let mut unique = snapshot.favorites.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), snapshot.favorites.len());
    }
    handle.join().unwrap();

    // 20 toggles per id: everything is back out
    assert!(store.favorites().is_empty());
}
