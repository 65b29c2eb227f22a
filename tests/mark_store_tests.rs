mod common;

use std::path::PathBuf;

use common::FakeView;
use marksync::host::ListingView;
use marksync::marks::{MarkStore, Toggle};

#[test]
fn toggle_twice_restores_the_prior_state() {
    let mut store = MarkStore::new();
    let mut view = FakeView::new(1, "/srv");
    let before = store.snapshot();

    store.toggle(PathBuf::from("/srv/a"), &mut view, 0);
    store.toggle(PathBuf::from("/srv/a"), &mut view, 0);

    assert_eq!(store.snapshot(), before);
    assert!(view.live.is_empty());
}

#[test]
fn snapshot_is_sorted_for_any_toggle_sequence() {
    let mut store = MarkStore::new();
    let mut view = FakeView::new(1, "/srv");
    for p in ["/srv/z", "/srv/m", "/srv/a", "/srv/q", "/srv/m"] {
        store.toggle(PathBuf::from(p), &mut view, 0);
    }

    let snapshot = store.snapshot();
    let mut sorted = snapshot.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(snapshot, sorted);
    // /srv/m toggled twice and fell out.
    assert_eq!(snapshot.len(), 3);
}

#[test]
fn a_mark_is_shared_across_views() {
    let mut store = MarkStore::new();
    let mut left = FakeView::new(1, "/srv");
    let mut right = FakeView::new(2, "/srv");

    assert_eq!(
        store.toggle(PathBuf::from("/srv/a"), &mut left, 3),
        Toggle::Marked
    );
    // Unmarking from another view removes the same logical mark.
    assert_eq!(
        store.toggle(PathBuf::from("/srv/a"), &mut right, 9),
        Toggle::Unmarked
    );
    assert!(store.is_empty());
}

#[test]
fn reload_clears_visuals_but_not_marks() {
    let mut store = MarkStore::new();
    let mut view = FakeView::new(1, "/srv");
    store.toggle(PathBuf::from("/srv/a"), &mut view, 0);
    store.toggle(PathBuf::from("/srv/b"), &mut view, 1);

    store.on_view_reset(&mut view);

    assert!(view.live.is_empty());
    assert_eq!(store.len(), 2);
}

#[test]
fn clear_all_handles_many_views_regardless_of_size() {
    let mut store = MarkStore::new();
    let mut views: Vec<FakeView> = (1..=4).map(|id| FakeView::new(id, "/srv")).collect();
    for (i, view) in views.iter_mut().enumerate() {
        for j in 0..25 {
            store.toggle(PathBuf::from(format!("/srv/{i}-{j}")), view, j);
        }
    }
    assert_eq!(store.len(), 100);

    store.clear_all(views.iter_mut().map(|v| v as &mut dyn ListingView));

    assert!(store.is_empty());
    assert!(store.snapshot().is_empty());
    assert!(views.iter().all(|v| v.live.is_empty()));
}
