use std::cell::RefCell;
use std::rc::Rc;

use engine_ecs::{Component, EcsError, Entity, Query, QueryDesc, World};

#[derive(Debug, Default, Clone, PartialEq)]
struct A(u32);
impl Component for A {}

#[derive(Debug, Default, Clone, PartialEq)]
struct B(u32);
impl Component for B {}

#[derive(Debug, Default, Clone, PartialEq)]
struct C(u32);
impl Component for C {}

fn members(query: &Query) -> Vec<Entity> {
    let mut entities = query.entities();
    entities.sort();
    entities
}

#[test]
fn test_single_entity_lifecycle() {
    let mut world = World::new();
    let e = world.create_entity();

    world.insert_component(e, A(1)).unwrap();
    assert_eq!(world.has_component::<A>(e), Ok(true));
    assert_eq!(world.has_component::<B>(e), Ok(false));

    world.insert_component(e, B(2)).unwrap();
    assert_eq!(world.remove_component::<A>(e), Ok(Some(A(1))));
    assert_eq!(world.has_component::<A>(e), Ok(false));
    assert_eq!(world.has_component::<B>(e), Ok(true));
    assert_eq!(world.entity_component_count(e), Ok(1));

    world.destroy_entity(e).unwrap();
    assert!(!world.is_entity_valid(e));
}

#[test]
fn test_all_none_membership_and_none_readd() {
    let mut world = World::new();
    let e1 = world.create_entity();
    world.add_component::<A>(e1).unwrap();
    world.add_component::<B>(e1).unwrap();
    let e2 = world.create_entity();
    world.add_component::<A>(e2).unwrap();
    world.add_component::<B>(e2).unwrap();
    world.add_component::<C>(e2).unwrap();
    let e3 = world.create_entity();
    world.add_component::<A>(e3).unwrap();

    let query = world
        .query()
        .with_all::<A>()
        .with_all::<B>()
        .with_none::<C>()
        .build();
    assert_eq!(members(&query), vec![e1]);

    world.remove_component::<C>(e2).unwrap();
    assert_eq!(members(&query), vec![e1, e2]);
}

#[test]
fn test_filter_canonicalization() {
    let mut world = World::new();
    let a = world.component_id::<A>();
    let b = world.component_id::<B>();
    let c = world.component_id::<C>();

    let first = world.get_query(QueryDesc::new().with_all([a, b]).with_any([c]));
    let second = world.get_query(
        QueryDesc::new()
            .with_any([c, c])
            .with_all([b])
            .with_all([a]),
    );

    assert_eq!(first.signature(), second.signature());
    assert_eq!(first.id(), second.id());
    assert_eq!(world.query_count(), 1);

    let typed = world.query().with_any::<C>().with_all::<B>().with_all::<A>().build();
    assert_eq!(typed.id(), first.id());
}

#[test]
fn test_deferred_changes_replay_in_order_after_iteration() {
    let mut world = World::new();
    let query = world.query().with_all::<A>().build();
    let e1 = world.create_entity();
    world.add_component::<A>(e1).unwrap();
    let e2 = world.create_entity();
    world.add_component::<A>(e2).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let added = Rc::clone(&log);
    query.on_entity_added(move |e| added.borrow_mut().push(format!("+{}", e.0)));
    let removed = Rc::clone(&log);
    query.on_entity_removed(move |e| removed.borrow_mut().push(format!("-{}", e.0)));

    let mut seen = Vec::new();
    let mut spawned = Vec::new();
    for entity in &query {
        seen.push(entity);
        world.remove_component::<A>(entity).unwrap();
        let fresh = world.create_entity();
        world.add_component::<A>(fresh).unwrap();
        spawned.push(fresh);
        assert!(log.borrow().is_empty(), "changes must wait for the unlock");
    }

    assert!(!query.is_locked());
    let expected: Vec<String> = seen
        .iter()
        .zip(&spawned)
        .flat_map(|(old, new)| [format!("-{}", old.0), format!("+{}", new.0)])
        .collect();
    assert_eq!(*log.borrow(), expected);

    seen.sort();
    assert_eq!(seen, vec![e1, e2]);
    spawned.sort();
    assert_eq!(members(&query), spawned);
}

#[test]
fn test_deferred_toggle_replays_each_op() {
    let mut world = World::new();
    let query = world.query().with_all::<B>().build();
    let e = world.create_entity();
    let hits = Rc::new(RefCell::new(Vec::new()));
    let added = Rc::clone(&hits);
    query.on_entity_added(move |e| added.borrow_mut().push(("add", *e)));
    let removed = Rc::clone(&hits);
    query.on_entity_removed(move |e| removed.borrow_mut().push(("remove", *e)));

    query.lock();
    world.add_component::<B>(e).unwrap();
    world.remove_component::<B>(e).unwrap();
    world.add_component::<B>(e).unwrap();
    assert!(query.is_empty());
    query.unlock().unwrap();

    assert_eq!(
        *hits.borrow(),
        vec![("add", e), ("remove", e), ("add", e)]
    );
    assert!(query.contains(e));
}

#[test]
fn test_nested_locks_flush_on_last_unlock() {
    let mut world = World::new();
    let query = world.query().with_all::<A>().build();
    let e = world.create_entity();

    query.lock();
    {
        let mut outer = query.iter();
        assert_eq!(outer.next(), None);
        world.add_component::<A>(e).unwrap();
    }
    assert!(query.is_empty(), "manual lock still held");
    query.unlock().unwrap();
    assert!(query.contains(e));
    assert_eq!(query.unlock(), Err(EcsError::LockImbalance { query: query.id() }));
}

#[test]
fn test_recycling_never_repeats_version() {
    let mut world = World::new();
    let mut versions = Vec::new();
    let mut slot = None;
    for _ in 0..50 {
        let e = world.create_entity();
        if let Some(previous) = slot {
            assert_eq!(e, previous);
        }
        slot = Some(e);
        let version = world.entity_version(e).unwrap();
        assert!(version > 0);
        assert!(!versions.contains(&version));
        versions.push(version);
        world.destroy_entity(e).unwrap();
        assert!(world.entity_version(e).unwrap() <= 0);
    }
}

#[test]
fn test_validity_matches_version_sign() {
    let mut world = World::new();
    let entities: Vec<_> = (0..6).map(|_| world.create_entity()).collect();
    for e in entities.iter().step_by(2) {
        world.destroy_entity(*e).unwrap();
    }
    for e in &entities {
        let version = world.entity_version(*e).unwrap();
        assert_eq!(world.is_entity_valid(*e), version > 0);
    }
    assert!(!world.is_entity_valid(Entity(6)));
    assert!(!world.is_entity_valid(Entity(10_000)));
}

#[test]
fn test_remove_absent_and_duplicate_add() {
    let mut world = World::new();
    let e = world.create_entity();
    world.insert_component(e, A(4)).unwrap();

    assert_eq!(world.remove_component::<C>(e), Ok(None));
    assert_eq!(world.has_component::<C>(e), Ok(false));
    assert_eq!(world.entity_component_count(e), Ok(1));

    let err = world.insert_component(e, A(5)).map(|_| ()).unwrap_err();
    assert!(matches!(err, EcsError::DuplicateComponent { component: "A", .. }));
    assert_eq!(world.get_component::<A>(e), Ok(&A(4)));
}

#[test]
fn test_store_handle_round_trip() {
    let mut world = World::new();
    let e = world.create_entity();
    let mut store = world.store::<B>();
    store.add(e).unwrap().0 = 12;
    assert_eq!(store.get(e), Ok(&B(12)));
    assert_eq!(store.len(), 1);
    assert_eq!(store.has(e), Ok(true));
}

#[test]
fn test_world_events_fire_in_order() {
    let mut world = World::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let events = world.events_mut();
    let l = Rc::clone(&log);
    events.entity_created.subscribe(move |e| l.borrow_mut().push(format!("created {}", e.0)));
    let l = Rc::clone(&log);
    events
        .component_added
        .subscribe(move |(e, id)| l.borrow_mut().push(format!("added {} {}", e.0, id.0)));
    let l = Rc::clone(&log);
    events
        .component_removed
        .subscribe(move |(e, id)| l.borrow_mut().push(format!("removed {} {}", e.0, id.0)));
    let l = Rc::clone(&log);
    events.entity_destroyed.subscribe(move |e| l.borrow_mut().push(format!("destroyed {}", e.0)));

    let e = world.create_entity();
    world.add_component::<A>(e).unwrap();
    world.destroy_entity(e).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["created 0", "added 0 0", "removed 0 0", "destroyed 0"]
    );
}
