use chunked_ecs::{EcsError, EntityId, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rotation {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Lifeform {
    hit_points: u32,
    max_hit_points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Weapon {
    delay: f32,
    charging: f32,
    range: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Durability {
    current: u32,
    max: u32,
}

#[test]
fn test_create_and_read() {
    let mut world = World::new();

    let entity = world
        .create_entity::<(Position, Rotation, Lifeform)>(true)
        .unwrap();
    assert!(world.set_component(
        entity,
        Position {
            x: 1.0,
            y: 2.0,
            z: 3.0
        }
    ));

    assert_eq!(
        world.get_component::<Position>(entity),
        Some(&Position {
            x: 1.0,
            y: 2.0,
            z: 3.0
        })
    );
    assert_eq!(world.get_component::<Weapon>(entity), None);
}

#[test]
fn test_pool_isolation() {
    let mut world = World::new();

    let soldier = world
        .add_entity((
            Position {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            Rotation {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            Lifeform {
                hit_points: 100,
                max_hit_points: 100,
            },
        ))
        .unwrap();
    let sword = world
        .add_entity((
            Position {
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
            Rotation {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            Weapon {
                delay: 0.5,
                charging: 0.0,
                range: 2.0,
            },
            Durability { current: 50, max: 50 },
        ))
        .unwrap();

    assert_eq!(world.pool_count(), 2);
    assert!(world.get_component::<Lifeform>(soldier).is_some());
    assert!(world.get_component::<Lifeform>(sword).is_none());
    assert!(world.get_component::<Weapon>(sword).is_some());
    assert!(world.get_component::<Weapon>(soldier).is_none());
}

#[test]
fn test_unknown_entity_operations() {
    let mut world = World::new();
    world.add_pool::<(Position,)>().unwrap();

    let ghost = EntityId::from_raw(9999);
    assert!(!world.remove_entity(ghost));
    assert!(world.get_component::<Position>(ghost).is_none());
    assert!(!world.set_component(
        ghost,
        Position {
            x: 0.0,
            y: 0.0,
            z: 0.0
        }
    ));
}

#[test]
fn test_create_entity_requires_pool_when_not_auto() {
    let mut world = World::new();
    assert_eq!(
        world.create_entity::<(Position, Rotation)>(false),
        Err(EcsError::PoolNotFound)
    );
}

#[test]
fn test_ids_are_unique_across_pools() {
    let mut world = World::new();
    let a = world.create_entity::<(Position,)>(true).unwrap();
    let b = world
        .create_entity::<(Position, Rotation)>(true)
        .unwrap();
    let c = world.create_entity::<(Position,)>(true).unwrap();

    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
    assert_eq!(world.entity_count(), 3);
}

#[test]
fn test_remove_entity_from_other_threads() {
    let mut world = World::new();
    let entities: Vec<EntityId> = (0..100)
        .map(|i| {
            world
                .add_entity((Position {
                    x: i as f32,
                    y: 0.0,
                    z: 0.0,
                },))
                .unwrap()
        })
        .collect();

    std::thread::scope(|scope| {
        let world = &world;
        for batch in entities.chunks(25) {
            scope.spawn(move || {
                for &entity in batch {
                    assert!(world.remove_entity(entity));
                }
            });
        }
    });

    world.flush();
    assert_eq!(world.entity_count(), 0);
}
