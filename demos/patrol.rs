//! Patrolling Guard
//!
//! This example drives a two-level machine for a game guard.
//!
//! Key concepts:
//! - Latched conditions fired by a `Signal`
//! - A nested `SubFsm` that reports when it is finished
//! - An any-node escape with a trace-back return
//!
//! Run with: RUST_LOG=hfsm=debug cargo run --example patrol

use hfsm::core::{ActionNode, Condition, NodeRef, Signal};
use hfsm::{Fsm, FsmError, SubFsm};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug)]
struct World {
    distance: Cell<u32>,
    enemy_health: Cell<i32>,
    health: Cell<i32>,
}

fn main() -> Result<(), FsmError> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "hfsm=info".to_string()))
        .init();

    println!("=== Patrolling Guard Example ===\n");

    let world = Rc::new(World {
        distance: Cell::new(3),
        enemy_health: Cell::new(7),
        health: Cell::new(6),
    });
    let spotted = Signal::new();

    let patrol = NodeRef::new(ActionNode::new("Patrol"));

    let approach = {
        let world = Rc::clone(&world);
        NodeRef::new(ActionNode::new("Approach").with_update(move |_| {
            world.distance.set(world.distance.get().saturating_sub(1));
        }))
    };
    let attack = {
        let world = Rc::clone(&world);
        NodeRef::new(ActionNode::new("Attack").with_update(move |_| {
            world.enemy_health.set(world.enemy_health.get() - 3);
        }))
    };
    let flee = {
        let world = Rc::clone(&world);
        NodeRef::new(ActionNode::new("Flee").with_update(move |_| {
            world.health.set(world.health.get() + 1);
        }))
    };

    // Inner machine: close the distance, then fight until the enemy is down.
    let combat = SubFsm::new("Combat");
    {
        let mut inner = combat.borrow_mut();
        let in_range = Rc::clone(&world);
        inner.add_transition(
            &approach,
            &attack,
            Condition::poll(move || in_range.distance.get() == 0),
        )?;
        let defeated = Rc::clone(&world);
        inner.add_transition_to_exit(
            &attack,
            Condition::poll(move || defeated.enemy_health.get() <= 0),
        )?;
    }

    let mut guard = Fsm::new("Guard");
    guard.add_transition(&patrol, &combat, Condition::latch(spotted.clone()))?;
    let done = combat.clone();
    guard.add_transition(&combat, &patrol, Condition::poll(move || done.is_finished()))?;

    let wounded = Rc::clone(&world);
    guard.add_transition_from_any(&flee, Condition::poll(move || wounded.health.get() < 3))?;
    let healed = Rc::clone(&world);
    guard.add_transition_to_previous(&flee, Condition::poll(move || healed.health.get() >= 5))?;

    guard.start()?;

    for tick in 0..16 {
        match tick {
            2 => {
                println!("  ! intruder spotted");
                spotted.emit();
            }
            5 => {
                println!("  ! guard is hit");
                world.health.set(2);
            }
            _ => {}
        }

        guard.update();
        guard.fixed_update();

        let snapshot = guard.snapshot();
        println!("tick {tick:>2}: {}", snapshot.active_path().join(" / "));
    }

    println!("\nFinal state: {:?}", world);
    Ok(())
}
