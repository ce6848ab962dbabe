//! Fixed timestep simulation tick
//!
//! In-tick order: abilities, movement, collection and score, gates and
//! scheduler, timers (which read the fresh difficulty), hazard simulation,
//! market entry, cleanup. An open shop freezes the world and only counts
//! down its own real-time limit.

use glam::Vec2;

use super::collision::LayerMask;
use super::player::{BuffKind, Upgrade};
use super::spawners::{Buff, HazardSpawnInputs};
use super::state::{GameEvent, GamePhase, GameState};
use crate::move_towards;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Point to walk toward (mouse/touch)
    pub move_target: Option<Vec2>,
    /// Direction to walk in (keys/stick); ignored when a target is set
    pub move_dir: Vec2,
    /// Pause toggle
    pub pause: bool,
    /// Use swat this tick
    pub swat: bool,
    /// Teleport destination
    pub teleport: Option<Vec2>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }
    match state.phase {
        GamePhase::Playing => {}
        GamePhase::Shopping => {
            count_down_shop(state, dt);
            return;
        }
        _ => return,
    }

    state.time_ticks += 1;
    let (scaled_dt, unscaled_dt) = state.clock.advance(dt);
    state.world.ensure_arena();

    use_abilities(state, input);
    move_player(state, input, unscaled_dt);
    if state.player.modifiers.has_upgrade(Upgrade::BuffMagnet) {
        let t = &state.world.tuning.buff;
        state
            .buffs
            .apply_magnet(state.player.pos, t.magnet_range, t.magnet_strength, scaled_dt);
    }

    if try_escape(state) {
        return;
    }
    expire_buffs(state, scaled_dt, unscaled_dt);
    collect(state);
    update_gates(state);
    fire_timers(state, scaled_dt, unscaled_dt);
    simulate_hazards(state, scaled_dt);
    if state.phase == GamePhase::Playing {
        state.enter_market();
    }

    state.normalize_order();
}

/// The shop limit runs on real time
fn count_down_shop(state: &mut GameState, dt: f32) {
    let Some(shop) = state.shop.as_mut() else {
        state.phase = GamePhase::Playing;
        return;
    };
    shop.remaining -= dt;
    if shop.remaining <= 0.0 {
        log::debug!("Shop {} timed out", shop.market_id);
        state.close_shop();
    }
}

fn use_abilities(state: &mut GameState, input: &TickInput) {
    if input.swat {
        state.use_swat();
    }
    if let Some(target) = input.teleport {
        state.use_teleport(target);
    }
}

/// The player runs on real time so slow motion only slows the world
fn move_player(state: &mut GameState, input: &TickInput, dt: f32) {
    let player = &mut state.player;
    let step = player.speed(&state.world.tuning) * dt;
    let mut pos = match input.move_target {
        Some(target) => move_towards(player.pos, target, step),
        None => match input.move_dir.try_normalize() {
            Some(dir) => player.pos + dir * step,
            None => return,
        },
    };

    // Slide off props, then stay inside the walls
    let contact = state
        .world
        .obstacles
        .circle_contact(pos, player.radius, LayerMask::PROPS);
    if contact.hit {
        pos += contact.normal * contact.penetration;
    }
    if let Some(arena) = &state.world.arena {
        pos = arena.clamp(pos, player.radius);
    }
    player.pos = pos;
}

fn try_escape(state: &mut GameState) -> bool {
    if state
        .escape_holes
        .reached(state.player.pos, state.player.radius)
        .is_none()
    {
        return false;
    }
    let score = state.score.total();
    log::info!("Escaped with score {}", score);
    state.world.events.push(GameEvent::EscapeReached { score });
    state.phase = GamePhase::Victory;
    state.stop_spawners();
    true
}

fn expire_buffs(state: &mut GameState, scaled_dt: f32, unscaled_dt: f32) {
    for kind in state.player.modifiers.tick_buffs(scaled_dt, unscaled_dt) {
        if kind == BuffKind::SlowMotion {
            state.clock.time_scale = 1.0;
        }
        state.world.events.push(GameEvent::BuffExpired { kind });
    }
}

fn collect(state: &mut GameState) {
    let pos = state.player.pos;
    let radius = state.player.radius;

    let taken = state.collectibles.collect(pos, radius);
    if !taken.is_empty() {
        let multiplier = state.player.score_multiplier(&state.world.tuning);
        for item in taken {
            let points = item.points * multiplier;
            state.score.add(points);
            state
                .world
                .events
                .push(GameEvent::CollectibleCollected { id: item.id, points });
        }
        state.world.events.push(GameEvent::ScoreChanged {
            score: state.score.total(),
            balance: state.score.balance(),
        });
    }

    for buff in state.buffs.collect(pos, radius) {
        apply_buff(state, buff);
    }
}

fn apply_buff(state: &mut GameState, buff: Buff) {
    let t = &state.world.tuning.buff;
    state.player.modifiers.apply_buff(buff.kind, t.effect_duration);
    if buff.kind == BuffKind::SlowMotion {
        state.clock.time_scale = t.slow_motion_scale;
        state
            .buffs
            .arm_slow_motion_safety(t.effect_duration + t.safety_margin);
    }
    log::debug!("Buff {:?} picked up", buff.kind);
    state.world.events.push(GameEvent::BuffCollected {
        id: buff.id,
        kind: buff.kind,
    });
}

fn update_gates(state: &mut GameState) {
    let total = state.score.total();
    if let Some(level) = state.difficulty.on_score_update(total) {
        state.world.events.push(GameEvent::DifficultyChanged { level });
    }

    let balance = state.score.balance();
    let mut ctx = state.world.ctx(Some(state.player.pos));
    state.market.on_score(&mut ctx, total);
    state.escape_holes.on_score(&mut ctx, total, balance);
    state.escape_holes.check_balance(&mut ctx, balance);
}

fn fire_timers(state: &mut GameState, scaled_dt: f32, unscaled_dt: f32) {
    let inputs = HazardSpawnInputs {
        score: state.score.total(),
        owned_upgrades: state.player.modifiers.upgrade_count(),
    };
    let slow_motion = state.player.modifiers.has_buff(BuffKind::SlowMotion);
    let holes = state.escape_holes.positions();

    let mut ctx = state.world.ctx(Some(state.player.pos));
    state
        .hazards
        .update(&mut ctx, &state.difficulty, inputs, &holes, scaled_dt, unscaled_dt);
    state
        .buffs
        .update(&mut ctx, &mut state.clock, slow_motion, scaled_dt, unscaled_dt);
    state.market.update(&mut ctx, scaled_dt, unscaled_dt);
    state.escape_holes.update(&mut ctx, scaled_dt, unscaled_dt);

    let hazards = state.hazards.positions();
    let holes = state.escape_holes.positions();
    state.collectibles.update(&mut ctx, &hazards, &holes);
}

fn simulate_hazards(state: &mut GameState, scaled_dt: f32) {
    let radius = state.player.radius;
    let hit = {
        let mut ctx = state.world.ctx(Some(state.player.pos));
        state.hazards.simulate(&mut ctx, scaled_dt, radius)
    };
    let Some(id) = hit else {
        return;
    };
    if !state.player.take_damage() {
        return;
    }

    let score = state.score.total();
    log::info!("Caught by hazard {} with score {}", id, score);
    state.world.events.push(GameEvent::PlayerDamaged {
        pos: state.player.pos,
    });
    state.world.events.push(GameEvent::GameOver { score });
    state.phase = GamePhase::GameOver;
    state.stop_spawners();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{HAZARD_RADIUS, SIM_DT};
    use crate::sim::hazard::{Abilities, Hazard, Side};
    use crate::sim::state::DestroyCause;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        GameState::with_default_level(42, Tuning::standard()).unwrap()
    }

    fn run(state: &mut GameState, ticks: u32) {
        let input = TickInput::default();
        for _ in 0..ticks {
            tick(state, &input, SIM_DT);
        }
    }

    fn hazard(state: &mut GameState, pos: Vec2) -> Hazard {
        let id = state.world.next_entity_id();
        let side = if pos.x < 0.0 { Side::Left } else { Side::Right };
        Hazard::spawn(id, pos, side, 5.0, HAZARD_RADIUS, Abilities::default())
    }

    #[test]
    fn test_tick_pause() {
        let mut state = state();
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Paused);

        run(&mut state, 10);
        assert_eq!(state.time_ticks, 0);

        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_determinism() {
        let mut a = state();
        let mut b = state();
        let input = TickInput {
            move_dir: Vec2::new(1.0, 0.3),
            ..Default::default()
        };
        for _ in 0..600 {
            tick(&mut a, &input, SIM_DT);
            tick(&mut b, &input, SIM_DT);
        }
        assert_eq!(a.drain_events(), b.drain_events());
        assert_eq!(a.player.pos, b.player.pos);
    }

    #[test]
    fn test_collecting_scores_and_replaces() {
        let mut state = state();
        run(&mut state, 1);
        let first = state.collectibles.items[0].clone();
        state.drain_events();

        state.player.pos = first.pos;
        run(&mut state, 1);
        assert_eq!(state.score.total(), 1);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::CollectibleCollected { id: first.id, points: 1 }));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 1, balance: 1 }));
        assert_eq!(state.collectibles.items.len(), 1);
        assert_ne!(state.collectibles.items[0].id, first.id);
    }

    #[test]
    fn test_score_crossing_opens_market_same_tick() {
        let mut state = state();
        run(&mut state, 1);
        state.score.add(4);
        state.player.pos = state.collectibles.items[0].pos;
        run(&mut state, 1);
        assert_eq!(state.score.total(), 5);
        assert!(state.market.is_open());
    }

    #[test]
    fn test_player_moves_toward_target_and_stays_inside() {
        let mut state = state();
        let input = TickInput {
            move_target: Some(Vec2::new(100.0, 0.0)),
            ..Default::default()
        };
        for _ in 0..240 {
            tick(&mut state, &input, SIM_DT);
            if state.phase != GamePhase::Playing {
                break;
            }
        }
        let arena = state.world.arena.unwrap();
        assert!(state.player.pos.x > 10.0);
        assert!(state.player.pos.x <= arena.max.x - state.player.radius + 1e-4);
    }

    #[test]
    fn test_colliding_hazards_removed_same_tick() {
        let mut state = state();
        run(&mut state, 1);
        let a = hazard(&mut state, Vec2::new(-0.15, 6.0));
        let b = hazard(&mut state, Vec2::new(0.15, 6.0));
        let ids = [a.id, b.id];
        state.hazards.hazards.extend([a, b]);

        run(&mut state, 1);
        assert!(state.hazards.hazards.iter().all(|h| !ids.contains(&h.id)));
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_hazard_contact_ends_run() {
        let mut state = state();
        run(&mut state, 1);
        let pos = state.player.pos + Vec2::new(0.3, 0.0);
        let h = hazard(&mut state, pos);
        state.hazards.hazards.push(h);

        run(&mut state, 1);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(!state.player.alive);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })));

        // Nothing moves after the run ends
        let ticks = state.time_ticks;
        run(&mut state, 5);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_invincibility_survives_contact() {
        let mut state = state();
        run(&mut state, 1);
        state
            .player
            .modifiers
            .apply_buff(BuffKind::Invincibility, 5.0);
        let pos = state.player.pos + Vec2::new(0.3, 0.0);
        let h = hazard(&mut state, pos);
        state.hazards.hazards.push(h);

        run(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.player.alive);
    }

    #[test]
    fn test_slow_motion_ends_on_real_time() {
        let mut state = state();
        run(&mut state, 1);
        let id = state.world.next_entity_id();
        state.buffs.buffs.push(Buff {
            id,
            kind: BuffKind::SlowMotion,
            pos: state.player.pos,
        });

        run(&mut state, 1);
        assert_eq!(state.clock.time_scale, 0.5);
        // Five real seconds of effect
        run(&mut state, 301);
        assert_eq!(state.clock.time_scale, 1.0);
        assert!(!state.player.modifiers.has_buff(BuffKind::SlowMotion));
    }

    #[test]
    fn test_escape_wins() {
        let mut state = state();
        run(&mut state, 1);
        state.score.add(50);
        run(&mut state, 1);
        let hole = state.escape_holes.hole.clone().unwrap();

        state.player.pos = hole.pos;
        run(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Victory);
        assert!(state.drain_events().contains(&GameEvent::EscapeReached { score: 50 }));
    }

    #[test]
    fn test_map_expansion_redetects_next_tick() {
        let mut state = state();
        run(&mut state, 1);
        state.score.add(5);
        run(&mut state, 1);
        state.player.pos = state.market.market.as_ref().unwrap().pos;
        run(&mut state, 1);
        state.purchase_upgrade(Upgrade::MapExpansion, 5).unwrap();
        state.drain_events();

        run(&mut state, 1);
        assert!(state.world.arena.is_some());
        assert!(state
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::ArenaDetected { .. })));
    }

    #[test]
    fn test_walking_into_market_opens_shop() {
        let mut state = state();
        run(&mut state, 1);
        state.score.add(5);
        run(&mut state, 1);
        let market = state.market.market.clone().unwrap();
        state.drain_events();

        state.player.pos = market.pos;
        run(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Shopping);
        assert!(!state.market.is_open());
        assert!(state.drain_events().contains(&GameEvent::MarketEntered { id: market.id }));

        // The world holds still while the shop is open
        let ticks = state.time_ticks;
        let hazards = state.hazards.positions();
        run(&mut state, 470);
        assert_eq!(state.phase, GamePhase::Shopping);
        assert_eq!(state.time_ticks, ticks);
        assert_eq!(state.hazards.positions(), hazards);

        run(&mut state, 20);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.shop.is_none());
        assert!(state.drain_events().contains(&GameEvent::MarketClosed { id: market.id }));
    }

    #[test]
    fn test_swat_from_input() {
        let mut state = state();
        run(&mut state, 1);
        state.player.modifiers.add_upgrade(Upgrade::Swat);
        let h = hazard(&mut state, Vec2::new(-10.0, 6.0));
        let id = h.id;
        state.hazards.hazards.push(h);
        state.drain_events();

        let input = TickInput {
            swat: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert!(state.hazards.hazards.iter().all(|h| h.id != id));
        assert!(state.drain_events().iter().any(|e| matches!(
            e,
            GameEvent::HazardDestroyed { cause: DestroyCause::Swat, .. }
        )));
        assert!(state.player.swat_ready_at > state.clock.scaled);
    }

    #[test]
    fn test_teleport_from_input() {
        let mut state = state();
        run(&mut state, 1);
        state.player.modifiers.add_upgrade(Upgrade::Teleport);
        let input = TickInput {
            teleport: Some(Vec2::new(-5.0, -5.0)),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.player.pos, Vec2::new(-5.0, -5.0));

        // Cooling down, so the second jump is ignored
        let input = TickInput {
            teleport: Some(Vec2::new(5.0, 5.0)),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.player.pos, Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn test_escape_hole_waits_for_balance() {
        let mut state = state();
        run(&mut state, 1);
        state.score.add(60);
        assert!(state.score.spend(20));
        run(&mut state, 1);
        assert!(state.escape_holes.hole.is_none());
        assert!(!state.escape_holes.gate().is_fired(50));

        state.score.add(10);
        run(&mut state, 1);
        let hole = state.escape_holes.hole.clone().unwrap();
        assert!(state.score.balance() >= hole.requirement);
    }
}
