//! Session state and the events it reports
//!
//! Everything a run needs lives here: the level geometry, the seeded RNG,
//! score, player, scheduler and the five spawn orchestrators. The market
//! purchase flow and the player's active abilities act on it directly.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::collision::{LayerMask, Obstacle, ObstacleMap};
use super::difficulty::DifficultyScheduler;
use super::player::{BuffKind, Player, Upgrade};
use super::spawners::{
    BuffSpawner, CollectibleSpawner, EscapeHoleSpawner, HazardSpawner, MarketSpawner, SpawnContext,
};
use super::timers::GameClock;
use crate::error::{ConfigError, PurchaseError};
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// World frozen while the player browses an entered market
    Shopping,
    /// Caught by a hazard
    GameOver,
    /// Left through an escape hole
    Victory,
}

/// Which gate a crossing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Market,
    EscapeHole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    Wall,
    HazardCollision,
    Swat,
}

/// Notifications for the presentation layer, drained once per frame
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ArenaDetected { width: f32, height: f32 },
    CollectibleSpawned { id: u32, pos: Vec2 },
    CollectibleCollected { id: u32, points: u32 },
    ScoreChanged { score: u32, balance: u32 },
    ThresholdCrossed { gate: Gate, threshold: u32 },
    DifficultyChanged { level: u32 },
    HazardWarning { pos: Vec2 },
    HazardSpawned { id: u32, pos: Vec2, threat: u8 },
    HazardBounced { id: u32, pos: Vec2 },
    HazardDestroyed { id: u32, pos: Vec2, cause: DestroyCause },
    PlayerDamaged { pos: Vec2 },
    PlayerTeleported { from: Vec2, to: Vec2 },
    BuffIncoming { kind: BuffKind, pos: Vec2 },
    BuffSpawned { id: u32, kind: BuffKind, pos: Vec2 },
    BuffCollected { id: u32, kind: BuffKind },
    BuffDespawned { id: u32 },
    BuffExpired { kind: BuffKind },
    MarketSpawned { id: u32, pos: Vec2 },
    MarketExpired { id: u32 },
    MarketEntered { id: u32 },
    MarketClosed { id: u32 },
    UpgradePurchased { upgrade: Upgrade, cost: u32 },
    EscapeHoleSpawned { id: u32, pos: Vec2, requirement: u32, permanent: bool },
    EscapeHoleDespawned { id: u32 },
    EscapeReached { score: u32 },
    GameOver { score: u32 },
}

/// Cumulative score plus the balance the market spends from.
/// Spending never lowers the cumulative score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    total: u32,
    balance: u32,
}

impl Score {
    pub fn add(&mut self, points: u32) {
        self.total = self.total.saturating_add(points);
        self.balance = self.balance.saturating_add(points);
    }

    /// Returns false (and changes nothing) if the balance is short
    pub fn spend(&mut self, amount: u32) -> bool {
        if amount > self.balance {
            return false;
        }
        self.balance -= amount;
        true
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Open shop, entered by walking into a market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShopSession {
    pub market_id: u32,
    /// Real seconds until the shop closes on its own
    pub remaining: f32,
}

/// Level geometry and the shared services every orchestrator draws on
#[derive(Debug, Clone)]
pub struct World {
    pub tuning: Tuning,
    pub obstacles: ObstacleMap,
    /// Layout as loaded, restored on every new game
    base_obstacles: ObstacleMap,
    /// Probe origin for arena detection
    pub center: Vec2,
    /// `None` until detected, and again after the map changes
    pub arena: Option<Arena>,
    pub rng: Pcg32,
    pub events: Vec<GameEvent>,
    next_entity_id: u32,
}

impl World {
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Detect the arena if it is missing. Returns true if it was (re)built.
    pub fn ensure_arena(&mut self) -> bool {
        if self.arena.is_some() {
            return false;
        }
        let t = &self.tuning.arena;
        let arena = Arena::detect(
            self.center,
            t.max_probe_distance,
            &self.obstacles,
            LayerMask::WALLS,
            t.wall_padding,
        );
        self.events.push(GameEvent::ArenaDetected {
            width: arena.width(),
            height: arena.height(),
        });
        self.arena = Some(arena);
        true
    }

    pub fn ctx(&mut self, player: Option<Vec2>) -> SpawnContext<'_> {
        SpawnContext {
            arena: self.arena.as_ref(),
            obstacles: &self.obstacles,
            tuning: &self.tuning,
            player,
            rng: &mut self.rng,
            events: &mut self.events,
            next_entity_id: &mut self.next_entity_id,
        }
    }
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub phase: GamePhase,
    /// Simulated ticks since the run started
    pub time_ticks: u64,
    pub clock: GameClock,
    pub score: Score,
    pub player: Player,
    pub world: World,
    pub difficulty: DifficultyScheduler,
    pub collectibles: CollectibleSpawner,
    pub hazards: HazardSpawner,
    pub buffs: BuffSpawner,
    pub market: MarketSpawner,
    pub escape_holes: EscapeHoleSpawner,
    pub shop: Option<ShopSession>,
}

impl GameState {
    /// Validate the tuning and build a session ready to play
    pub fn new(
        seed: u64,
        tuning: Tuning,
        obstacles: ObstacleMap,
        center: Vec2,
    ) -> Result<Self, ConfigError> {
        tuning.validate()?;
        let mut state = Self {
            seed,
            phase: GamePhase::Playing,
            time_ticks: 0,
            clock: GameClock::default(),
            score: Score::default(),
            player: Player::new(center),
            difficulty: DifficultyScheduler::new(&tuning.difficulty)?,
            collectibles: CollectibleSpawner::new(tuning.collectible.spawn_radius),
            hazards: HazardSpawner::new(tuning.hazard.spawn_radius),
            buffs: BuffSpawner::new(&tuning.buff),
            market: MarketSpawner::new(&tuning.market)?,
            escape_holes: EscapeHoleSpawner::new(&tuning.escape_hole)?,
            shop: None,
            world: World {
                tuning,
                base_obstacles: obstacles.clone(),
                obstacles,
                center,
                arena: None,
                rng: Pcg32::seed_from_u64(seed),
                events: Vec::new(),
                next_entity_id: 1,
            },
        };
        state.new_game();
        Ok(state)
    }

    /// Walled room with a couple of props, the layout the runner plays on
    pub fn with_default_level(seed: u64, tuning: Tuning) -> Result<Self, ConfigError> {
        let mut obstacles = ObstacleMap::walled_box(Vec2::ZERO, Vec2::new(16.0, 10.0), 1.0);
        obstacles.push(Obstacle::prop(Vec2::new(-8.0, 5.0), Vec2::splat(0.75)));
        obstacles.push(Obstacle::prop(Vec2::new(8.0, -5.0), Vec2::splat(0.75)));
        Self::new(seed, tuning, obstacles, Vec2::ZERO)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.world.tuning
    }

    /// Reset every gate, registry, timer and modifier, then start the spawners
    pub fn new_game(&mut self) {
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.clock.reset();
        self.score.reset();
        self.player = Player::new(self.world.center);
        self.shop = None;
        self.world.rng = Pcg32::seed_from_u64(self.seed);
        self.world.events.clear();
        self.world.next_entity_id = 1;
        self.world.obstacles = self.world.base_obstacles.clone();
        self.world.arena = None;

        self.difficulty.reset();
        self.collectibles.reset();
        self.hazards.reset();
        self.buffs.reset();
        self.market.reset();
        self.escape_holes.reset();

        self.world.ensure_arena();

        self.collectibles.start();
        self.hazards.start(&self.difficulty);
        self.buffs.start(&self.world.tuning.buff, &mut self.world.rng);
        self.market.start();
        self.escape_holes.start();
        log::info!("New game started (seed {})", self.seed);
    }

    /// Halt every orchestrator; nothing scheduled fires afterwards
    pub fn stop_spawners(&mut self) {
        self.collectibles.stop();
        self.hazards.stop();
        self.buffs.stop();
        self.market.stop();
        self.escape_holes.stop();
    }

    /// Force arena re-detection on the next tick
    pub fn invalidate_arena(&mut self) {
        self.world.arena = None;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.world.events)
    }

    /// Open a shop session if the player is touching a market. The market is
    /// consumed and the world freezes until the session closes.
    pub fn enter_market(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        if self.market.reached(self.player.pos, self.player.radius).is_none() {
            return false;
        }
        let Some(market) = self.market.consume() else {
            return false;
        };
        self.shop = Some(ShopSession {
            market_id: market.id,
            remaining: self.world.tuning.market.session_duration,
        });
        self.phase = GamePhase::Shopping;
        log::info!("Market {} entered", market.id);
        self.world.events.push(GameEvent::MarketEntered { id: market.id });
        true
    }

    /// Leave the shop and resume play. Returns false if no session is open.
    pub fn close_shop(&mut self) -> bool {
        let Some(shop) = self.shop.take() else {
            return false;
        };
        if self.phase == GamePhase::Shopping {
            self.phase = GamePhase::Playing;
        }
        self.world.events.push(GameEvent::MarketClosed { id: shop.market_id });
        true
    }

    /// Buy a permanent upgrade in the open shop. A successful purchase closes
    /// the session; a rejected one leaves it open.
    pub fn purchase_upgrade(&mut self, upgrade: Upgrade, cost: u32) -> Result<(), PurchaseError> {
        match self.phase {
            GamePhase::Shopping => {}
            GamePhase::Playing => return Err(PurchaseError::NoMarket),
            _ => return Err(PurchaseError::NotPlaying),
        }
        if self.player.modifiers.has_upgrade(upgrade) {
            return Err(PurchaseError::AlreadyOwned(upgrade));
        }
        if !self.score.spend(cost) {
            return Err(PurchaseError::InsufficientBalance {
                cost,
                balance: self.score.balance(),
            });
        }

        self.player.modifiers.add_upgrade(upgrade);
        log::info!("Purchased {:?} for {}", upgrade, cost);
        self.world.events.push(GameEvent::UpgradePurchased { upgrade, cost });
        self.world.events.push(GameEvent::ScoreChanged {
            score: self.score.total(),
            balance: self.score.balance(),
        });

        match upgrade {
            Upgrade::BuffMagnet => {
                let rate = self.world.tuning.buff.magnet_spawn_rate;
                self.buffs.reduce_spawn_rate(rate);
            }
            Upgrade::MapExpansion => self.expand_map(),
            _ => {}
        }

        if let Some(level) = self.difficulty.on_modifiers_changed(&self.player.modifiers) {
            self.world.events.push(GameEvent::DifficultyChanged { level });
        }

        let balance = self.score.balance();
        let player = Some(self.player.pos);
        self.escape_holes.check_balance(&mut self.world.ctx(player), balance);
        self.close_shop();
        Ok(())
    }

    /// Destroy every live hazard. Returns how many went, or `None` while the
    /// upgrade is missing or cooling down.
    pub fn use_swat(&mut self) -> Option<usize> {
        let now = self.clock.scaled;
        if self.phase != GamePhase::Playing || !self.player.ability_ready(Upgrade::Swat, now) {
            return None;
        }
        self.player.swat_ready_at = now + self.world.tuning.player.swat_cooldown;
        let player = Some(self.player.pos);
        let destroyed = self
            .hazards
            .destroy_all(&mut self.world.ctx(player), DestroyCause::Swat);
        log::info!("Swat cleared {} hazards", destroyed);
        Some(destroyed)
    }

    /// Jump to `target` if it lies inside the arena and clear of walls. A
    /// rejected target does not start the cooldown.
    pub fn use_teleport(&mut self, target: Vec2) -> bool {
        let now = self.clock.scaled;
        if self.phase != GamePhase::Playing || !self.player.ability_ready(Upgrade::Teleport, now) {
            return false;
        }
        let t = &self.world.tuning.player;
        let inside = self.world.arena.as_ref().is_some_and(|a| a.contains(target));
        let blocked =
            self.world
                .obstacles
                .overlaps_circle(target, t.teleport_clearance, LayerMask::WALLS);
        if !inside || blocked {
            log::debug!("Teleport to ({:.2}, {:.2}) rejected", target.x, target.y);
            return false;
        }

        let from = self.player.pos;
        self.player.pos = target;
        self.player.teleport_ready_at = now + t.teleport_cooldown;
        self.world
            .events
            .push(GameEvent::PlayerTeleported { from, to: target });
        true
    }

    /// Grow the walls and every spawn radius, then re-detect the arena
    fn expand_map(&mut self) {
        let factor = self.world.tuning.map_expansion_factor;
        let center = self.world.center;
        self.world.obstacles.scale_walls(center, factor);
        self.collectibles.scale_radius(factor);
        self.hazards.scale_radius(factor);
        self.buffs.scale_radius(factor);
        self.market.scale_radius(factor);
        self.escape_holes.scale_radius(factor);
        log::info!("Map expanded by {:.2}", factor);
        self.invalidate_arena();
    }

    /// Sort registries by id so iteration order stays stable
    pub fn normalize_order(&mut self) {
        self.collectibles.items.sort_by_key(|c| c.id);
        self.hazards.hazards.sort_by_key(|h| h.id);
        self.buffs.buffs.sort_by_key(|b| b.id);
    }
}
