//! World rules: the falling-target catch game
//!
//! Deliberately minimal. The cursor tracks the mapped hand position; targets
//! spawn on a fixed schedule and fall at a fixed speed. Catching one scores,
//! missing one costs health, and zero health ends the game. Everything is a
//! pure function of tick time and the cursor track, so replaying the same
//! inputs replays the same game.

use std::time::Duration;

use palm_core::{Timestamp, Vec2};

/// Tunables for the world rules.
#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// Time between target spawns.
    pub spawn_interval: Duration,
    /// Fall speed in game-space units per second.
    pub fall_speed: f32,
    /// Cursor-to-target distance that counts as a catch.
    pub catch_radius: f32,
    /// Health at the start of a round.
    pub starting_health: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            spawn_interval: Duration::from_millis(1200),
            fall_speed: 0.35,
            catch_radius: 0.06,
            starting_health: 3,
        }
    }
}

/// A falling target in game space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub position: Vec2,
}

/// What changed during one world step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub caught: u32,
    pub missed: u32,
    /// Set on the step where health reached zero.
    pub just_ended: bool,
}

#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    cursor: Vec2,
    targets: Vec<Target>,
    score: u32,
    health: u32,
    next_spawn_at: Option<Timestamp>,
    spawn_counter: u64,
    game_over: bool,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        World {
            cursor: Vec2::new(0.5, 0.5),
            targets: Vec::new(),
            score: 0,
            health: config.starting_health,
            next_spawn_at: None,
            spawn_counter: 0,
            game_over: false,
            config,
        }
    }

    /// Horizontal spawn position for the n-th target.
    ///
    /// Golden-ratio low-discrepancy sequence: deterministic, evenly spread,
    /// and free of the clumping a naive modulo pattern produces.
    fn spawn_x(n: u64) -> f32 {
        const GOLDEN: f64 = 0.618_033_988_749_895;
        ((n as f64 * GOLDEN) % 1.0) as f32
    }

    /// Advance the world to `now`. Frozen after game over.
    pub fn step(&mut self, now: Timestamp, dt: Duration, cursor: Option<Vec2>) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if self.game_over {
            return outcome;
        }

        if let Some(cursor) = cursor {
            self.cursor = cursor;
        }

        // The schedule anchors to the first stepped tick, not construction,
        // so a paused start does not dump a backlog of targets.
        let next_spawn = self.next_spawn_at.get_or_insert(now + self.config.spawn_interval);
        while now >= *next_spawn {
            self.targets.push(Target {
                position: Vec2::new(Self::spawn_x(self.spawn_counter), 0.0),
            });
            self.spawn_counter += 1;
            *next_spawn = *next_spawn + self.config.spawn_interval;
        }

        let fall = self.config.fall_speed * dt.as_secs_f32();
        let cursor_pos = self.cursor;
        let catch_radius = self.config.catch_radius;
        let mut missed = 0u32;
        let mut caught = 0u32;
        self.targets.retain_mut(|target| {
            target.position.y += fall;
            if target.position.distance(cursor_pos) <= catch_radius {
                caught += 1;
                return false;
            }
            if target.position.y > 1.0 {
                missed += 1;
                return false;
            }
            true
        });

        self.score += caught;
        self.health = self.health.saturating_sub(missed);
        outcome.caught = caught;
        outcome.missed = missed;

        if self.health == 0 {
            self.game_over = true;
            outcome.just_ended = true;
        }
        outcome
    }

    #[inline]
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    #[inline]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    #[inline]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[inline]
    pub fn health(&self) -> u32 {
        self.health
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorldConfig {
        WorldConfig {
            spawn_interval: Duration::from_millis(100),
            fall_speed: 0.5,
            catch_radius: 0.05,
            starting_health: 2,
        }
    }

    fn t(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    const DT: Duration = Duration::from_millis(16);

    #[test]
    fn test_targets_spawn_on_schedule() {
        let mut world = World::new(config());

        world.step(t(0), DT, None);
        assert!(world.targets().is_empty());

        world.step(t(100), DT, None);
        assert_eq!(world.targets().len(), 1);

        // Two intervals elapsed in one step: two spawns.
        world.step(t(300), DT, None);
        assert_eq!(world.targets().len(), 3);
    }

    #[test]
    fn test_spawn_positions_are_deterministic() {
        let xs: Vec<f32> = (0..4).map(World::spawn_x).collect();
        let again: Vec<f32> = (0..4).map(World::spawn_x).collect();

        assert_eq!(xs, again);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_cursor_catches_a_target() {
        let mut world = World::new(config());
        world.step(t(100), DT, None);
        let target_x = world.targets()[0].position.x;

        // Park the cursor right under the spawn point; one step of fall
        // keeps the target within the catch radius.
        let outcome = world.step(t(116), DT, Some(Vec2::new(target_x, 0.01)));

        assert_eq!(outcome.caught, 1);
        assert_eq!(world.score(), 1);
        assert!(world.targets().is_empty());
    }

    #[test]
    fn test_missed_target_costs_health() {
        let mut world = World::new(config());
        world.step(t(100), DT, Some(Vec2::new(1.0, 1.0)));
        assert_eq!(world.health(), 2);

        // fall_speed 0.5 crosses y=1.0 after ~2s of falling
        let outcome = world.step(t(100), Duration::from_secs(3), Some(Vec2::new(1.0, 1.0)));

        assert_eq!(outcome.missed, 1);
        assert_eq!(world.health(), 1);
    }

    #[test]
    fn test_game_over_freezes_the_world() {
        let mut cfg = config();
        cfg.starting_health = 1;
        let mut world = World::new(cfg);

        world.step(t(100), DT, Some(Vec2::new(1.0, 1.0)));
        let outcome = world.step(t(100), Duration::from_secs(3), Some(Vec2::new(1.0, 1.0)));

        assert!(outcome.just_ended);
        assert!(world.is_game_over());

        // Further steps change nothing, and the terminal flag fires once.
        let after = world.step(t(5000), Duration::from_secs(1), Some(Vec2::ZERO));
        assert_eq!(after, StepOutcome::default());
        assert_eq!(world.health(), 0);
    }

    #[test]
    fn test_replaying_inputs_replays_the_game() {
        let run = |steps: &[(i64, Option<Vec2>)]| {
            let mut world = World::new(config());
            for &(millis, cursor) in steps {
                world.step(t(millis), DT, cursor);
            }
            (world.score(), world.health(), world.targets().len())
        };

        let steps = [
            (0, None),
            (100, Some(Vec2::new(0.0, 0.02))),
            (200, Some(Vec2::new(0.6, 0.02))),
            (300, Some(Vec2::new(0.2, 0.05))),
        ];
        assert_eq!(run(&steps), run(&steps));
    }
}
