/// The hero: a table-driven state machine with simple physics.
///
/// ## States
///
///   DEAD → SPAWNING → IDLE ⇄ RUNNING
///   IDLE/RUNNING → JUMPING → FALLING → IDLE | DYING
///   IDLE/RUNNING → CLIMB_ON → CLIMB_IDLE ⇄ CLIMB_UP/CLIMB_DOWN → CLIMB_OFF → IDLE
///   any live state → DYING → DEAD
///
/// `DEAD` is both the initial state and the end of a life; only
/// `respawn()` leaves it.
///
/// ## Hooks
///
/// Each state has an `enter`, `exit` and `tick` hook in a fixed table
/// indexed by the state. `change_state` runs exit(old), then enter(new).
///
/// ## Velocities
///
/// Position integrates `effect_velocity + control_velocity`. Control
/// velocity is owned by the state hooks; effect velocity is rebuilt from
/// conveyors on every interaction pass.

use std::sync::Arc;

use glam::Vec2;
use tracing::debug;

use super::animation::{Animation, AnimationDef};
use super::control::{ControlScheme, Input};
use super::geometry::{Aabb, Rect};
use super::prop::Prop;
use super::random::RandomSource;
use super::sound::{Sound, StateSound};
use super::sprite::{SpriteId, SpriteSubject, Surface};
use crate::error::DefinitionError;

/// Down engages a ladder only this close to its top.
const LADDER_TOP_EPSILON: f32 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ActorState {
    Dead,
    Spawning,
    Idle,
    Running,
    Jumping,
    Falling,
    ClimbOn,
    ClimbIdle,
    ClimbUp,
    ClimbDown,
    ClimbOff,
    Dying,
}

impl ActorState {
    pub const COUNT: usize = 12;

    pub const ALL: [ActorState; ActorState::COUNT] = [
        ActorState::Dead,
        ActorState::Spawning,
        ActorState::Idle,
        ActorState::Running,
        ActorState::Jumping,
        ActorState::Falling,
        ActorState::ClimbOn,
        ActorState::ClimbIdle,
        ActorState::ClimbUp,
        ActorState::ClimbDown,
        ActorState::ClimbOff,
        ActorState::Dying,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used in definition files.
    pub fn name(self) -> &'static str {
        match self {
            ActorState::Dead => "dead",
            ActorState::Spawning => "spawning",
            ActorState::Idle => "idle",
            ActorState::Running => "running",
            ActorState::Jumping => "jumping",
            ActorState::Falling => "falling",
            ActorState::ClimbOn => "climb_on",
            ActorState::ClimbIdle => "climb_idle",
            ActorState::ClimbUp => "climb_up",
            ActorState::ClimbDown => "climb_down",
            ActorState::ClimbOff => "climb_off",
            ActorState::Dying => "dying",
        }
    }

    pub fn is_grounded(self) -> bool {
        matches!(self, ActorState::Idle | ActorState::Running)
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, ActorState::Jumping | ActorState::Falling)
    }

    pub fn is_climbing(self) -> bool {
        matches!(self, ActorState::ClimbIdle | ActorState::ClimbUp | ActorState::ClimbDown)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ActorStateDef {
    pub animation: Arc<AnimationDef>,
    pub sound: Option<StateSound>,
}

/// Tuning values shared by every actor built from one definition.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ActorParams {
    pub interaction_box: Rect,
    pub run_speed: f32,
    pub climb_speed: f32,
    pub jump_impulse: f32,
    pub jump_duration: f32,
    /// Vertical acceleration; negative pulls down.
    pub gravity: f32,
    pub max_fall: f32,
    pub spawn_health: i32,
    pub spawn_duration: f32,
    pub dying_duration: f32,
    /// Length of CLIMB_ON and CLIMB_OFF.
    pub climb_duration: f32,
}

#[derive(Clone, Debug)]
pub struct ActorDef {
    states: Vec<ActorStateDef>,
    params: ActorParams,
}

impl ActorDef {
    /// `states` is indexed by `ActorState::index`.
    pub fn new(states: Vec<ActorStateDef>, params: ActorParams) -> Result<Self, DefinitionError> {
        if states.len() != ActorState::COUNT {
            return Err(DefinitionError::ActorStateCount { got: states.len(), expected: ActorState::COUNT });
        }
        let timed = [
            ("jump duration", params.jump_duration),
            ("spawn duration", params.spawn_duration),
            ("dying duration", params.dying_duration),
            ("climb duration", params.climb_duration),
            ("climb speed", params.climb_speed),
            ("max fall", params.max_fall),
        ];
        for (what, value) in timed {
            if value <= 0.0 || value.is_nan() {
                return Err(DefinitionError::NonPositive { what, value });
            }
        }
        if params.spawn_health <= 0 {
            return Err(DefinitionError::NonPositive { what: "spawn health", value: params.spawn_health as f32 });
        }
        let b = params.interaction_box;
        Rect::new(b.x, b.y, b.w, b.h)?;
        Ok(ActorDef { states, params })
    }

    pub fn state(&self, state: ActorState) -> &ActorStateDef { &self.states[state.index()] }
    pub fn params(&self) -> &ActorParams { &self.params }
}

// ══════════════════════════════════════════════════════════════
// State hook table
// ══════════════════════════════════════════════════════════════

struct StateHooks {
    enter: fn(&mut Actor),
    exit: fn(&mut Actor),
    tick: fn(&mut Actor) -> Option<ActorState>,
}

fn nothing(_: &mut Actor) {}

fn stay(_: &mut Actor) -> Option<ActorState> {
    None
}

fn stop(a: &mut Actor) {
    a.control_velocity = Vec2::ZERO;
}

fn enter_spawning(a: &mut Actor) {
    a.position = a.spawn;
    a.health = a.def.params.spawn_health;
    a.control_velocity = Vec2::ZERO;
    a.effect_velocity = Vec2::ZERO;
    a.ladder = None;
}

fn enter_running(a: &mut Actor) {
    a.control_velocity = Vec2::new(a.facing.sign() * a.def.params.run_speed, 0.0);
}

fn enter_jumping(a: &mut Actor) {
    a.control_velocity.y += a.def.params.jump_impulse;
}

fn enter_falling(a: &mut Actor) {
    a.fall_start_y = a.position.y;
}

fn exit_falling(a: &mut Actor) {
    a.fall_end_y = a.position.y;
    let distance = a.fall_start_y - a.fall_end_y;
    if distance > a.def.params.max_fall {
        debug!(distance, max = a.def.params.max_fall, "fatal fall");
        a.health = 0;
    }
    a.control_velocity.y = 0.0;
}

fn enter_climb_up(a: &mut Actor) {
    a.control_velocity = Vec2::new(0.0, a.def.params.climb_speed);
}

fn enter_climb_down(a: &mut Actor) {
    a.control_velocity = Vec2::new(0.0, -a.def.params.climb_speed);
}

fn enter_dying(a: &mut Actor) {
    a.control_velocity = Vec2::ZERO;
    a.effect_velocity = Vec2::ZERO;
}

fn after(a: &Actor, duration: f32, next: ActorState) -> Option<ActorState> {
    (a.state_clock >= duration).then_some(next)
}

fn tick_spawning(a: &mut Actor) -> Option<ActorState> {
    after(a, a.def.params.spawn_duration, ActorState::Idle)
}

fn tick_jumping(a: &mut Actor) -> Option<ActorState> {
    after(a, a.def.params.jump_duration, ActorState::Falling)
}

fn tick_climb_on(a: &mut Actor) -> Option<ActorState> {
    after(a, a.def.params.climb_duration, ActorState::ClimbIdle)
}

fn tick_climb_off(a: &mut Actor) -> Option<ActorState> {
    after(a, a.def.params.climb_duration, ActorState::Idle)
}

fn tick_climb_up(a: &mut Actor) -> Option<ActorState> {
    let (_, top) = a.ladder?;
    if a.position.y >= top {
        a.position.y = top;
        return Some(ActorState::ClimbOff);
    }
    None
}

fn tick_climb_down(a: &mut Actor) -> Option<ActorState> {
    let (bottom, _) = a.ladder?;
    if a.position.y <= bottom {
        a.position.y = bottom;
        return Some(ActorState::Falling);
    }
    None
}

fn tick_dying(a: &mut Actor) -> Option<ActorState> {
    after(a, a.def.params.dying_duration, ActorState::Dead)
}

/// Indexed by `ActorState::index`.
const HOOKS: [StateHooks; ActorState::COUNT] = [
    // Dead
    StateHooks { enter: stop, exit: nothing, tick: stay },
    // Spawning
    StateHooks { enter: enter_spawning, exit: nothing, tick: tick_spawning },
    // Idle
    StateHooks { enter: stop, exit: nothing, tick: stay },
    // Running
    StateHooks { enter: enter_running, exit: nothing, tick: stay },
    // Jumping
    StateHooks { enter: enter_jumping, exit: nothing, tick: tick_jumping },
    // Falling
    StateHooks { enter: enter_falling, exit: exit_falling, tick: stay },
    // ClimbOn
    StateHooks { enter: stop, exit: nothing, tick: tick_climb_on },
    // ClimbIdle
    StateHooks { enter: stop, exit: nothing, tick: stay },
    // ClimbUp
    StateHooks { enter: enter_climb_up, exit: stop, tick: tick_climb_up },
    // ClimbDown
    StateHooks { enter: enter_climb_down, exit: stop, tick: tick_climb_down },
    // ClimbOff
    StateHooks { enter: stop, exit: nothing, tick: tick_climb_off },
    // Dying
    StateHooks { enter: enter_dying, exit: nothing, tick: tick_dying },
];

#[inline]
fn hooks(state: ActorState) -> &'static StateHooks {
    &HOOKS[state.index()]
}

// ══════════════════════════════════════════════════════════════
// Actor
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Actor {
    def: Arc<ActorDef>,
    controls: ControlScheme,
    state: ActorState,
    spawn: Vec2,
    position: Vec2,
    facing: Facing,
    control_velocity: Vec2,
    effect_velocity: Vec2,
    health: i32,
    /// Time spent in the current state (jump, spawn, climb and dying timers).
    state_clock: f32,
    fall_start_y: f32,
    fall_end_y: f32,
    /// `(bottom, top)` of the ladders in reach; `None` when not near one.
    ladder: Option<(f32, f32)>,
    animation: Animation,
}

impl Actor {
    /// A dead actor at its spawn point; call `respawn` to bring it in.
    pub fn new(def: Arc<ActorDef>, spawn: Vec2, controls: ControlScheme) -> Self {
        let animation = Animation::new(Arc::clone(&def.state(ActorState::Dead).animation));
        Actor {
            def,
            controls,
            state: ActorState::Dead,
            spawn,
            position: spawn,
            facing: Facing::Left,
            control_velocity: Vec2::ZERO,
            effect_velocity: Vec2::ZERO,
            health: 0,
            state_clock: 0.0,
            fall_start_y: spawn.y,
            fall_end_y: spawn.y,
            ladder: None,
            animation,
        }
    }

    pub fn change_state(&mut self, next: ActorState, sound: &mut dyn Sound) {
        let def = Arc::clone(&self.def);
        let prev = self.state;

        (hooks(prev).exit)(self);
        self.stop_sounds(sound);

        self.state = next;
        self.state_clock = 0.0;
        (hooks(next).enter)(self);

        // Source art faces left.
        self.animation = Animation::new(Arc::clone(&def.state(next).animation))
            .mirrored(self.facing == Facing::Right);
        if let Some(s) = &def.state(next).sound {
            sound.play(&s.id, s.looped);
        }
        debug!(from = prev.name(), to = next.name(), x = self.position.x, y = self.position.y, "actor state change");
    }

    /// Stop the current state's looping sound, if it has one.
    pub fn stop_sounds(&self, sound: &mut dyn Sound) {
        if let Some(s) = &self.def.state(self.state).sound {
            if s.looped {
                sound.stop(&s.id);
            }
        }
    }

    pub fn respawn(&mut self, sound: &mut dyn Sound) {
        self.change_state(ActorState::Spawning, sound);
    }

    /// Read controls for this frame. Airborne and timed states ignore input,
    /// and so does an actor with no health left (it dies on the next update).
    pub fn on_input(&mut self, input: &dyn Input, sound: &mut dyn Sound) {
        if self.health <= 0 {
            return;
        }
        let c = &self.controls;
        let left = input.is_key_down(c.move_left);
        let right = input.is_key_down(c.move_right);
        let up = input.is_key_down(c.climb_up);
        let down = input.is_key_down(c.climb_down);
        let jump = input.is_key_pressed(c.jump);

        match self.state {
            ActorState::Idle | ActorState::Running => {
                if self.can_climb_up(up) || self.can_climb_down(down) {
                    self.change_state(ActorState::ClimbOn, sound);
                } else if jump {
                    self.change_state(ActorState::Jumping, sound);
                } else if let Some(facing) = pick_facing(left, right, self.facing) {
                    if self.state != ActorState::Running || facing != self.facing {
                        self.facing = facing;
                        self.change_state(ActorState::Running, sound);
                    }
                } else if self.state == ActorState::Running {
                    self.change_state(ActorState::Idle, sound);
                }
            }
            ActorState::ClimbIdle => {
                if self.can_climb_up(up) {
                    self.change_state(ActorState::ClimbUp, sound);
                } else if down && self.ladder.is_some_and(|(bottom, _)| self.position.y > bottom) {
                    self.change_state(ActorState::ClimbDown, sound);
                } else if (left || right) && self.at_ladder_end() {
                    self.change_state(ActorState::ClimbOff, sound);
                }
            }
            ActorState::ClimbUp if !up => self.change_state(ActorState::ClimbIdle, sound),
            ActorState::ClimbDown if !down => self.change_state(ActorState::ClimbIdle, sound),
            _ => {}
        }
    }

    fn can_climb_up(&self, up: bool) -> bool {
        up && self.ladder.is_some_and(|(_, top)| self.position.y < top)
    }

    /// Down only engages from the very top of a ladder.
    fn can_climb_down(&self, down: bool) -> bool {
        down && self.ladder.is_some_and(|(_, top)| self.position.y >= top - LADDER_TOP_EPSILON)
    }

    fn at_ladder_end(&self) -> bool {
        self.ladder.is_some_and(|(bottom, top)| {
            self.position.y <= bottom + LADDER_TOP_EPSILON || self.position.y >= top - LADDER_TOP_EPSILON
        })
    }

    pub fn update(&mut self, dt: f32, rng: &mut dyn RandomSource, sound: &mut dyn Sound) {
        if self.state == ActorState::Dead {
            return;
        }
        if self.health <= 0 && self.state != ActorState::Dying {
            self.change_state(ActorState::Dying, sound);
        }

        if self.state.is_airborne() {
            self.control_velocity.y += self.def.params.gravity * dt;
        }
        self.position += (self.effect_velocity + self.control_velocity) * dt;
        self.animation.update(dt, rng);

        self.state_clock += dt;
        if let Some(next) = (hooks(self.state).tick)(self) {
            self.change_state(next, sound);
        }
    }

    /// Derive support, conveyance, ladder reach and damage from the props
    /// overlapping the actor this tick.
    pub fn on_prop_interactions(&mut self, props: &[&Prop], sound: &mut dyn Sound) {
        if matches!(self.state, ActorState::Dead | ActorState::Dying | ActorState::Spawning) {
            return;
        }

        self.effect_velocity = Vec2::ZERO;
        self.ladder = None;
        let mut support: Option<f32> = None;

        for prop in props {
            if let Some(y) = prop.support_y() {
                support = Some(support.map_or(y, |s| s.max(y)));
            }
            if let Some(v) = prop.conveyor_velocity() {
                self.effect_velocity += v;
            }
            if let Some((lo, hi)) = prop.ladder_range() {
                self.ladder = Some(match self.ladder {
                    Some((a, b)) => (a.min(lo), b.max(hi)),
                    None => (lo, hi),
                });
            }
        }

        match support {
            Some(y) if self.state.is_airborne() && self.control_velocity.y <= 0.0 => {
                self.position.y = y;
                self.change_state(ActorState::Idle, sound);
            }
            Some(y) if self.state.is_grounded() => self.position.y = y,
            None if self.state.is_grounded() => self.change_state(ActorState::Falling, sound),
            _ => {}
        }

        if self.state.is_climbing() && self.ladder.is_none() {
            self.change_state(ActorState::Falling, sound);
        }

        for prop in props {
            if let Some(damage) = prop.killer_damage() {
                self.apply_damage(damage);
            }
        }
    }

    /// Negative damage heals, up to spawn health.
    pub fn apply_damage(&mut self, damage: i32) {
        self.health = (self.health - damage).min(self.def.params.spawn_health);
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        if self.state != ActorState::Dead {
            self.animation.draw(self.position, surface);
        }
    }

    // ── Queries ──

    pub fn state(&self) -> ActorState { self.state }
    pub fn is_dead(&self) -> bool { self.state == ActorState::Dead }
    pub fn is_dying(&self) -> bool { self.state == ActorState::Dying }
    pub fn position(&self) -> Vec2 { self.position }
    pub fn spawn_position(&self) -> Vec2 { self.spawn }
    pub fn facing(&self) -> Facing { self.facing }
    pub fn health(&self) -> i32 { self.health }
    pub fn control_velocity(&self) -> Vec2 { self.control_velocity }
    pub fn effect_velocity(&self) -> Vec2 { self.effect_velocity }
    pub fn ladder_range(&self) -> Option<(f32, f32)> { self.ladder }
    pub fn is_near_ladder(&self) -> bool { self.ladder.is_some() }
    pub fn fall_start_y(&self) -> f32 { self.fall_start_y }
    pub fn fall_end_y(&self) -> f32 { self.fall_end_y }

    pub fn interaction_box(&self) -> Aabb {
        self.def.params.interaction_box.at(self.position)
    }

    pub fn spritesheet_key(&self) -> &str { self.animation.spritesheet_key() }
    pub fn sprite_id(&self) -> SpriteId { self.animation.sprite_id() }
    pub fn subject(&self) -> SpriteSubject<'_> { self.animation.subject(self.position) }
    pub fn animation(&self) -> &Animation { &self.animation }

    /// Takes effect on the next respawn.
    pub fn set_spawn_position(&mut self, spawn: Vec2) {
        self.spawn = spawn;
    }
}

/// Held direction keys to a facing. Both held keeps the current facing.
fn pick_facing(left: bool, right: bool, current: Facing) -> Option<Facing> {
    match (left, right) {
        (true, false) => Some(Facing::Left),
        (false, true) => Some(Facing::Right),
        (true, true) => Some(current),
        (false, false) => None,
    }
}
