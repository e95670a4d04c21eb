/// Per-tick interaction gathering between the actor and the props.
///
/// Broad phase: interaction boxes overlap.
/// Narrow phase (killer props only): the displayed sprites overlap
/// pixel-wise, so generous hazard boxes never kill on their own.

use tracing::trace;

use super::actor::Actor;
use super::prop::Prop;
use super::sprite::Collision;

/// Props the actor interacts with this tick, in prop order.
pub fn gather<'p>(actor: &Actor, props: &'p [Prop], collision: &dyn Collision) -> Vec<&'p Prop> {
    let actor_box = actor.interaction_box();
    let actor_subject = actor.subject();

    props
        .iter()
        .filter(|prop| collision.boxes_overlap(&actor_box, &prop.interaction_box()))
        .filter(|prop| {
            if !prop.is_killer() {
                return true;
            }
            let hit = collision.pixels_overlap(&actor_subject, &prop.subject());
            if !hit {
                trace!(prop = prop.name(), "killer box overlap without pixel contact");
            }
            hit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorState;
    use crate::domain::control::ControlScheme;
    use crate::domain::fixtures::{self, RecordingSound, StubCollision};
    use crate::domain::random::ScriptedRandom;
    use glam::Vec2;

    fn idle_actor() -> (Actor, RecordingSound) {
        let mut sound = RecordingSound::default();
        let mut actor = Actor::new(fixtures::actor_def(), Vec2::new(0.0, 10.0), ControlScheme::default());
        actor.respawn(&mut sound);
        actor.update(1.0, &mut ScriptedRandom::new(&[0]), &mut sound);
        (actor, sound)
    }

    #[test]
    fn only_overlapping_props_are_gathered() {
        let (actor, _) = idle_actor();
        let props = vec![
            fixtures::support(Vec2::new(-5.0, 9.0), 20.0),
            fixtures::support(Vec2::new(50.0, 9.0), 20.0),
            fixtures::ladder(Vec2::new(0.0, 0.0), 10.0),
        ];
        let hits = gather(&actor, &props, &StubCollision { pixels: true });
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.position().x <= 0.0));
    }

    #[test]
    fn killer_needs_pixel_contact() {
        let (actor, _) = idle_actor();
        let props = vec![fixtures::killer(Vec2::new(0.0, 10.0), 1)];
        assert!(gather(&actor, &props, &StubCollision { pixels: false }).is_empty());
        assert_eq!(gather(&actor, &props, &StubCollision { pixels: true }).len(), 1);
    }

    #[test]
    fn non_killers_skip_the_pixel_test() {
        let (actor, _) = idle_actor();
        let props = vec![fixtures::support(Vec2::new(-5.0, 9.0), 20.0)];
        assert_eq!(gather(&actor, &props, &StubCollision { pixels: false }).len(), 1);
    }

    #[test]
    fn killer_damage_applies_every_tick() {
        let (mut actor, mut sound) = idle_actor();
        let props = vec![
            fixtures::support(Vec2::new(-5.0, 9.0), 20.0),
            fixtures::killer(Vec2::new(0.0, 10.0), 1),
        ];
        let collision = StubCollision { pixels: true };
        let start = actor.health();

        for _ in 0..3 {
            let hits = gather(&actor, &props, &collision);
            actor.on_prop_interactions(&hits, &mut sound);
        }
        assert_eq!(actor.health(), start - 3);
        assert_eq!(actor.health(), 0);

        actor.update(0.01, &mut ScriptedRandom::new(&[0]), &mut sound);
        assert_eq!(actor.state(), ActorState::Dying);
    }
}
