use std::time::{Duration, Instant};

use crate::rule::{Category, Rule};
use crate::signals::{Signals, IS_BAR_VISIBLE};
use crate::types::{Capture, CaptureRect, Rgb};

/// Reads live pixels at window-relative coordinates.
pub trait PixelSource {
    fn sample(&mut self, x: i32, y: i32) -> Option<Rgb>;
}

/// A capture of `rect`, addressed in window coordinates.
pub struct Framed {
    pub origin: CaptureRect,
    pub capture: Capture,
}

impl PixelSource for Framed {
    fn sample(&mut self, x: i32, y: i32) -> Option<Rgb> {
        self.capture.pixel(x - self.origin.l, y - self.origin.t)
    }
}

/// Window-sized capture at the origin.
impl PixelSource for Capture {
    fn sample(&mut self, x: i32, y: i32) -> Option<Rgb> {
        self.pixel(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Minimum time between two fires of the same rule.
    pub min_fire_delay: Duration,
    /// Skip evaluation while the health/mana bar is not on screen.
    pub bar_visibility_gate: bool,
    /// Skip firing while the rule's category is on cooldown.
    pub cooldown_gate: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            min_fire_delay: Duration::from_millis(250),
            bar_visibility_gate: true,
            cooldown_gate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    BarHidden,
    OnCooldown(Category),
    /// HP or mana never observed.
    UnknownSignal,
    HpCondition,
    ManaCondition,
    Throttled,
    ProbeMismatch,
    /// A probe pixel could not be read.
    ProbeUnreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fire,
    Skip(Skip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    Armed,
    Cooling { remaining: Duration },
}

/// Per-rule runtime state. Owned by that rule's loop alone.
pub struct RuleEvaluator {
    rule: Rule,
    config: EvaluatorConfig,
    last_exec: Option<Instant>,
    last_decision: Option<Decision>,
}

impl RuleEvaluator {
    pub fn new(rule: Rule, config: EvaluatorConfig) -> Self {
        Self { rule, config, last_exec: None, last_decision: None }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn last_exec(&self) -> Option<Instant> {
        self.last_exec
    }

    /// Decision of the previous tick, if any.
    pub fn last_decision(&self) -> Option<Decision> {
        self.last_decision
    }

    pub fn state(&self, now: Instant) -> RuleState {
        match self.last_exec {
            Some(t) if now.duration_since(t) < self.config.min_fire_delay => RuleState::Cooling {
                remaining: self.config.min_fire_delay - now.duration_since(t),
            },
            _ => RuleState::Armed,
        }
    }

    /// One evaluation. Every condition is ANDed; the first one that fails
    /// names the skip. Probes are sampled last so a rule that cannot fire
    /// anyway never touches the pixel source. On `Fire` the fire time is
    /// recorded.
    pub fn tick(&mut self, signals: &Signals, pixels: &mut dyn PixelSource, now: Instant) -> Decision {
        let decision = self.decide(signals, pixels, now);
        if decision == Decision::Fire {
            self.last_exec = Some(now);
        }
        self.last_decision = Some(decision);
        decision
    }

    fn decide(&self, signals: &Signals, pixels: &mut dyn PixelSource, now: Instant) -> Decision {
        if self.config.bar_visibility_gate && signals.flag(IS_BAR_VISIBLE) != Some(true) {
            return Decision::Skip(Skip::BarHidden);
        }

        if self.config.cooldown_gate {
            let cooling = self.rule.category.cooldown_signal().and_then(|name| signals.flag(name));
            if cooling == Some(true) {
                return Decision::Skip(Skip::OnCooldown(self.rule.category));
            }
        }

        let (Some(hp), Some(mana)) = (signals.hp(), signals.mana()) else {
            return Decision::Skip(Skip::UnknownSignal);
        };
        if !self.rule.hp_trigger_condition.compare(hp, self.rule.hp_trigger_percentage) {
            return Decision::Skip(Skip::HpCondition);
        }
        if !self.rule.mana_trigger_condition.compare(mana, self.rule.mana_trigger_percentage) {
            return Decision::Skip(Skip::ManaCondition);
        }

        if let RuleState::Cooling { .. } = self.state(now) {
            return Decision::Skip(Skip::Throttled);
        }

        for probe in &self.rule.conditions {
            match pixels.sample(probe.x, probe.y) {
                None => return Decision::Skip(Skip::ProbeUnreadable),
                Some(color) if !probe.holds(color) => return Decision::Skip(Skip::ProbeMismatch),
                Some(_) => {}
            }
        }

        Decision::Fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Operator, Probe};
    use crate::signals::{Signal, HP_PERCENTAGE, IS_HEALING_COOLDOWN, MANA_PERCENTAGE};

    const GREEN: Rgb = Rgb::new(0, 255, 0);

    fn heal_rule(probes: Vec<Probe>) -> Rule {
        Rule {
            id: "heal".into(),
            enabled: true,
            key: "F1".into(),
            interval: 50,
            category: Category::Healing,
            hp_trigger_condition: Operator::Lt,
            hp_trigger_percentage: 30,
            mana_trigger_condition: Operator::Ge,
            mana_trigger_percentage: 0,
            conditions: probes,
        }
    }

    fn signals(hp: u8) -> Signals {
        Signals::default()
            .with(HP_PERCENTAGE, Signal::Percent(hp))
            .with(MANA_PERCENTAGE, Signal::Percent(50))
            .with(IS_BAR_VISIBLE, Signal::Flag(true))
            .with(IS_HEALING_COOLDOWN, Signal::Flag(false))
    }

    fn screen() -> Capture {
        let mut cap = Capture::filled(20, 20, Rgb::new(0, 0, 0));
        cap.set_pixel(5, 5, GREEN);
        cap
    }

    fn config() -> EvaluatorConfig {
        EvaluatorConfig { min_fire_delay: Duration::from_millis(200), ..Default::default() }
    }

    #[test]
    fn test_fires_only_below_threshold() {
        let mut eval = RuleEvaluator::new(heal_rule(vec![]), config());
        let mut px = screen();
        let now = Instant::now();

        assert_eq!(eval.tick(&signals(30), &mut px, now), Decision::Skip(Skip::HpCondition));
        assert_eq!(eval.tick(&signals(29), &mut px, now), Decision::Fire);
        assert_eq!(eval.last_exec(), Some(now));
    }

    #[test]
    fn test_unknown_hp_never_fires() {
        let mut eval = RuleEvaluator::new(heal_rule(vec![]), config());
        let unknown = Signals::default()
            .with(MANA_PERCENTAGE, Signal::Percent(50))
            .with(IS_BAR_VISIBLE, Signal::Flag(true));
        assert_eq!(
            eval.tick(&unknown, &mut screen(), Instant::now()),
            Decision::Skip(Skip::UnknownSignal)
        );
        assert_eq!(eval.last_exec(), None);
    }

    #[test]
    fn test_throttled_until_min_delay_elapses() {
        let mut eval = RuleEvaluator::new(heal_rule(vec![]), config());
        let mut px = screen();
        let t0 = Instant::now();

        assert_eq!(eval.tick(&signals(10), &mut px, t0), Decision::Fire);
        let t1 = t0 + Duration::from_millis(150);
        assert_eq!(eval.tick(&signals(10), &mut px, t1), Decision::Skip(Skip::Throttled));
        assert_eq!(eval.state(t1), RuleState::Cooling { remaining: Duration::from_millis(50) });

        let t2 = t0 + Duration::from_millis(200);
        assert_eq!(eval.state(t2), RuleState::Armed);
        assert_eq!(eval.tick(&signals(10), &mut px, t2), Decision::Fire);
    }

    #[test]
    fn test_probes_are_anded() {
        let shows_green = Probe { x: 5, y: 5, color: GREEN, enabled: true };
        let not_green = Probe { x: 6, y: 5, color: GREEN, enabled: false };
        let mut eval = RuleEvaluator::new(heal_rule(vec![shows_green, not_green]), config());
        assert_eq!(eval.tick(&signals(10), &mut screen(), Instant::now()), Decision::Fire);

        let wrong = Probe { x: 6, y: 5, color: GREEN, enabled: true };
        let mut eval = RuleEvaluator::new(heal_rule(vec![shows_green, wrong]), config());
        assert_eq!(
            eval.tick(&signals(10), &mut screen(), Instant::now()),
            Decision::Skip(Skip::ProbeMismatch)
        );

        let outside = Probe { x: 50, y: 5, color: GREEN, enabled: false };
        let mut eval = RuleEvaluator::new(heal_rule(vec![outside]), config());
        assert_eq!(
            eval.tick(&signals(10), &mut screen(), Instant::now()),
            Decision::Skip(Skip::ProbeUnreadable)
        );
    }

    #[test]
    fn test_cooldown_gate() {
        let mut eval = RuleEvaluator::new(heal_rule(vec![]), config());
        let mut px = screen();
        let now = Instant::now();

        let cooling = signals(5).with(IS_HEALING_COOLDOWN, Signal::Flag(true));
        assert_eq!(eval.tick(&cooling, &mut px, now), Decision::Skip(Skip::OnCooldown(Category::Healing)));
        assert_eq!(eval.tick(&signals(5), &mut px, now), Decision::Fire);
    }

    #[test]
    fn test_cooldown_gate_can_be_disabled() {
        let cfg = EvaluatorConfig { cooldown_gate: false, ..config() };
        let mut eval = RuleEvaluator::new(heal_rule(vec![]), cfg);
        let cooling = signals(5).with(IS_HEALING_COOLDOWN, Signal::Flag(true));
        assert_eq!(eval.tick(&cooling, &mut screen(), Instant::now()), Decision::Fire);
    }

    #[test]
    fn test_bar_visibility_gate_is_independent() {
        let hidden = signals(5).with(IS_BAR_VISIBLE, Signal::Flag(false));

        let mut gated = RuleEvaluator::new(heal_rule(vec![]), config());
        assert_eq!(gated.tick(&hidden, &mut screen(), Instant::now()), Decision::Skip(Skip::BarHidden));

        let cfg = EvaluatorConfig { bar_visibility_gate: false, ..config() };
        let mut ungated = RuleEvaluator::new(heal_rule(vec![]), cfg);
        assert_eq!(ungated.tick(&hidden, &mut screen(), Instant::now()), Decision::Fire);
    }

    #[test]
    fn test_framed_source_translates_coordinates() {
        let mut framed = Framed {
            origin: CaptureRect { l: 100, t: 50, w: 20, h: 20 },
            capture: screen(),
        };
        assert_eq!(framed.sample(105, 55), Some(GREEN));
        assert_eq!(framed.sample(5, 5), None);
    }
}
