use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ConfigError;
use crate::evaluator::{Decision, Framed, PixelSource, RuleEvaluator};
use crate::gate::{ActionGate, ActionRequest, Connector, Receipt};
use crate::index::SignatureIndex;
use crate::logger;
use crate::platform::{Platform, WindowHandle};
use crate::rule::Rule;
use crate::scanner;
use crate::settings::SessionSettings;
use crate::signals::{Signal, SignalStore};
use crate::signature::SignatureSet;
use crate::task::Task;
use crate::types::*;

/// One capture session bound to one window: a scanner loop feeding the
/// signal store, one loop per rule, and the action gate they share.
///
/// Stopping (or dropping) the session ends every loop, cancels queued
/// key presses and clears the signals.
pub struct Session {
    platform: Arc<dyn Platform>,
    window_id: WindowId,
    settings: SessionSettings,
    signals: Arc<SignalStore>,
    gate: Arc<ActionGate>,
    scanner: Option<Task>,
    rules: HashMap<String, Task>,
}

impl Session {
    pub fn start(
        platform: Arc<dyn Platform>,
        window_id: WindowId,
        signatures: &SignatureSet,
        settings: SessionSettings,
    ) -> Result<Session, ConfigError> {
        for name in settings.readout.signatures() {
            if signatures.get(name).is_none() {
                return Err(ConfigError::UnknownSignature(name.to_string()));
            }
        }
        let index = Arc::new(SignatureIndex::build(signatures)?);
        let signals = Arc::new(SignalStore::new());

        let connect: Connector = {
            let platform = Arc::clone(&platform);
            Box::new(move || platform.connect_executor())
        };
        let gate = Arc::new(ActionGate::new(connect, settings.action_delay()).with_jitter(settings.action_jitter));

        let scanner = spawn_scanner(
            platform.create_window(window_id),
            index,
            Arc::clone(&signals),
            &settings,
        );

        logger::info(&format!(
            "session started on window {} ({} signatures)",
            window_id,
            signatures.len()
        ));

        Ok(Session {
            platform,
            window_id,
            settings,
            signals,
            gate,
            scanner: Some(scanner),
            rules: HashMap::new(),
        })
    }

    /// Start (or wholesale replace) the loop for `rule`. An invalid rule is
    /// reported once and never runs; other rules are unaffected.
    pub fn start_rule(&mut self, rule: Rule) -> Result<(), ConfigError> {
        if let Err(e) = rule.validate() {
            logger::error(&format!("rule disabled: {}", e));
            return Err(e);
        }
        if let Some(old) = self.rules.remove(&rule.id) {
            logger::info(&format!("replacing rule {}", rule.id));
            old.cancel();
        }
        if !rule.enabled {
            logger::info(&format!("rule {} is disabled", rule.id));
            return Ok(());
        }

        let id = rule.id.clone();
        let task = spawn_rule(
            rule,
            self.platform.create_window(self.window_id),
            Arc::clone(&self.signals),
            Arc::clone(&self.gate),
            &self.settings,
        );
        logger::info(&format!("rule {} started", id));
        self.rules.insert(id, task);
        Ok(())
    }

    pub fn stop_rule(&mut self, id: &str) -> bool {
        match self.rules.remove(id) {
            Some(task) => {
                task.cancel();
                logger::info(&format!("rule {} stopped", id));
                true
            }
            None => false,
        }
    }

    /// Ingest a signal from outside the scan pipeline.
    pub fn update_signal(&self, name: &str, value: Signal) {
        self.signals.update(name, value);
    }

    pub fn signals(&self) -> Arc<SignalStore> {
        Arc::clone(&self.signals)
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn running_rules(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rules.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stop(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.scanner.is_none() && self.rules.is_empty() && self.gate.is_closed() {
            return;
        }
        // Rules first so nothing new reaches the gate while it drains.
        for (_, task) in self.rules.drain() {
            task.cancel();
        }
        if let Some(scanner) = self.scanner.take() {
            scanner.cancel();
        }
        self.gate.shutdown();
        self.signals.clear();
        logger::info(&format!("session on window {} stopped", self.window_id));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn spawn_scanner(
    mut window: Box<dyn WindowHandle>,
    index: Arc<SignatureIndex>,
    signals: Arc<SignalStore>,
    settings: &SessionSettings,
) -> Task {
    let rect = settings.scan_rect;
    let readout = settings.readout.clone();
    let mut failing = false;

    Task::every("scan", settings.scan_interval(), move || {
        match window.capture(rect) {
            Ok(capture) => {
                if failing {
                    logger::info_p("scan", "capture recovered");
                    failing = false;
                }
                let result = scanner::scan(&capture, &index);
                readout.apply(&result, &capture, &signals);
            }
            // Skip the cycle; signals keep their last values.
            Err(e) => {
                if !failing {
                    logger::warn_p("scan", &format!("capture failed, skipping cycles: {}", e));
                    failing = true;
                }
            }
        }
    })
}

fn spawn_rule(
    rule: Rule,
    mut window: Box<dyn WindowHandle>,
    signals: Arc<SignalStore>,
    gate: Arc<ActionGate>,
    settings: &SessionSettings,
) -> Task {
    let prefix = format!("rule:{}", rule.id);
    let interval = rule.interval();
    let bounds = rule.probe_bounds();
    let window_id = window.id();
    let mut eval = RuleEvaluator::new(rule, settings.evaluator());
    let mut pending: Vec<Receipt> = Vec::new();

    Task::every(prefix.clone(), interval, move || {
        pending.retain(|receipt| match receipt.poll() {
            None => true,
            Some(Ok(())) => false,
            Some(Err(e)) => {
                logger::warn_p(&prefix, &format!("{} failed: {}", eval.rule().key, e));
                false
            }
        });

        let snapshot = signals.snapshot();
        let mut probes = ProbeFrame { window: window.as_mut(), bounds, frame: None };
        let previous = eval.last_decision();

        match eval.tick(&snapshot, &mut probes, Instant::now()) {
            Decision::Fire => {
                let request = ActionRequest {
                    window_id,
                    key: eval.rule().key.clone(),
                    source: eval.rule().id.clone(),
                };
                match gate.submit(request) {
                    Ok(receipt) => pending.push(receipt),
                    Err(e) => logger::warn_p(&prefix, &format!("{} not sent: {}", eval.rule().key, e)),
                }
            }
            Decision::Skip(reason) => {
                if previous != Some(Decision::Skip(reason)) {
                    logger::info_p(&prefix, &format!("waiting: {:?}", reason));
                }
            }
        }
    })
}

/// Captures the probe rectangle on first use, so ticks that stop before
/// the probe check cost no capture.
struct ProbeFrame<'a> {
    window: &'a mut (dyn WindowHandle + 'static),
    bounds: Option<CaptureRect>,
    frame: Option<Option<Framed>>,
}

impl PixelSource for ProbeFrame<'_> {
    fn sample(&mut self, x: i32, y: i32) -> Option<Rgb> {
        if self.frame.is_none() {
            let framed = self.bounds.and_then(|rect| match self.window.capture(Some(rect)) {
                Ok(capture) => Some(Framed { origin: rect, capture }),
                Err(e) => {
                    logger::warn(&format!("probe capture failed: {}", e));
                    None
                }
            });
            self.frame = Some(framed);
        }
        self.frame.as_mut()?.as_mut()?.sample(x, y)
    }
}
