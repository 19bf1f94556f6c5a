use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effect::Effect;
use crate::error::PipelineError;
use crate::model::{overlap, Color, Interval, LightId, LightRoster};
use crate::util::{insert_sorted, search_leftmost, search_rightmost};

/// Compositing layers, lowest priority first. A higher channel's active
/// effect overrides the components it defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Background,
    Default,
    Flash,
    Strobe,
}

impl ChannelKind {
    /// Every channel in composition order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Background,
        ChannelKind::Default,
        ChannelKind::Flash,
        ChannelKind::Strobe,
    ];

    /// Channels with lower priority than this one.
    pub fn below(self) -> impl Iterator<Item = ChannelKind> {
        Self::ALL.into_iter().filter(move |k| *k < self)
    }
}

/// Which lights each channel may address.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLights {
    pub background: Vec<LightId>,
    pub default: Vec<LightId>,
    pub flash: Vec<LightId>,
    pub strobe: Vec<LightId>,
}

impl ChannelLights {
    /// Every light of the roster on every channel.
    pub fn single_channel(roster: &LightRoster) -> Self {
        let all: Vec<LightId> = roster.ids().collect();
        Self {
            background: all.clone(),
            default: all.clone(),
            flash: all.clone(),
            strobe: all,
        }
    }

    pub fn lights(&self, kind: ChannelKind) -> &[LightId] {
        match kind {
            ChannelKind::Background => &self.background,
            ChannelKind::Default => &self.default,
            ChannelKind::Flash => &self.flash,
            ChannelKind::Strobe => &self.strobe,
        }
    }
}

/// One reversible edit, recorded while a section is being staged.
#[derive(Debug, Clone)]
enum Change {
    Added { light: LightId, index: usize },
    Removed { light: LightId, index: usize, effect: Effect },
}

fn record(journal: &mut Option<Vec<Change>>, change: Change) {
    if let Some(changes) = journal {
        changes.push(change);
    }
}

/// One compositing layer: a start-ordered effect list per light.
#[derive(Debug, Clone)]
pub struct EffectChannel {
    kind: ChannelKind,
    effects: IndexMap<LightId, Vec<Effect>>,
    /// Upper bound on any effect's span, used to bound sampling searches.
    longest: f64,
    /// Edits since the last `begin`, None when not staging.
    journal: Option<Vec<Change>>,
}

impl EffectChannel {
    pub fn new(kind: ChannelKind, lights: impl IntoIterator<Item = LightId>) -> Self {
        Self {
            kind,
            effects: lights.into_iter().map(|id| (id, Vec::new())).collect(),
            longest: 0.0,
            journal: None,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Lights addressed by this channel, in roster order.
    pub fn lights(&self) -> impl Iterator<Item = LightId> + '_ {
        self.effects.keys().copied()
    }

    pub fn light_count(&self) -> usize {
        self.effects.len()
    }

    pub fn contains(&self, light: LightId) -> bool {
        self.effects.contains_key(&light)
    }

    pub fn effect_count(&self) -> usize {
        self.effects.values().map(Vec::len).sum()
    }

    fn unknown(&self, light: LightId) -> PipelineError {
        PipelineError::UnknownLight {
            light: format!("{light} ({:?} channel)", self.kind),
        }
    }

    /// Effects of `light`, ordered by start.
    pub fn effects(&self, light: LightId) -> Result<&[Effect], PipelineError> {
        self.effects
            .get(&light)
            .map(Vec::as_slice)
            .ok_or_else(|| self.unknown(light))
    }

    /// Insert an effect after any existing effects with the same start.
    /// Overlaps are not checked.
    pub fn add(&mut self, effect: Effect) -> Result<(), PipelineError> {
        effect.validate()?;
        let kind = self.kind;
        let light = effect.light;
        let list = self
            .effects
            .get_mut(&light)
            .ok_or_else(|| PipelineError::UnknownLight {
                light: format!("{light} ({kind:?} channel)"),
            })?;
        self.longest = self.longest.max(effect.end() - effect.start());
        let index = insert_sorted(list, effect, Effect::start);
        record(&mut self.journal, Change::Added { light, index });
        Ok(())
    }

    /// Remove every effect matching `remove`, returning them.
    fn remove_where(&mut self, remove: impl Fn(&Effect) -> bool) -> Vec<Effect> {
        let mut removed = Vec::new();
        for (light, list) in &mut self.effects {
            for index in (0..list.len()).rev() {
                if list.get(index).is_some_and(&remove) {
                    let effect = list.remove(index);
                    record(
                        &mut self.journal,
                        Change::Removed {
                            light: *light,
                            index,
                            effect,
                        },
                    );
                    removed.push(effect);
                }
            }
        }
        removed
    }

    /// Remove every effect lying entirely inside `[start, end)`.
    pub fn clear(&mut self, start: f64, end: f64) {
        self.remove_where(|e| e.start() >= start && e.end() <= end);
    }

    /// Remove every effect overlapping `[start, end)`, including ones that
    /// only partially reach into it.
    pub fn purge(&mut self, start: f64, end: f64) {
        let Some(range) = Interval::from_bounds(start, end) else {
            return;
        };
        self.remove_where(|e| overlap(&e.span(), &range));
    }

    /// Empty `[start, end)`: effects inside it are removed and effects
    /// reaching into it are trimmed back to the parts outside it.
    pub fn cut(&mut self, start: f64, end: f64) -> Result<(), PipelineError> {
        let Some(range) = Interval::from_bounds(start, end) else {
            return Ok(());
        };
        let removed = self.remove_where(|e| overlap(&e.span(), &range));
        for piece in removed.into_iter().flat_map(|e| e.outside(&range)) {
            self.add(piece)?;
        }
        Ok(())
    }

    // ── Staging ──────────────────────────────────────────────────

    /// Start recording edits so they can be rolled back.
    pub fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Keep every edit since `begin`.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every edit since `begin`, newest first.
    pub fn rollback(&mut self) {
        let Some(changes) = self.journal.take() else {
            return;
        };
        for change in changes.into_iter().rev() {
            match change {
                Change::Added { light, index } => {
                    if let Some(list) = self.effects.get_mut(&light) {
                        if index < list.len() {
                            list.remove(index);
                        }
                    }
                }
                Change::Removed {
                    light,
                    index,
                    effect,
                } => {
                    if let Some(list) = self.effects.get_mut(&light) {
                        list.insert(index.min(list.len()), effect);
                    }
                }
            }
        }
    }

    /// Effects of `list` that may be active at `t`.
    fn candidates(&self, list: &[Effect], t: f64) -> std::ops::Range<usize> {
        let lo = search_leftmost(list, &(t - self.longest), Effect::start);
        let hi = search_rightmost(list, &t, Effect::start).max(lo);
        lo..hi
    }

    fn active<'a>(&self, list: &'a [Effect], t: f64) -> impl Iterator<Item = &'a Effect> {
        list.get(self.candidates(list, t))
            .unwrap_or(&[])
            .iter()
            .filter(move |e| e.is_active(t))
    }

    /// Every effect active at `t`, across all lights.
    pub fn busy_effects(&self, t: f64) -> Vec<&Effect> {
        self.effects
            .values()
            .flat_map(|list| self.active(list, t))
            .collect()
    }

    /// Lights with at least one active effect at `t`.
    pub fn busy_lights(&self, t: f64) -> Vec<LightId> {
        self.effects
            .iter()
            .filter(|(_, list)| self.active(list, t).next().is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Lights with no active effect at `t`.
    pub fn available_lights(&self, t: f64) -> Vec<LightId> {
        self.effects
            .iter()
            .filter(|(_, list)| self.active(list, t).next().is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    /// The light that becomes free first after `t`. Free lights win immediately.
    pub fn soonest_free_light(&self, t: f64) -> Option<LightId> {
        self.effects
            .iter()
            .map(|(id, list)| {
                let busy_until = self.active(list, t).map(Effect::end).fold(t, f64::max);
                (*id, busy_until)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// A random available light at `t`, or the soonest-free one when all are busy.
    pub fn pick_light<R: Rng + ?Sized>(&self, t: f64, rng: &mut R) -> Result<LightId, PipelineError> {
        let available = self.available_lights(t);
        available
            .choose(rng)
            .copied()
            .or_else(|| self.soonest_free_light(t))
            .ok_or(PipelineError::NoLights)
    }

    /// Fold every effect of `light` active at `t` over `from`, in start order.
    pub fn sample(&self, light: LightId, t: f64, from: Color) -> Result<Color, PipelineError> {
        let list = self.effects(light)?;
        Ok(self
            .active(list, t)
            .fold(from, |color, effect| effect.interpolate(t, color)))
    }
}

// ── Channel set ──────────────────────────────────────────────────

/// One channel of every kind, in composition order.
#[derive(Debug, Clone)]
pub struct ChannelSet {
    channels: [EffectChannel; 4],
}

impl ChannelSet {
    pub fn new(lights: &ChannelLights) -> Self {
        Self {
            channels: ChannelKind::ALL
                .map(|kind| EffectChannel::new(kind, lights.lights(kind).iter().copied())),
        }
    }

    pub fn get(&self, kind: ChannelKind) -> &EffectChannel {
        let [background, default, flash, strobe] = &self.channels;
        match kind {
            ChannelKind::Background => background,
            ChannelKind::Default => default,
            ChannelKind::Flash => flash,
            ChannelKind::Strobe => strobe,
        }
    }

    pub fn get_mut(&mut self, kind: ChannelKind) -> &mut EffectChannel {
        let [background, default, flash, strobe] = &mut self.channels;
        match kind {
            ChannelKind::Background => background,
            ChannelKind::Default => default,
            ChannelKind::Flash => flash,
            ChannelKind::Strobe => strobe,
        }
    }

    /// Channels from lowest to highest priority.
    pub fn iter(&self) -> impl Iterator<Item = &EffectChannel> {
        self.channels.iter()
    }

    pub fn effect_count(&self) -> usize {
        self.channels.iter().map(EffectChannel::effect_count).sum()
    }

    /// Stage edits on every channel. See [`EffectChannel::begin`].
    pub fn begin(&mut self) {
        self.channels.iter_mut().for_each(EffectChannel::begin);
    }

    pub fn commit(&mut self) {
        self.channels.iter_mut().for_each(EffectChannel::commit);
    }

    /// Drop every edit staged since `begin`.
    pub fn rollback(&mut self) {
        self.channels.iter_mut().for_each(EffectChannel::rollback);
    }

    /// Composed color of `light` at `t`: every channel addressing the light is
    /// folded over `from`, lowest priority first.
    pub fn sample(&self, light: LightId, t: f64, from: Color) -> Color {
        self.channels
            .iter()
            .filter(|channel| channel.contains(light))
            .fold(from, |color, channel| {
                channel.sample(light, t, color).unwrap_or(color)
            })
    }
}
