//! Whole-track show generation: analysis and roster in, finished timeline out.
//!
//! Order of work:
//! 1. Seed the rng and draw the palette
//! 2. Fill the background channel with the slow color cycle
//! 3. Rate every section and pick one generator per intensity level
//! 4. Run the chosen generator over each section
//! 5. Strobe the detected bursts of intense, non-strobing sections

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::analyzer::{compute_intensities, detect_bursts, Burst, Intensity};
use crate::effects::burst_strobe::{self, MIN_BURST_INTENSITY};
use crate::effects::{background, EffectKind, EffectSelection, SectionContext, BUILTIN_EFFECTS};
use crate::engine::{ChannelKind, ChannelLights, ChannelSet, Timeline};
use crate::error::PipelineError;
use crate::model::{AudioAnalysis, ColorPalette, Interval, LightRoster};
use crate::settings::PipelineConfig;

/// What happened to one section while building a show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    pub index: usize,
    pub interval: Interval,
    pub intensity: Intensity,
    /// None when the section has no usable beat.
    pub effect: Option<EffectKind>,
    /// Set when the generator failed; the section is then left unlit.
    pub error: Option<PipelineError>,
}

/// A detected burst and whether it was strobed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurstRecord {
    pub interval: Interval,
    pub members: Burst,
    /// Section the burst starts in.
    pub section: Option<usize>,
    pub strobed: bool,
}

/// A finished show plus the decisions that shaped it.
#[derive(Debug, Clone)]
pub struct GeneratedShow {
    pub timeline: Timeline,
    pub palette: ColorPalette,
    pub sections: Vec<SectionRecord>,
    pub bursts: Vec<BurstRecord>,
}

/// Every channel light must be part of the roster, and the roster can't be empty.
fn validate_lights(roster: &LightRoster, lights: &ChannelLights) -> Result<(), PipelineError> {
    if roster.is_empty() {
        return Err(PipelineError::NoLights);
    }
    let unknown = ChannelKind::ALL
        .into_iter()
        .flat_map(|kind| lights.lights(kind).iter())
        .find(|id| !roster.contains(**id));
    match unknown {
        Some(id) => Err(PipelineError::UnknownLight {
            light: id.to_string(),
        }),
        None => Ok(()),
    }
}

/// Build the light show for one track.
///
/// Generator failures are per section: the section is recorded with its error
/// and left without effects, the rest of the show is still built. Structural
/// problems (bad config, unknown lights, an empty roster) fail the whole build.
pub fn generate_show(
    analysis: &AudioAnalysis,
    roster: LightRoster,
    lights: &ChannelLights,
    config: &PipelineConfig,
) -> Result<GeneratedShow, PipelineError> {
    config.effects.validate()?;
    validate_lights(&roster, lights)?;

    let mut rng = StdRng::seed_from_u64(config.seed());
    let palette = ColorPalette::random(&mut rng, config.allow_hdr).for_effects(config.allow_hdr);
    let mut channels = ChannelSet::new(lights);

    if !config.disable_background {
        background::generate(
            analysis.track.duration,
            &palette,
            &config.effects,
            &mut channels,
            &mut rng,
        )?;
    }

    let intensities = compute_intensities(&analysis.features, &analysis.sections);
    let selection = EffectSelection::pick(&BUILTIN_EFFECTS, &mut rng);

    let mut sections = Vec::with_capacity(analysis.sections.len());
    for (index, (section, intensity)) in analysis.sections.iter().zip(&intensities).enumerate() {
        let effect = selection.for_section(*intensity, &section.tempo);
        let mut error = None;
        if let Some(kind) = effect {
            let ctx = SectionContext {
                analysis,
                section,
                roster: &roster,
                palette: &palette,
                config,
            };
            // A failing generator leaves nothing behind.
            channels.begin();
            match kind.generate(&ctx, &mut channels, &mut rng) {
                Ok(()) => channels.commit(),
                Err(e) => {
                    channels.rollback();
                    log::warn!(
                        "section {index} at {:.2}s: {kind} failed: {e}",
                        section.interval.start()
                    );
                    error = Some(e);
                }
            }
        }
        log::debug!(
            "section {index} at {:.2}s: intensity {intensity}, effect {}",
            section.interval.start(),
            effect.map_or_else(|| "none".to_string(), |k| k.to_string())
        );
        sections.push(SectionRecord {
            index,
            interval: section.interval,
            intensity: *intensity,
            effect,
            error,
        });
    }

    let mut bursts = Vec::new();
    for members in detect_bursts(&analysis.segments, &config.bursts) {
        let (Some(first), Some(last)) = (members.first(), members.last()) else {
            continue;
        };
        let Some(interval) = Interval::from_bounds(first.start(), last.end()) else {
            continue;
        };
        let section = analysis.section_at(interval.start()).map(|(i, _)| i);
        let qualifies = section
            .and_then(|i| sections.get(i))
            .is_some_and(|record: &SectionRecord| {
                record.intensity >= MIN_BURST_INTENSITY
                    && record.error.is_none()
                    && !record.effect.is_some_and(EffectKind::is_strobe)
            });
        let strobed = qualifies
            && match burst_strobe::generate(&members, config, &mut channels, &mut rng) {
                Ok(flashes) => flashes > 0,
                Err(e) => {
                    log::warn!("burst at {:.2}s: strobe failed: {e}", interval.start());
                    false
                }
            };
        bursts.push(BurstRecord {
            interval,
            members,
            section,
            strobed,
        });
    }

    let timeline = Timeline::new(roster, channels, analysis.track.duration);
    log::info!(
        "built show: {:.1}s, {} sections, {} bursts ({} strobed), {} effects",
        analysis.track.duration,
        sections.len(),
        bursts.len(),
        bursts.iter().filter(|b| b.strobed).count(),
        timeline.effect_count()
    );

    Ok(GeneratedShow {
        timeline,
        palette,
        sections,
        bursts,
    })
}
