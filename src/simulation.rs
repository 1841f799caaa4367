//! The day loop.
//!
//! Each simulated day is one plan at `day * DAY`. It freezes the day's
//! restrictions, replays the day's presence events through the contact
//! model, empties the containers at the end of the day, advances every
//! person's disease state and writes the day's report. The next day is
//! scheduled unless the last day is reached or nobody is infected or in
//! quarantine any more.
use std::rc::Rc;

use log::{debug, info};

use crate::config::{EpisimConfig, Parameters};
use crate::contact_model::{ContactModel, ContactRng};
use crate::containers::{ContainerId, ContainerKind, Containers, ContextContainerExt, Occupant};
use crate::context::Context;
use crate::error::EpisimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::infection_params::{ActivityId, ActivityTable, ContextActivityExt, InfectionParams};
use crate::mobility::{check_events, EventSource, PresenceAction, PresenceEvent};
use crate::people::{ContextPeopleExt, DiseaseStatus, PersonId, DAY};
use crate::policy::{ContextPolicyExt, PolicySchedule, RestrictionPolicy};
use crate::progression::{can_progress, ProgressionModel, ProgressionRng, TransitionProbabilities};
use crate::random::ContextRandomExt;
use crate::reporting::ContextReportingExt;
use crate::{define_data_plugin, define_rng};

define_rng!(SeedingRng);

/// Settings that take precedence over the `Parameters` of the run.
#[derive(Default)]
pub struct RunOverrides {
    pub last_day: Option<u32>,
    pub policy: Option<PolicySchedule>,
    pub probabilities: Option<Box<dyn TransitionProbabilities>>,
}

struct SimulationData {
    source: Option<Box<dyn EventSource>>,
    config: Rc<EpisimConfig>,
    progression: Option<Rc<ProgressionModel>>,
    last_day: u32,
}

define_data_plugin!(
    SimulationPlugin,
    SimulationData,
    SimulationData {
        source: None,
        config: Rc::new(EpisimConfig::default()),
        progression: None,
        last_day: 0,
    }
);

#[derive(Clone, Copy, Debug)]
enum Presence {
    Enter(Option<ActivityId>),
    Leave,
}

/// A presence event with interned ids and an absolute time.
#[derive(Clone, Copy, Debug)]
struct ResolvedEvent {
    time: f64,
    person: PersonId,
    container: ContainerId,
    presence: Presence,
}

/// Prepares `context` for a run and schedules day 0.
///
/// Uses the `Parameters` global property, setting the defaults if it is
/// unset. Report options must be configured before calling this.
///
/// # Errors
///
/// Returns a configuration or policy error if the run can't be set up, or
/// an error creating the report files.
pub fn init(
    context: &mut Context,
    source: Box<dyn EventSource>,
    overrides: RunOverrides,
) -> Result<(), EpisimError> {
    if context.get_global_property_value(Parameters).is_none() {
        context.set_global_property_value(Parameters, EpisimConfig::default())?;
    }
    let config = context
        .get_global_property_value(Parameters)
        .cloned()
        .ok_or_else(|| EpisimError::ConfigError("run parameters are not set".to_string()))?;

    let table = ActivityTable::new(
        config
            .infection_params
            .iter()
            .map(InfectionParams::from)
            .collect(),
    );
    let schedule = overrides
        .policy
        .or_else(|| config.policy.clone())
        .unwrap_or_default();
    let policy = RestrictionPolicy::build(
        &schedule,
        table.categories(),
        config.start_date,
        config.masks.mask_type,
    )?;
    context.set_activity_table(table);
    context.set_restriction_policy(policy);
    context.add_episim_reports(config.run_id.as_deref(), config.verbose_infection_log_limit)?;

    let progression = match overrides.probabilities {
        Some(probabilities) => {
            ProgressionModel::with_probabilities(config.tracing.clone(), probabilities)
        }
        None => ProgressionModel::new(config.tracing.clone()),
    };
    let last_day = overrides.last_day.unwrap_or(config.last_day);
    info!(
        "episim run: {} activity categories, calibration={}, last day {last_day}, {} persons",
        config.infection_params.len(),
        config.calibration_parameter,
        context.get_current_population()
    );
    debug!("tracing: {:?}, masks: {:?}", config.tracing, config.masks);

    let data = context.get_data_mut(SimulationPlugin);
    data.source = Some(source);
    data.config = Rc::new(config);
    data.progression = Some(Rc::new(progression));
    data.last_day = last_day;

    context.add_plan(0.0, |context| run_day(context, 0));
    Ok(())
}

/// Runs simulated day `day` and schedules the next one.
///
/// # Errors
///
/// Returns the first error of the day; the run must not be continued.
pub fn run_day(context: &mut Context, day: u32) -> Result<(), EpisimError> {
    info!("starting day {day}");
    let restrictions = context.freeze_restrictions(day);

    let data = context.get_data_mut(SimulationPlugin);
    let config = Rc::clone(&data.config);
    let last_day = data.last_day;
    let events = data
        .source
        .as_mut()
        .ok_or_else(|| EpisimError::EpisimError("simulation is not initialized".to_string()))?
        .events_for_day(day)?;
    check_events(&events)?;

    let resolved = resolve_events(context, &events, day, &config)?;
    prepare_day(context, &resolved);
    if day == 0 {
        seed_infections(context, &config)?;
    }

    let model = ContactModel::new(&config, context.activity_table(), restrictions);
    let mut containers = std::mem::take(context.containers_mut());
    let replayed = replay(context, &mut containers, &model, &resolved, day);
    *context.containers_mut() = containers;
    replayed?;

    progress(context, day)?;
    let report = context.report_day(day)?;

    if day >= last_day || !can_progress(&report) {
        info!("simulation ends after day {day}");
        context.shutdown();
    } else {
        let next = day + 1;
        context.add_plan(f64::from(next) * DAY, move |context| run_day(context, next));
    }
    Ok(())
}

fn resolve_events(
    context: &mut Context,
    events: &[PresenceEvent],
    day: u32,
    config: &EpisimConfig,
) -> Result<Vec<ResolvedEvent>, EpisimError> {
    let day_start = f64::from(day) * DAY;
    let mut resolved = Vec::with_capacity(events.len());
    for event in events {
        let person = context.population_mut().get_or_add_person(&event.person);
        let container = context
            .containers_mut()
            .get_or_add(event.container_kind, &event.container);
        let presence = match (&event.action, event.container_kind) {
            (PresenceAction::Leave, _) => Presence::Leave,
            (PresenceAction::Enter { .. }, ContainerKind::Vehicle) => {
                context.intern_activity(&config.transit_activity)?;
                Presence::Enter(None)
            }
            (PresenceAction::Enter { activity }, ContainerKind::Facility) => {
                let label = activity.as_deref().ok_or_else(|| {
                    EpisimError::InvalidEvent(format!(
                        "{} enters facility {} without an activity",
                        event.person, event.container
                    ))
                })?;
                Presence::Enter(Some(context.intern_activity(label)?))
            }
        };
        resolved.push(ResolvedEvent {
            time: day_start + event.time,
            person,
            container,
            presence,
        });
    }
    Ok(resolved)
}

/// Empties the containers and rebuilds every trajectory from the day's
/// facility entries.
fn prepare_day(context: &mut Context, resolved: &[ResolvedEvent]) {
    context.containers_mut().clear_occupants();
    let population = context.population_mut();
    for id in population.ids().collect::<Vec<_>>() {
        let person = population.get_mut(id);
        person.trajectory.clear();
        person.current_container = None;
    }
    for event in resolved {
        if let Presence::Enter(Some(activity)) = event.presence {
            population.get_mut(event.person).trajectory.push(activity);
        }
    }
}

fn seed_infections(context: &mut Context, config: &EpisimConfig) -> Result<(), EpisimError> {
    let district = config.initial_infection_district.as_deref();
    let seeded = context.sample_people(
        SeedingRng,
        |person| {
            person.disease_status() == DiseaseStatus::Susceptible
                && district.map_or(true, |district| {
                    person.attributes().district.as_deref() == Some(district)
                })
        },
        config.initial_infections,
    );
    let population = context.population_mut();
    for id in &seeded {
        population
            .get_mut(*id)
            .set_disease_status(0.0, DiseaseStatus::InfectedButNotContagious)?;
    }
    info!("seeded {} initial infections", seeded.len());
    Ok(())
}

fn replay(
    context: &mut Context,
    containers: &mut Containers,
    model: &ContactModel,
    resolved: &[ResolvedEvent],
    day: u32,
) -> Result<(), EpisimError> {
    let mut rng = context.day_rng(ContactRng, day);
    for event in resolved {
        match event.presence {
            Presence::Enter(activity) => {
                let person = context.population_mut().get_mut(event.person);
                if let Some(inside) = person.current_container() {
                    return Err(EpisimError::InvalidEvent(format!(
                        "{} enters {} while inside {}",
                        person.external_id(),
                        containers.get(event.container).name(),
                        containers.get(inside).name()
                    )));
                }
                person.current_container = Some(event.container);
                containers.enter(
                    event.container,
                    Occupant {
                        person: event.person,
                        enter_time: event.time,
                        activity,
                    },
                )?;
            }
            Presence::Leave => {
                leave(context, containers, model, event.container, event.person, event.time, day, &mut rng)?;
            }
        }
    }

    // Whoever is still inside leaves at the end of the day.
    let day_end = f64::from(day + 1) * DAY;
    let end = resolved
        .last()
        .map_or(day_end, |event| event.time.max(day_end));
    let remaining: Vec<(ContainerId, PersonId)> = containers
        .occupied()
        .flat_map(|container| {
            container
                .occupants()
                .iter()
                .map(move |occupant| (container.id(), occupant.person))
        })
        .collect();
    debug!("{} persons are left in containers at the end of day {day}", remaining.len());
    for (container, person) in remaining {
        leave(context, containers, model, container, person, end, day, &mut rng)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn leave<R: rand::Rng>(
    context: &mut Context,
    containers: &mut Containers,
    model: &ContactModel,
    container_id: ContainerId,
    person: PersonId,
    now: f64,
    day: u32,
    rng: &mut R,
) -> Result<(), EpisimError> {
    let occupant = containers.leave(container_id, person)?;
    let container = containers.get(container_id);
    let records = model.on_leave(context.population_mut(), container, &occupant, now, day, rng)?;

    let leaving = context.population_mut().get_mut(person);
    leaving.current_container = None;
    if container.kind() == ContainerKind::Facility {
        leaving.trajectory.advance();
    }
    for record in &records {
        context.report_infection(record)?;
    }
    Ok(())
}

fn progress(context: &mut Context, day: u32) -> Result<(), EpisimError> {
    let progression = context
        .get_data(SimulationPlugin)
        .and_then(|data| data.progression.clone())
        .ok_or_else(|| EpisimError::EpisimError("simulation is not initialized".to_string()))?;
    let mut rng = context.day_rng(ProgressionRng, day);
    let population = context.population_mut();
    for id in population.ids().collect::<Vec<_>>() {
        progression.update_state(population, id, day, &mut rng)?;
    }
    Ok(())
}
