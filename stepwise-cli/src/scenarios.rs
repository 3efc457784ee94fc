//! Built-in traffic-light scenarios

use stepwise_core::config::StepwiseConfig;
use stepwise_scenario::ThenStepFamily;
use stepwise_sim::{LightColour, TrafficSettings, TrafficStory};

use crate::error::CliError;

/// A named scenario the `run` command can execute.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinScenario {
    pub name: &'static str,
    pub description: &'static str,
    prepare: fn(&mut TrafficSettings),
    declare: fn(&TrafficStory),
}

impl BuiltinScenario {
    /// Build a ready-to-run story from the effective configuration.
    pub fn build(&self, config: &StepwiseConfig) -> Result<TrafficStory, CliError> {
        let mut settings = TrafficSettings::try_from(&config.traffic)
            .map_err(|e| CliError::Config(e.to_string()))?;
        (self.prepare)(&mut settings);
        let story = TrafficStory::new(self.name, config.scenario.clone(), settings);
        (self.declare)(&story);
        Ok(story)
    }
}

/// All built-in scenarios in listing order.
pub const BUILTIN_SCENARIOS: [BuiltinScenario; 4] = [
    BuiltinScenario {
        name: "red-then-green",
        description: "traffic light turns RED, then GREEN",
        prepare: keep_settings,
        declare: red_then_green,
    },
    BuiltinScenario {
        name: "green-then-red",
        description: "lights start GREEN and the run ends before the light returns to GREEN; \
                      expecting RED then GREEN fails on the GREEN step",
        prepare: start_green_single_cycle,
        declare: red_then_green,
    },
    BuiltinScenario {
        name: "manual-mode-never-changes",
        description: "under manual control neither light changes until the simulation ends",
        prepare: keep_settings,
        declare: manual_mode_never_changes,
    },
    BuiltinScenario {
        name: "unordered-lights",
        description: "both lights switch, in either order",
        prepare: keep_settings,
        declare: unordered_lights,
    },
];

/// Look up a built-in scenario by name.
pub fn find(name: &str) -> Option<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS.iter().find(|s| s.name == name)
}

fn keep_settings(_: &mut TrafficSettings) {}

fn start_green_single_cycle(settings: &mut TrafficSettings) {
    settings.initial_traffic = LightColour::Green;
    settings.initial_pedestrian = LightColour::Red;
    settings.run_for = settings.green_duration + settings.red_duration;
}

fn red_then_green(story: &TrafficStory) {
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);
    story.then.traffic_light.changes_traffic_light_to(LightColour::Green);
}

fn manual_mode_never_changes(story: &TrafficStory) {
    story.when.simulation.starts();
    story.when.traffic_light.placed_under_manual_control();
    story
        .then
        .traffic_light
        .never()
        .changes_traffic_light_to(LightColour::Green);
    story
        .then
        .traffic_light
        .never()
        .changes_pedestrian_light_to(LightColour::Red);
    story.then.simulation.has_finished();
}

fn unordered_lights(story: &TrafficStory) {
    story.when.simulation.starts();
    let lights = story.then.traffic_light.unordered("lights");
    lights.changes_pedestrian_light_to(LightColour::Red);
    lights.changes_traffic_light_to(LightColour::Green);
}
