//! Interface exporter.
//!
//! Builds the ordered state and command handle lists from the vehicle
//! configuration and resolves interface names back to thruster slots.

use super::mode::ThrusterRequest;
use std::collections::{HashMap, HashSet};
use thruster_common::consts::VEHICLE_PREFIX;
use thruster_common::hal::config::VehicleConfig;
use thruster_common::hal::driver::HardwareError;
use thruster_common::hal::interface::{
    CommandField, CommandInterface, StateInterface, StateSlot, interface_name,
    split_interface_name,
};
use tracing::{debug, trace};

/// Declared interfaces of one driver instance.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    thrusters: HashMap<String, usize>,
    names: Vec<String>,
    declared: Vec<Vec<CommandField>>,
    state: Vec<StateInterface>,
    command: Vec<CommandInterface>,
}

impl InterfaceTable {
    /// Build handles for every declared interface.
    ///
    /// # Errors
    /// `HardwareError::Initialization` on missing or duplicate declarations.
    pub fn build(config: &VehicleConfig) -> Result<Self, HardwareError> {
        config.validate()?;

        // State and command handles are separate lists; names repeat across them.
        let mut state_names = HashSet::new();
        let mut command_names = HashSet::new();

        let mut thrusters = HashMap::with_capacity(config.thrusters.len());
        let mut names = Vec::with_capacity(config.thrusters.len());
        let mut declared = Vec::with_capacity(config.thrusters.len());
        let mut state = Vec::new();
        let mut command = Vec::new();

        for (index, thruster) in config.thrusters.iter().enumerate() {
            thrusters.insert(thruster.name.clone(), index);
            names.push(thruster.name.clone());

            for field in thruster.state_fields()? {
                let name = interface_name(&thruster.name, field.as_str());
                claim(&mut state_names, &name)?;
                state.push(StateInterface {
                    name,
                    slot: StateSlot::Thruster { index, field },
                });
            }

            let fields = thruster.command_fields()?;
            for &field in &fields {
                let name = interface_name(&thruster.name, field.as_str());
                claim(&mut command_names, &name)?;
                command.push(CommandInterface {
                    name,
                    thruster: index,
                    field,
                });
            }
            declared.push(fields);
        }

        for (index, sensor) in config.sensors.iter().enumerate() {
            let name = interface_name(VEHICLE_PREFIX, sensor);
            claim(&mut state_names, &name)?;
            state.push(StateInterface {
                name,
                slot: StateSlot::Sensor(index),
            });
        }

        debug!(
            "Declared {} state and {} command interfaces for {} thrusters",
            state.len(),
            command.len(),
            names.len()
        );

        Ok(Self {
            thrusters,
            names,
            declared,
            state,
            command,
        })
    }

    /// State handles in export order.
    #[inline]
    pub fn state_interfaces(&self) -> &[StateInterface] {
        &self.state
    }

    /// Command handles in export order.
    #[inline]
    pub fn command_interfaces(&self) -> &[CommandInterface] {
        &self.command
    }

    /// Declared command fields per thruster.
    pub fn declared_command_fields(&self) -> Vec<Vec<CommandField>> {
        self.declared.clone()
    }

    /// Name of thruster `index`.
    pub fn thruster_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of thrusters.
    #[inline]
    pub fn thruster_count(&self) -> usize {
        self.names.len()
    }

    /// Resolve a command interface name.
    ///
    /// Returns `Ok(None)` for names that belong to no thruster of this
    /// driver; the host may pass interfaces of other components.
    pub fn resolve_command(&self, name: &str) -> Result<Option<(usize, CommandField)>, HardwareError> {
        let Some((index, field)) = self.locate(name) else {
            return Ok(None);
        };
        let field = CommandField::parse(field)
            .ok_or_else(|| HardwareError::UnknownInterface(name.to_string()))?;
        Ok(Some((index, field)))
    }

    fn locate<'a>(&self, name: &'a str) -> Option<(usize, &'a str)> {
        let (prefix, field) = split_interface_name(name)?;
        self.thrusters.get(prefix).map(|&index| (index, field))
    }

    /// Group a switch request by thruster, indexed like the thrusters.
    ///
    /// A thruster that starts `disable` ignores every other name aimed at
    /// it, including fields it does not know.
    pub fn group_requests(
        &self,
        start: &[String],
        stop: &[String],
    ) -> Result<Vec<ThrusterRequest>, HardwareError> {
        let mut requests = vec![ThrusterRequest::default(); self.names.len()];
        let mut unknown: Vec<(usize, &String)> = Vec::new();

        for (names, is_start) in [(start, true), (stop, false)] {
            for name in names {
                let Some((index, field)) = self.locate(name) else {
                    trace!("Ignoring foreign interface {}", name);
                    continue;
                };
                let Some(field) = CommandField::parse(field) else {
                    unknown.push((index, name));
                    continue;
                };
                let fields = if is_start {
                    &mut requests[index].start
                } else {
                    &mut requests[index].stop
                };
                push_unique(fields, field);
            }
        }

        for (index, name) in unknown {
            if !requests[index].start.contains(&CommandField::Disable) {
                return Err(HardwareError::UnknownInterface(name.clone()));
            }
            debug!("Dropping {} alongside disable", name);
        }
        Ok(requests)
    }
}

fn claim(seen: &mut HashSet<String>, name: &str) -> Result<(), HardwareError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(HardwareError::Initialization(format!(
            "Duplicate interface name: {name}"
        )))
    }
}

fn push_unique(fields: &mut Vec<CommandField>, field: CommandField) {
    if !fields.contains(&field) {
        fields.push(field);
    }
}
