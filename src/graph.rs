//! Modular graph - owns named units, their connections and block buffers

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::mem;

use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::{Error, PortKind, Result};
use crate::node::{Buffer, Input, UnitGenerator};
use crate::param::Params;
use crate::MAX_PORTS;

/// A directed edge from one unit's output port to another unit's input port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from: String,
    pub from_port: usize,
    pub to: String,
    pub to_port: usize,
}

/// The order in which [`ModularSystem::process`] visits units.
///
/// Whatever the order, an edge whose source has not run yet in the current
/// pass delivers the source's output from the previous block (an implicit
/// one-block delay). This is how feedback patches work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessOrder {
    /// Units run in the order they were added.
    #[default]
    Registration,
    /// Sources run before the units they feed, so forward edges carry the
    /// current block. Units inside a feedback loop keep registration order
    /// among themselves, and the loop's back edges keep the one-block delay.
    Topological,
}

#[derive(Clone, Copy, Debug)]
struct Route {
    source: usize,
    output: usize,
}

struct Slot {
    name: String,
    unit: Box<dyn UnitGenerator>,
    /// Resolved source per input port
    routes: Vec<Option<Route>>,
    /// Previous-block copies for inputs fed by this same unit
    loopback: Vec<Buffer>,
}

/// A graph of named unit generators driven one block at a time.
///
/// # Building
///
/// ```
/// use modgraph::{ModularSystem, nodes::{Gain, Sine}};
///
/// let mut system = ModularSystem::new().with_sample_rate(48_000);
/// system.add_module("osc", Box::new(Sine::new(440.0))).unwrap();
/// system.add_module("master", Box::new(Gain::new(0.5))).unwrap();
/// system.connect("osc", 0, "master", 0).unwrap();
///
/// system.process(64);
/// let out = system.output("master", 0).unwrap();
/// assert_eq!(out.len(), 64);
/// ```
///
/// # Threading
///
/// `process` runs to completion on the calling thread without locking and,
/// while the block size stays the same, without allocating. Structural calls
/// (`add_module`, `remove_module`, `connect`, `disconnect`) are not real-time
/// safe; make them while audio is paused, or build a new graph and swap it in.
/// Parameter writes through [`params`](Self::params) handles are safe at any time.
pub struct ModularSystem {
    slots: Vec<Slot>,
    /// Output buffers, parallel to `slots`, one per declared output port
    buffers: Vec<Vec<Buffer>>,
    indices: HashMap<String, usize>,
    connections: Vec<Connection>,
    order: Vec<usize>,
    process_order: ProcessOrder,
    sample_rate: Option<u32>,
    num_frames: usize,
}

impl Default for ModularSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ModularSystem {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create an empty graph with room for `capacity` units.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            buffers: Vec::with_capacity(capacity),
            indices: HashMap::with_capacity(capacity),
            connections: Vec::new(),
            order: Vec::with_capacity(capacity),
            process_order: ProcessOrder::default(),
            sample_rate: None,
            num_frames: 0,
        }
    }

    /// Choose the evaluation order (builder pattern).
    pub fn with_order(mut self, order: ProcessOrder) -> Self {
        self.set_process_order(order);
        self
    }

    /// Prepare for `sample_rate` up front (builder pattern).
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.prepare(sample_rate);
        self
    }

    pub fn process_order(&self) -> ProcessOrder {
        self.process_order
    }

    pub fn set_process_order(&mut self, order: ProcessOrder) {
        self.process_order = order;
        self.rebuild_order();
    }

    /// The rate passed to the last [`prepare`](Self::prepare), if any.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Prepare every unit for `sample_rate`. Units added later are prepared on insertion.
    pub fn prepare(&mut self, sample_rate: u32) {
        debug!(sample_rate, units = self.slots.len(), "preparing graph");
        self.sample_rate = Some(sample_rate);
        for slot in self.slots.iter_mut() {
            slot.unit.prepare(sample_rate);
        }
    }

    /// Reset every unit and silence every buffer.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.unit.reset();
            slot.loopback.iter_mut().for_each(Buffer::silence);
        }
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.silence();
        }
    }

    /// Add `unit` under `name`. The graph takes ownership.
    pub fn add_module(&mut self, name: &str, mut unit: Box<dyn UnitGenerator>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.indices.contains_key(name) {
            return Err(Error::DuplicateModule(name.to_string()));
        }
        let num_inputs = unit.num_inputs();
        if num_inputs > MAX_PORTS {
            return Err(Error::TooManyPorts {
                module: name.to_string(),
                count: num_inputs,
            });
        }

        if let Some(rate) = self.sample_rate {
            unit.prepare(rate);
        }

        let outputs = (0..unit.num_outputs())
            .map(|_| Buffer::new(self.num_frames))
            .collect();

        debug!(module = name, kind = unit.name(), inputs = num_inputs, outputs = unit.num_outputs(), "adding module");

        let index = self.slots.len();
        self.slots.push(Slot {
            name: name.to_string(),
            unit,
            routes: alloc::vec![None; num_inputs],
            loopback: (0..num_inputs).map(|_| Buffer::default()).collect(),
        });
        self.buffers.push(outputs);
        self.indices.insert(name.to_string(), index);
        self.rebuild_order();
        Ok(())
    }

    /// Remove `name` and every connection that touches it. Returns the unit.
    pub fn remove_module(&mut self, name: &str) -> Result<Box<dyn UnitGenerator>> {
        let index = *self
            .indices
            .get(name)
            .ok_or_else(|| Error::UnknownModule(name.to_string()))?;

        let before = self.connections.len();
        self.connections.retain(|c| c.from != name && c.to != name);
        debug!(module = name, dropped_connections = before - self.connections.len(), "removing module");

        let slot = self.slots.remove(index);
        self.buffers.remove(index);
        self.indices = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.name.clone(), i))
            .collect();
        self.rebuild_routes();
        Ok(slot.unit)
    }

    /// Connect output `from_port` of `from` to input `to_port` of `to`.
    ///
    /// Fails if either module is missing, a port index is out of range, or the
    /// input already has a source. On failure nothing changes.
    pub fn connect(&mut self, from: &str, from_port: usize, to: &str, to_port: usize) -> Result<()> {
        let source = self.index_of(from)?;
        let sink = self.index_of(to)?;

        let num_outputs = self.slots[source].unit.num_outputs();
        if from_port >= num_outputs {
            return Err(Error::PortOutOfRange {
                kind: PortKind::Output,
                index: from_port,
                count: num_outputs,
            });
        }
        let num_inputs = self.slots[sink].routes.len();
        if to_port >= num_inputs {
            return Err(Error::PortOutOfRange {
                kind: PortKind::Input,
                index: to_port,
                count: num_inputs,
            });
        }
        if self.slots[sink].routes[to_port].is_some() {
            return Err(Error::InputAlreadyConnected {
                module: to.to_string(),
                port: to_port,
            });
        }

        debug!("connecting {}[{}] -> {}[{}]", from, from_port, to, to_port);
        self.connections.push(Connection {
            from: from.to_string(),
            from_port,
            to: to.to_string(),
            to_port,
        });
        self.slots[sink].routes[to_port] = Some(Route {
            source,
            output: from_port,
        });
        self.rebuild_order();
        Ok(())
    }

    /// Remove a connection. Returns `false` if there was no such connection.
    pub fn disconnect(&mut self, from: &str, from_port: usize, to: &str, to_port: usize) -> bool {
        let position = self.connections.iter().position(|c| {
            c.from == from && c.from_port == from_port && c.to == to && c.to_port == to_port
        });
        match position {
            Some(position) => {
                debug!("disconnecting {}[{}] -> {}[{}]", from, from_port, to, to_port);
                self.connections.remove(position);
                self.rebuild_routes();
                true
            }
            None => false,
        }
    }

    /// Process one block of `num_frames` samples through every unit.
    ///
    /// Each unit reads whatever its sources last wrote: this block's data if
    /// the source already ran in this pass, the previous block's otherwise.
    pub fn process(&mut self, num_frames: usize) {
        if num_frames != self.num_frames {
            for buffer in self.buffers.iter_mut().flatten() {
                buffer.resize(num_frames);
            }
            self.num_frames = num_frames;
        }

        let Self {
            slots,
            buffers,
            order,
            ..
        } = self;

        for &index in order.iter() {
            let slot = &mut slots[index];
            let mut outputs = mem::take(&mut buffers[index]);

            // Self-connections read the previous block, copied aside before it is overwritten
            for (port, route) in slot.routes.iter().enumerate() {
                if let Some(route) = route {
                    if route.source == index {
                        let loopback = &mut slot.loopback[port];
                        loopback.resize(num_frames);
                        loopback.copy_from_slice(&outputs[route.output]);
                    }
                }
            }

            let mut inputs = [Input::Absent; MAX_PORTS];
            for (port, route) in slot.routes.iter().enumerate() {
                if let Some(route) = route {
                    inputs[port] = if route.source == index {
                        Input::Signal(slot.loopback[port].as_slice())
                    } else {
                        Input::Signal(buffers[route.source][route.output].as_slice())
                    };
                }
            }

            slot.unit
                .process(&inputs[..slot.routes.len()], &mut outputs, num_frames);
            buffers[index] = outputs;
        }
    }

    /// Names of all modules in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    pub fn module(&self, name: &str) -> Option<&dyn UnitGenerator> {
        let index = *self.indices.get(name)?;
        Some(self.slots[index].unit.as_ref())
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut (dyn UnitGenerator + 'static)> {
        let index = *self.indices.get(name)?;
        Some(self.slots[index].unit.as_mut())
    }

    /// A parameter handle for `name` that can be moved to a control thread.
    pub fn params(&self, name: &str) -> Option<Params> {
        self.module(name)?.params()
    }

    /// Latest block written by output `port` of `name`.
    pub fn output(&self, name: &str, port: usize) -> Option<&[f32]> {
        let index = *self.indices.get(name)?;
        self.buffers[index].get(port).map(Buffer::as_slice)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Module names in the order `process` visits them.
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.slots[i].name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownModule(name.to_string()))
    }

    /// Re-resolve every connection against the current slot indices.
    fn rebuild_routes(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.routes.iter_mut().for_each(|route| *route = None);
        }
        for connection in self.connections.iter() {
            let (Some(&source), Some(&sink)) =
                (self.indices.get(&connection.from), self.indices.get(&connection.to))
            else {
                continue;
            };
            self.slots[sink].routes[connection.to_port] = Some(Route {
                source,
                output: connection.from_port,
            });
        }
        self.rebuild_order();
    }

    fn rebuild_order(&mut self) {
        self.order.clear();
        match self.process_order {
            ProcessOrder::Registration => self.order.extend(0..self.slots.len()),
            ProcessOrder::Topological => {
                let mut graph = DiGraph::<usize, ()>::with_capacity(self.slots.len(), self.connections.len());
                let nodes: Vec<NodeIndex> = (0..self.slots.len()).map(|i| graph.add_node(i)).collect();
                for (sink, slot) in self.slots.iter().enumerate() {
                    for route in slot.routes.iter().flatten() {
                        graph.add_edge(nodes[route.source], nodes[sink], ());
                    }
                }
                // tarjan_scc yields components in reverse topological order
                for component in tarjan_scc(&graph).into_iter().rev() {
                    self.order
                        .extend(component.into_iter().map(|node| graph[node]).sorted_unstable());
                }
            }
        }
        debug!(order = %self.evaluation_order().iter().join(", "), "evaluation order");
    }
}
