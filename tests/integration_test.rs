use std::sync::{Arc, Mutex};

use modgraph::nodes::{Gain, Saw, Sine};
use modgraph::{
    input_signal, port_name, Buffer, Error, Input, ModularSystem, PortKind, ProcessOrder, Result,
    UnitGenerator,
};

/// What a [`TestUnit`] writes each block.
#[derive(Clone)]
enum Behaviour {
    /// Every output filled with the value
    Constant(f32),
    /// Number of blocks processed so far, counting this one
    Counter,
    /// Input 0 plus one, absent input counts as zero
    Accumulate,
    /// Output `n` filled with `n + 1`
    Ramp,
    /// Records whether each input was absent
    Record(Arc<Mutex<Vec<bool>>>),
}

#[derive(Clone)]
struct TestUnit {
    behaviour: Behaviour,
    inputs: usize,
    outputs: usize,
    blocks: u32,
}

impl TestUnit {
    fn boxed(behaviour: Behaviour, inputs: usize, outputs: usize) -> Box<dyn UnitGenerator> {
        Box::new(Self {
            behaviour,
            inputs,
            outputs,
            blocks: 0,
        })
    }
}

impl UnitGenerator for TestUnit {
    fn process(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        self.blocks += 1;
        match &self.behaviour {
            Behaviour::Constant(value) => {
                for out in outputs.iter_mut() {
                    out[..num_frames].fill(*value);
                }
            }
            Behaviour::Counter => {
                for out in outputs.iter_mut() {
                    out[..num_frames].fill(self.blocks as f32);
                }
            }
            Behaviour::Accumulate => {
                let input = input_signal(inputs, 0, num_frames);
                for (i, sample) in outputs[0][..num_frames].iter_mut().enumerate() {
                    *sample = input.map_or(0.0, |x| x[i]) + 1.0;
                }
            }
            Behaviour::Ramp => {
                for (n, out) in outputs.iter_mut().enumerate() {
                    out[..num_frames].fill(n as f32 + 1.0);
                }
            }
            Behaviour::Record(seen) => {
                let mut seen = seen.lock().unwrap();
                seen.clear();
                seen.extend(inputs.iter().map(Input::is_absent));
                for out in outputs.iter_mut() {
                    out[..num_frames].fill(0.0);
                }
            }
        }
    }

    fn num_inputs(&self) -> usize {
        self.inputs
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn input_name(&self, index: usize) -> Result<&'static str> {
        port_name(&["a", "b", "c"][..self.inputs.min(3)], PortKind::Input, index)
    }

    fn output_name(&self, index: usize) -> Result<&'static str> {
        port_name(&["x", "y", "z"][..self.outputs.min(3)], PortKind::Output, index)
    }

    fn set_parameter(&self, _name: &str, _value: f32) -> Result<()> {
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32> {
        Err(Error::UnknownParameter(name.to_string()))
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "Test Unit"
    }

    fn box_clone(&self) -> Box<dyn UnitGenerator> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.blocks = 0;
    }
}

fn constant(value: f32) -> Box<dyn UnitGenerator> {
    TestUnit::boxed(Behaviour::Constant(value), 0, 1)
}

fn counter() -> Box<dyn UnitGenerator> {
    TestUnit::boxed(Behaviour::Counter, 0, 1)
}

#[test]
fn gain_scales_and_clamps() {
    let mut system = ModularSystem::new();
    system.add_module("source", constant(0.5)).unwrap();
    system.add_module("gain", Box::new(Gain::new(2.0))).unwrap();
    system.connect("source", 0, "gain", 0).unwrap();

    system.process(100);
    let out = system.output("gain", 0).unwrap();
    assert_eq!(out.len(), 100);
    assert!(out.iter().all(|&s| s == 1.0));

    system.module("gain").unwrap().set_parameter("gain", 12.0).unwrap();
    assert_eq!(system.module("gain").unwrap().get_parameter("gain").unwrap(), 10.0);

    system.process(100);
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 5.0));
}

#[test]
fn removing_a_source_leaves_its_sink_silent() {
    let mut system = ModularSystem::new();
    system.add_module("osc", Box::new(Sine::new(440.0))).unwrap();
    system.add_module("gain", Box::new(Gain::new(1.0))).unwrap();
    system.connect("osc", 0, "gain", 0).unwrap();

    system.process(64);
    assert!(system.output("gain", 0).unwrap().iter().any(|&s| s != 0.0));

    let removed = system.remove_module("osc").unwrap();
    assert_eq!(removed.name(), "Sine Oscillator");
    assert!(system.connections().is_empty());
    assert_eq!(system.module_names(), vec!["gain".to_string()]);

    system.process(64);
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 0.0));

    // The sink is still fully usable
    system.add_module("saw", Box::new(Saw::new(110.0))).unwrap();
    system.connect("saw", 0, "gain", 0).unwrap();
    system.process(64);
    assert!(system.output("gain", 0).unwrap().iter().any(|&s| s != 0.0));

    assert!(matches!(
        system.connect("osc", 0, "gain", 0),
        Err(Error::UnknownModule(name)) if name == "osc"
    ));
}

#[test]
fn removing_a_middle_module_keeps_other_routes() {
    let mut system = ModularSystem::new();
    system.add_module("a", constant(0.25)).unwrap();
    system.add_module("b", constant(0.75)).unwrap();
    system.add_module("c", Box::new(Gain::new(4.0))).unwrap();
    system.connect("a", 0, "c", 0).unwrap();

    system.remove_module("b").unwrap();
    system.process(8);
    assert!(system.output("c", 0).unwrap().iter().all(|&s| s == 1.0));
    assert_eq!(system.connections().len(), 1);
}

#[test]
fn structural_errors_leave_the_graph_unchanged() {
    let mut system = ModularSystem::new();
    system.add_module("a", constant(1.0)).unwrap();
    system.add_module("b", Box::new(Gain::new(1.0))).unwrap();
    system.connect("a", 0, "b", 0).unwrap();

    assert!(matches!(system.add_module("", constant(0.0)), Err(Error::EmptyName)));
    assert!(matches!(
        system.add_module("a", Box::new(Sine::new(1.0))),
        Err(Error::DuplicateModule(name)) if name == "a"
    ));
    assert_eq!(system.module("a").unwrap().name(), "Test Unit");

    assert!(matches!(system.remove_module("nope"), Err(Error::UnknownModule(_))));
    assert!(matches!(system.connect("nope", 0, "b", 0), Err(Error::UnknownModule(_))));
    assert!(matches!(system.connect("a", 0, "nope", 0), Err(Error::UnknownModule(_))));
    assert!(matches!(
        system.connect("a", 1, "b", 0),
        Err(Error::PortOutOfRange { kind: PortKind::Output, index: 1, count: 1 })
    ));
    assert!(matches!(
        system.connect("a", 0, "b", 1),
        Err(Error::PortOutOfRange { kind: PortKind::Input, index: 1, count: 1 })
    ));
    assert!(matches!(
        system.connect("a", 0, "b", 0),
        Err(Error::InputAlreadyConnected { port: 0, .. })
    ));

    assert_eq!(system.len(), 2);
    assert_eq!(system.connections().len(), 1);
}

#[test]
fn too_many_inputs_are_rejected() {
    let mut system = ModularSystem::new();
    let wide = TestUnit::boxed(Behaviour::Constant(0.0), modgraph::MAX_PORTS + 1, 1);
    assert!(matches!(system.add_module("wide", wide), Err(Error::TooManyPorts { .. })));
    assert!(system.is_empty());
}

#[test]
fn disconnect_is_a_no_op_for_missing_edges() {
    let mut system = ModularSystem::new();
    system.add_module("a", constant(1.0)).unwrap();
    system.add_module("b", Box::new(Gain::new(1.0))).unwrap();

    assert!(!system.disconnect("a", 0, "b", 0));
    assert!(!system.disconnect("x", 0, "y", 0));

    system.connect("a", 0, "b", 0).unwrap();
    assert!(system.disconnect("a", 0, "b", 0));
    assert!(system.connections().is_empty());

    system.process(4);
    assert!(system.output("b", 0).unwrap().iter().all(|&s| s == 0.0));

    // The freed input accepts a new source
    system.connect("a", 0, "b", 0).unwrap();
}

#[test]
fn unconnected_inputs_are_absent() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut system = ModularSystem::new();
    system.add_module("src", constant(1.0)).unwrap();
    system
        .add_module("recorder", TestUnit::boxed(Behaviour::Record(seen.clone()), 3, 1))
        .unwrap();
    system.connect("src", 0, "recorder", 1).unwrap();

    system.process(16);
    assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
}

#[test]
fn every_output_holds_exactly_one_block() {
    let mut system = ModularSystem::new();
    system.add_module("ramp", TestUnit::boxed(Behaviour::Ramp, 0, 3)).unwrap();
    system.add_module("osc", Box::new(Sine::new(440.0))).unwrap();
    system.add_module("gain", Box::new(Gain::new(1.0))).unwrap();
    system.connect("osc", 0, "gain", 0).unwrap();

    for n in [100, 37, 256, 1, 0] {
        system.process(n);
        for port in 0..3 {
            assert_eq!(system.output("ramp", port).unwrap().len(), n);
        }
        assert_eq!(system.output("osc", 0).unwrap().len(), n);
        assert_eq!(system.output("gain", 0).unwrap().len(), n);
    }
    assert!(system.output("ramp", 3).is_none());
    assert!(system.output("nope", 0).is_none());
}

#[test]
fn each_output_port_has_its_own_buffer() {
    let mut system = ModularSystem::new();
    system.add_module("ramp", TestUnit::boxed(Behaviour::Ramp, 0, 3)).unwrap();
    system.add_module("first", Box::new(Gain::new(1.0))).unwrap();
    system.add_module("third", Box::new(Gain::new(1.0))).unwrap();
    system.connect("ramp", 0, "first", 0).unwrap();
    system.connect("ramp", 2, "third", 0).unwrap();

    system.process(8);
    assert!(system.output("first", 0).unwrap().iter().all(|&s| s == 1.0));
    assert!(system.output("third", 0).unwrap().iter().all(|&s| s == 3.0));
}

#[test]
fn registration_order_delays_backward_edges() {
    let mut system = ModularSystem::new();
    // The sink is registered before its source, so it sees the previous block
    system.add_module("gain", Box::new(Gain::new(1.0))).unwrap();
    system.add_module("count", counter()).unwrap();
    system.connect("count", 0, "gain", 0).unwrap();
    assert_eq!(system.evaluation_order(), vec!["gain", "count"]);

    system.process(4);
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 0.0));
    system.process(4);
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 1.0));
    system.process(4);
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 2.0));
}

#[test]
fn topological_order_runs_sources_first() {
    let mut system = ModularSystem::new().with_order(ProcessOrder::Topological);
    system.add_module("out", Box::new(Gain::new(1.0))).unwrap();
    system.add_module("mid", Box::new(Gain::new(1.0))).unwrap();
    system.add_module("count", counter()).unwrap();
    system.connect("count", 0, "mid", 0).unwrap();
    system.connect("mid", 0, "out", 0).unwrap();

    assert_eq!(system.evaluation_order(), vec!["count", "mid", "out"]);

    system.process(4);
    assert!(system.output("out", 0).unwrap().iter().all(|&s| s == 1.0));
    system.process(4);
    assert!(system.output("out", 0).unwrap().iter().all(|&s| s == 2.0));

    system.set_process_order(ProcessOrder::Registration);
    assert_eq!(system.evaluation_order(), vec!["out", "mid", "count"]);
}

#[test]
fn topological_order_keeps_cycles_in_registration_order() {
    let mut system = ModularSystem::new().with_order(ProcessOrder::Topological);
    system.add_module("b", Box::new(Gain::new(1.0))).unwrap();
    system.add_module("a", TestUnit::boxed(Behaviour::Accumulate, 1, 1)).unwrap();
    system.add_module("src", constant(0.0)).unwrap();
    system.connect("a", 0, "b", 0).unwrap();
    system.connect("b", 0, "a", 0).unwrap();

    // Nothing feeds "src", so it has no ordering constraint against the loop
    let order = system.evaluation_order();
    let b = order.iter().position(|&n| n == "b").unwrap();
    let a = order.iter().position(|&n| n == "a").unwrap();
    assert!(b < a);

    // b reads a's previous block, a reads b from this block
    system.process(2);
    assert_eq!(system.output("b", 0).unwrap(), &[0.0, 0.0]);
    assert_eq!(system.output("a", 0).unwrap(), &[1.0, 1.0]);
    system.process(2);
    assert_eq!(system.output("b", 0).unwrap(), &[1.0, 1.0]);
    assert_eq!(system.output("a", 0).unwrap(), &[2.0, 2.0]);
}

#[test]
fn self_connection_reads_the_previous_block() {
    let mut system = ModularSystem::new();
    system.add_module("acc", TestUnit::boxed(Behaviour::Accumulate, 1, 1)).unwrap();
    system.connect("acc", 0, "acc", 0).unwrap();

    for expected in 1..=4 {
        system.process(8);
        assert!(system
            .output("acc", 0)
            .unwrap()
            .iter()
            .all(|&s| s == expected as f32));
    }
}

#[test]
fn prepare_reaches_existing_and_later_units() {
    let mut system = ModularSystem::new();
    system.add_module("early", Box::new(Sine::new(441.0))).unwrap();
    system.prepare(44_100);
    system.add_module("late", Box::new(Sine::new(441.0))).unwrap();
    assert_eq!(system.sample_rate(), Some(44_100));

    system.process(4);
    let expected = (std::f32::consts::TAU / 100.0).sin();
    for name in ["early", "late"] {
        let out = system.output(name, 0).unwrap();
        assert!((out[1] - expected).abs() < 1e-6, "{name}: {}", out[1]);
    }
}

#[test]
fn reset_restarts_units_and_silences_buffers() {
    let mut system = ModularSystem::new();
    system.add_module("count", counter()).unwrap();
    system.add_module("gain", Box::new(Gain::new(3.0))).unwrap();
    system.connect("count", 0, "gain", 0).unwrap();

    system.process(4);
    system.process(4);
    system.reset();
    assert!(system.output("gain", 0).unwrap().iter().all(|&s| s == 0.0));
    assert_eq!(system.module("gain").unwrap().get_parameter("gain").unwrap(), 1.0);

    system.process(4);
    assert!(system.output("count", 0).unwrap().iter().all(|&s| s == 1.0));
}

#[test]
fn accessors() {
    let mut system = ModularSystem::with_capacity(4);
    system.add_module("one", Box::new(Sine::new(220.0))).unwrap();
    system.add_module("two", Box::new(Gain::new(0.5))).unwrap();
    system.connect("one", 0, "two", 0).unwrap();

    assert_eq!(system.module_names(), vec!["one".to_string(), "two".to_string()]);
    assert!(system.contains("one"));
    assert!(!system.contains("three"));
    assert!(system.module("three").is_none());
    assert_eq!(system.len(), 2);

    let connection = &system.connections()[0];
    assert_eq!((connection.from.as_str(), connection.from_port), ("one", 0));
    assert_eq!((connection.to.as_str(), connection.to_port), ("two", 0));

    // A params handle writes straight through to the owned unit
    let params = system.params("one").unwrap();
    params.set("frequency", 330.0).unwrap();
    assert_eq!(system.module("one").unwrap().get_parameter("frequency").unwrap(), 330.0);

    system.module_mut("one").unwrap().prepare(96_000);
    let copy = system.module("two").unwrap().box_clone();
    assert_eq!(copy.get_parameter("gain").unwrap(), 0.5);
}
