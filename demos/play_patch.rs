//! Play a patch on the default output device while a control thread sweeps it
//!
//! Run with: cargo run --example play_patch --features cpal_sink

use std::thread::sleep;
use std::time::{Duration, Instant};

use modgraph::nodes::{Gain, Saw, Sine};
use modgraph::{CpalDevice, Host, ModularSystem};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    for device in CpalDevice::list_outputs() {
        println!("found {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
    }

    let device = CpalDevice::default_output()?;
    let mut graph = ModularSystem::new().with_sample_rate(device.sample_rate());

    graph.add_module("lfo", Box::new(Sine::new(4.0).with_amplitude(3.0)))?;
    graph.add_module("osc", Box::new(Saw::new(220.0).with_amplitude(0.4)))?;
    graph.add_module("master", Box::new(Gain::new(0.5)))?;
    graph.connect("lfo", 0, "osc", Saw::FM_INPUT)?;
    graph.connect("osc", 0, "master", 0)?;

    // Parameter handles stay valid while the graph renders elsewhere
    let osc = graph.params("osc").ok_or("osc has no parameters")?;
    let control = std::thread::spawn(move || {
        for step in 0..=24 {
            let frequency = 220.0 * 2f32.powf(step as f32 / 12.0);
            let _ = osc.set("frequency", frequency);
            sleep(Duration::from_millis(250));
        }
    });

    let (producer, consumer) = rtrb::RingBuffer::new(device.ring_capacity());
    let mut host = Host::new(graph, producer).with_channels(device.channels() as usize);
    host.fill();
    let stream = device.open(consumer)?;

    println!("Playing... sweeping two octaves");

    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(7) {
        host.fill();
        if stream.check_underrun() {
            println!("underrun after {} samples", stream.samples_consumed());
        }
        sleep(Duration::from_millis(2));
    }

    let _ = control.join();
    Ok(())
}
