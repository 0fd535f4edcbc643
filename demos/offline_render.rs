//! Render a small patch without an audio device and report its level
//!
//! Run with: cargo run --example offline_render

use modgraph::nodes::{Gain, Pulse, Saw, Sine};
use modgraph::{Host, ModularSystem, ProcessOrder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut graph = ModularSystem::new()
        .with_order(ProcessOrder::Topological)
        .with_sample_rate(48_000);

    // A 5 Hz vibrato on a saw, plus a slowly pulsing square an octave down
    graph.add_module("vibrato", Box::new(Sine::new(5.0).with_amplitude(6.0)))?;
    graph.add_module("lead", Box::new(Saw::new(220.0).with_amplitude(0.5)))?;
    graph.add_module("pwm", Box::new(Sine::new(0.5).with_amplitude(0.3)))?;
    graph.add_module("bass", Box::new(Pulse::square(110.0).with_amplitude(0.3)))?;
    graph.add_module("master", Box::new(Gain::new(0.8)))?;

    graph.connect("vibrato", 0, "lead", Saw::FM_INPUT)?;
    graph.connect("pwm", 0, "bass", Pulse::PWM_INPUT)?;
    graph.connect("lead", 0, "master", 0)?;

    println!("evaluation order: {:?}", graph.evaluation_order());

    // One second of stereo audio
    let (producer, mut consumer) = rtrb::RingBuffer::new(48_000 * 2);
    let mut host = Host::new(graph, producer).with_channels(2).with_block_size(480);
    let blocks = host.fill();

    let mut sum = 0.0f64;
    let mut peak = 0.0f32;
    let mut count = 0usize;
    while let Ok(sample) = consumer.pop() {
        sum += (sample as f64) * (sample as f64);
        peak = peak.max(sample.abs());
        count += 1;
    }

    let rms = (sum / count.max(1) as f64).sqrt();
    println!("{blocks} blocks, {count} samples, rms {rms:.4}, peak {peak:.4}");

    // Swap the tap over to the bass line and render a little more
    let (graph, producer) = host.into_parts();
    let mut host = Host::new(graph, producer).with_output("bass", 0).with_block_size(480);
    host.render_block();
    println!("bass block rendered, total blocks: {}", host.blocks_rendered());

    Ok(())
}
