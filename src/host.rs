//! Block host - drives a graph and feeds its output into a ring buffer
//!
//! The host is the audio-driver side of a [`ModularSystem`]: it calls
//! `process` once per block, reads the designated output unit and pushes the
//! samples, interleaved, into an `rtrb` ring. Whatever drains the ring (a
//! [`CpalDevice`](crate::CpalDevice) stream, a file writer, a test) runs on its
//! own schedule.

use alloc::string::{String, ToString};

use rtrb::Producer;
use tracing::{trace, warn};

use crate::graph::ModularSystem;
use crate::DEFAULT_BLOCK_SIZE;

/// Drives a [`ModularSystem`] block by block into a ring buffer.
///
/// ```
/// use modgraph::{Host, ModularSystem, nodes::Sine};
///
/// let mut graph = ModularSystem::new();
/// graph.add_module("master", Box::new(Sine::new(440.0))).unwrap();
///
/// let (producer, mut consumer) = rtrb::RingBuffer::new(1024);
/// let mut host = Host::new(graph, producer).with_channels(2).with_block_size(128);
///
/// assert_eq!(host.fill(), 4);
/// assert_eq!(consumer.slots(), 1024);
/// ```
pub struct Host {
    graph: ModularSystem,
    producer: Producer<f32>,
    output: String,
    output_port: usize,
    channels: usize,
    block_size: usize,
    blocks_rendered: u64,
    warned_missing_output: bool,
}

impl Host {
    /// Create a host reading output 0 of the unit named `"master"`, stereo,
    /// [`DEFAULT_BLOCK_SIZE`] frames per block.
    pub fn new(graph: ModularSystem, producer: Producer<f32>) -> Self {
        Self {
            graph,
            producer,
            output: "master".to_string(),
            output_port: 0,
            channels: 2,
            block_size: DEFAULT_BLOCK_SIZE,
            blocks_rendered: 0,
            warned_missing_output: false,
        }
    }

    /// Number of interleaved channels written per frame (builder pattern).
    /// The mono output is duplicated to every channel.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels.max(1);
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Read output `port` of the unit named `name` (builder pattern).
    pub fn with_output(mut self, name: &str, port: usize) -> Self {
        self.output = name.to_string();
        self.output_port = port;
        self.warned_missing_output = false;
        self
    }

    #[inline]
    pub fn graph(&self) -> &ModularSystem {
        &self.graph
    }

    /// Structural changes made through this are not real-time safe, see [`ModularSystem`].
    #[inline]
    pub fn graph_mut(&mut self) -> &mut ModularSystem {
        &mut self.graph
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered
    }

    /// Render one block into the ring.
    ///
    /// Returns `false`, without processing, if the ring has no room for a
    /// whole block. A missing output unit writes silence.
    pub fn render_block(&mut self) -> bool {
        let samples_needed = self.block_size * self.channels;

        // Skip this block rather than partially write
        if self.producer.slots() < samples_needed {
            trace!(free = self.producer.slots(), needed = samples_needed, "ring full, block deferred");
            return false;
        }

        self.graph.process(self.block_size);

        match self.graph.output(&self.output, self.output_port) {
            Some(samples) => {
                for &sample in samples.iter() {
                    for _ in 0..self.channels {
                        // Slots were checked above
                        let _ = self.producer.push(sample);
                    }
                }
            }
            None => {
                if !self.warned_missing_output {
                    warn!(
                        output = %self.output,
                        port = self.output_port,
                        "output unit not found, writing silence"
                    );
                    self.warned_missing_output = true;
                }
                for _ in 0..samples_needed {
                    let _ = self.producer.push(0.0);
                }
            }
        }

        self.blocks_rendered += 1;
        true
    }

    /// Render blocks until the ring has no room for another. Returns how many were rendered.
    pub fn fill(&mut self) -> usize {
        let mut rendered = 0;
        while self.render_block() {
            rendered += 1;
        }
        rendered
    }

    /// Take the graph and the ring producer back.
    pub fn into_parts(self) -> (ModularSystem, Producer<f32>) {
        (self.graph, self.producer)
    }
}
