//! Bounded top-usage lists
//!
//! Keeps the K longest traces of one kind, longest first. Insertion is a
//! linear scan over at most K entries; K is a report length, not a queue size.

use accelprof_shared::types::events::DurationMs;
use accelprof_shared::types::trace::{BufferTrace, DeviceTrace, KernelTrace};
use anyhow::Result;

use crate::writer::SummaryWriter;

/// A record that can be ranked by duration and rendered as one summary row
pub trait Trace {
    fn duration(&self) -> DurationMs;

    fn write(&self, writer: &mut dyn SummaryWriter) -> Result<()>;
}

impl Trace for KernelTrace {
    fn duration(&self) -> DurationMs {
        KernelTrace::duration(self)
    }

    fn write(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        writer.write_kernel_trace(self)
    }
}

impl Trace for BufferTrace {
    fn duration(&self) -> DurationMs {
        BufferTrace::duration(self)
    }

    fn write(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        writer.write_buffer_trace(self)
    }
}

impl Trace for DeviceTrace {
    fn duration(&self) -> DurationMs {
        DeviceTrace::duration(self)
    }

    fn write(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        writer.write_device_trace(self)
    }
}

/// Fixed-capacity list of the longest traces seen so far
#[derive(Debug, Clone)]
pub struct TopUsage<T> {
    capacity: usize,
    entries: Vec<T>,
}

impl<T: Trace> TopUsage<T> {
    /// Create a list retaining at most `capacity` traces
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            // one slot of headroom for the entry evicted on overflow
            entries: Vec::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    /// Take ownership of `trace` and rank it.
    ///
    /// The trace goes before the first entry with a strictly shorter
    /// duration, so equal durations keep arrival order. Returns the trace
    /// dropped to stay within capacity, if any.
    pub fn push(&mut self, trace: T) -> Option<T> {
        let duration = trace.duration();
        let position = self
            .entries
            .iter()
            .position(|existing| existing.duration() < duration)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, trace);

        if self.entries.len() > self.capacity {
            self.entries.pop()
        } else {
            None
        }
    }

    /// Render the retained traces, longest first
    pub fn write_summary(&self, writer: &mut dyn SummaryWriter) -> Result<()> {
        for trace in &self.entries {
            trace.write(writer)?;
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<'a, T> IntoIterator for &'a TopUsage<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
