//! In-process processor group
//!
//! Every logical processor runs on its own thread and owns one
//! [`ThreadComm`]. Each ordered pair of processors is connected by an
//! unbounded channel, so sends never block and messages between two
//! processors arrive in the order they were sent.
use super::{Tag, Transport};
use crate::error::{Error, Result};
use crate::types::{Cplx, Real};
use num_traits::Zero;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Tag reserved for the collectives
const TAG_COLLECTIVE: Tag = Tag::MAX;

#[derive(Debug)]
struct Message {
    tag: Tag,
    data: Vec<Cplx>,
}

/// Member of an in-process processor group
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Outgoing channels, indexed by destination rank
    senders: Vec<Sender<Message>>,
    /// Incoming channels, indexed by source rank
    receivers: Vec<Receiver<Message>>,
}

impl ThreadComm {
    /// Create a fully connected group of `size` processors.
    ///
    /// # Panics
    /// If `size` is zero.
    pub fn group(size: usize) -> Vec<Self> {
        assert!(size > 0, "Processor group must not be empty!");
        let mut senders: Vec<Vec<Sender<Message>>> = (0..size).map(|_| Vec::new()).collect();
        let mut receivers: Vec<Vec<Receiver<Message>>> = (0..size).map(|_| Vec::new()).collect();
        for dst in 0..size {
            for src in 0..size {
                let (tx, rx) = channel();
                senders[src].push(tx);
                receivers[dst].push(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers.into_iter())
            .enumerate()
            .map(|(rank, (senders, receivers))| Self {
                rank,
                size,
                senders,
                receivers,
            })
            .collect()
    }

    fn send(&self, tag: Tag, dest: usize, data: &[Cplx]) -> Result<()> {
        let msg = Message {
            tag,
            data: data.to_vec(),
        };
        self.senders
            .get(dest)
            .ok_or_else(|| Error::Communication(format!("no processor with rank {}", dest)))?
            .send(msg)
            .map_err(|_| {
                Error::Communication(format!(
                    "rank {} cannot reach rank {}, it left the group",
                    self.rank, dest
                ))
            })
    }

    fn receive(&self, tag: Tag, source: usize, out: &mut [Cplx]) -> Result<()> {
        let msg = self
            .receivers
            .get(source)
            .ok_or_else(|| Error::Communication(format!("no processor with rank {}", source)))?
            .recv()
            .map_err(|_| {
                Error::Communication(format!(
                    "rank {} waits for rank {}, which left the group",
                    self.rank, source
                ))
            })?;
        if msg.tag != tag || msg.data.len() != out.len() {
            return Err(Error::Communication(format!(
                "rank {} expected message {} of length {} from rank {}, got message {} of length {}",
                self.rank,
                tag,
                out.len(),
                source,
                msg.tag,
                msg.data.len()
            )));
        }
        out.copy_from_slice(&msg.data);
        Ok(())
    }
}

impl Transport for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(
        &self,
        tag: Tag,
        dest: Option<usize>,
        send: &[Cplx],
        source: Option<usize>,
        recv: &mut [Cplx],
    ) -> Result<()> {
        if let Some(dest) = dest {
            self.send(tag, dest, send)?;
        }
        if let Some(source) = source {
            self.receive(tag, source, recv)?;
        }
        Ok(())
    }

    /// Gather on rank 0, sum in rank order and broadcast, so that
    /// every processor holds bitwise identical sums.
    fn all_reduce_sum(&self, buf: &mut [Cplx]) -> Result<()> {
        if self.size == 1 {
            return Ok(());
        }
        if self.rank == 0 {
            let mut part = vec![Cplx::zero(); buf.len()];
            for source in 1..self.size {
                self.receive(TAG_COLLECTIVE, source, &mut part)?;
                for (b, p) in buf.iter_mut().zip(part.iter()) {
                    *b += *p;
                }
            }
            for dest in 1..self.size {
                self.send(TAG_COLLECTIVE, dest, buf)?;
            }
        } else {
            self.send(TAG_COLLECTIVE, 0, buf)?;
            self.receive(TAG_COLLECTIVE, 0, buf)?;
        }
        Ok(())
    }

    fn all_reduce_max(&self, value: Real) -> Result<Real> {
        if self.size == 1 {
            return Ok(value);
        }
        let mut buf = [Cplx::new(value, 0.)];
        if self.rank == 0 {
            let mut part = [Cplx::zero()];
            for source in 1..self.size {
                self.receive(TAG_COLLECTIVE, source, &mut part)?;
                if part[0].re > buf[0].re {
                    buf[0] = part[0];
                }
            }
            for dest in 1..self.size {
                self.send(TAG_COLLECTIVE, dest, &buf)?;
            }
        } else {
            self.send(TAG_COLLECTIVE, 0, &buf)?;
            self.receive(TAG_COLLECTIVE, 0, &mut buf)?;
        }
        Ok(buf[0].re)
    }
}

/// Run `f` on a group of `size` processors, one thread each.
///
/// Returns the results in rank order. A panic on any processor is
/// propagated once all threads have finished.
pub fn run_group<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadComm) -> R + Sync,
    R: Send,
{
    let group = ThreadComm::group(size);
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = group
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(e) => std::panic::resume_unwind(e),
            })
            .collect()
    })
}
